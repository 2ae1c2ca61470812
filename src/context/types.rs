use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::corpus::{ChunkId, DocumentId, Locator, Namespace};

/// Optional stage that was skipped or narrowed for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// The reranker exceeded its timeout; fused order was kept.
    RerankerTimeout,
    /// The reranker failed, its circuit is open, or none is configured.
    RerankerUnavailable,
    /// Dense retrieval (or the query embedding) failed; sparse-only ranking.
    DenseUnavailable,
    /// Sparse retrieval failed; dense-only ranking.
    SparseUnavailable,
}

impl Degradation {
    pub fn as_str(self) -> &'static str {
        match self {
            Degradation::RerankerTimeout => "reranker_timeout",
            Degradation::RerankerUnavailable => "reranker_unavailable",
            Degradation::DenseUnavailable => "dense_unavailable",
            Degradation::SparseUnavailable => "sparse_unavailable",
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source attribution for text inside a [`ContextBlock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub document_id: DocumentId,
    pub chunk_id: ChunkId,
    pub ordinal: u32,
    pub locator: Locator,
}

/// One deduplicated unit of context.
///
/// Blocks built from adjacent chunks of one document list their chunks in ordinal
/// order and carry one citation per chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextBlock {
    pub text: String,
    pub chunk_ids: Vec<ChunkId>,
    pub citations: Vec<Citation>,
    /// Tokens of this block.
    pub token_count: usize,
    /// Tokens of this block and every block before it.
    pub cumulative_tokens: usize,
    /// Best candidate score among the block's chunks.
    pub score: f32,
}

impl ContextBlock {
    pub fn document_id(&self) -> Option<&DocumentId> {
        self.citations.first().map(|c| &c.document_id)
    }
}

/// Terminal output of a query. Never mutated after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub query_id: Uuid,
    pub namespace: Namespace,
    pub blocks: Vec<ContextBlock>,
    pub total_tokens: usize,
    pub token_budget: usize,
    pub degradations: Vec<Degradation>,
}

impl RetrievalResult {
    pub fn empty(namespace: Namespace, token_budget: usize) -> Self {
        Self {
            query_id: Uuid::new_v4(),
            namespace,
            blocks: Vec::new(),
            total_tokens: 0,
            token_budget,
            degradations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn has_degradation(&self, degradation: Degradation) -> bool {
        self.degradations.contains(&degradation)
    }

    /// Per-block scores in block order.
    pub fn scores(&self) -> Vec<f32> {
        self.blocks.iter().map(|b| b.score).collect()
    }

    /// Every chunk id in block order.
    pub fn chunk_ids(&self) -> impl Iterator<Item = &ChunkId> {
        self.blocks.iter().flat_map(|b| b.chunk_ids.iter())
    }
}
