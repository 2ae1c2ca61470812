//! Context assembly.
//!
//! Walks ranked candidates, merges chunks of one document whose ordinals are closer
//! than the adjacency threshold into one block, and stops at the first chunk that
//! would push the total past the token budget. Chunks are included whole or not at
//! all, so every citation points at text present in its block.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};
use uuid::Uuid;

use super::resolver::ChunkResolver;
use super::types::{Citation, ContextBlock, RetrievalResult};
use crate::corpus::{Chunk, ChunkId, DocumentId, Namespace};
use crate::error::RetrievalError;
use crate::retrieval::CandidateScore;

pub const DEFAULT_DEDUP_ADJACENCY: u32 = 2;

#[derive(Debug)]
struct PendingBlock<'a> {
    document_id: &'a DocumentId,
    members: Vec<&'a Chunk>,
    tokens: usize,
    score: f32,
}

impl<'a> PendingBlock<'a> {
    fn new(chunk: &'a Chunk, score: f32) -> Self {
        Self {
            document_id: &chunk.document_id,
            members: vec![chunk],
            tokens: chunk.token_count,
            score,
        }
    }

    fn is_adjacent(&self, chunk: &Chunk, adjacency: u32) -> bool {
        adjacency > 0
            && *self.document_id == chunk.document_id
            && self
                .members
                .iter()
                .any(|member| member.ordinal.abs_diff(chunk.ordinal) < adjacency)
    }

    fn absorb(&mut self, other: PendingBlock<'a>) {
        self.members.extend(other.members);
        self.tokens += other.tokens;
        self.score = self.score.max(other.score);
    }

    fn finish(mut self, cumulative_before: usize) -> ContextBlock {
        self.members
            .sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then_with(|| a.chunk_id.cmp(&b.chunk_id)));

        let text = self
            .members
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        ContextBlock {
            text,
            chunk_ids: self.members.iter().map(|c| c.chunk_id.clone()).collect(),
            citations: self
                .members
                .iter()
                .map(|c| Citation {
                    document_id: c.document_id.clone(),
                    chunk_id: c.chunk_id.clone(),
                    ordinal: c.ordinal,
                    locator: c.locator.clone(),
                })
                .collect(),
            token_count: self.tokens,
            cumulative_tokens: cumulative_before + self.tokens,
            score: self.score,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    resolver: ChunkResolver,
    adjacency: u32,
}

impl ContextAssembler {
    /// `adjacency` is the ordinal distance strictly below which same-document chunks
    /// merge; `0` disables merging.
    pub fn new(resolver: ChunkResolver, adjacency: u32) -> Self {
        Self {
            resolver,
            adjacency,
        }
    }

    pub fn resolver(&self) -> &ChunkResolver {
        &self.resolver
    }

    pub fn adjacency(&self) -> u32 {
        self.adjacency
    }

    /// Resolves `ranked` through the chunk store, then assembles.
    #[instrument(skip_all, fields(namespace = %namespace, candidates = ranked.len(), token_budget = token_budget))]
    pub async fn assemble(
        &self,
        namespace: &Namespace,
        ranked: &[CandidateScore],
        token_budget: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        let ids: Vec<ChunkId> = ranked.iter().map(|c| c.chunk_id.clone()).collect();
        let chunks = self.resolver.resolve(namespace, &ids).await?;
        Ok(self.assemble_resolved(namespace, ranked, &chunks, token_budget))
    }

    /// Assembles from already-resolved chunks. Candidates absent from `chunks` are
    /// skipped.
    pub fn assemble_resolved(
        &self,
        namespace: &Namespace,
        ranked: &[CandidateScore],
        chunks: &HashMap<ChunkId, Chunk>,
        token_budget: usize,
    ) -> RetrievalResult {
        let mut pending: Vec<PendingBlock<'_>> = Vec::new();
        let mut seen: HashSet<&ChunkId> = HashSet::new();
        let mut total = 0usize;

        for candidate in ranked {
            if !seen.insert(&candidate.chunk_id) {
                continue;
            }
            let Some(chunk) = chunks.get(&candidate.chunk_id) else {
                continue;
            };

            match total.checked_add(chunk.token_count) {
                Some(next) if next <= token_budget => total = next,
                _ => {
                    debug!(
                        chunk_id = %chunk.chunk_id,
                        chunk_tokens = chunk.token_count,
                        total,
                        token_budget,
                        "Token budget reached"
                    );
                    break;
                }
            }

            let adjacent: Vec<usize> = pending
                .iter()
                .enumerate()
                .filter(|(_, block)| block.is_adjacent(chunk, self.adjacency))
                .map(|(idx, _)| idx)
                .collect();

            let mut block = PendingBlock::new(chunk, candidate.score);
            match adjacent.split_first() {
                None => pending.push(block),
                Some((&first, rest)) => {
                    // Later blocks fold into the earliest; remove from the back so
                    // indices stay valid.
                    for &idx in rest.iter().rev() {
                        block.absorb(pending.remove(idx));
                    }
                    pending[first].absorb(block);
                }
            }
        }

        let mut cumulative = 0usize;
        let blocks: Vec<ContextBlock> = pending
            .into_iter()
            .map(|block| {
                let finished = block.finish(cumulative);
                cumulative = finished.cumulative_tokens;
                finished
            })
            .collect();

        debug!(
            blocks = blocks.len(),
            total_tokens = cumulative,
            token_budget,
            "Assembled context"
        );

        RetrievalResult {
            query_id: Uuid::new_v4(),
            namespace: namespace.clone(),
            blocks,
            total_tokens: cumulative,
            token_budget,
            degradations: Vec::new(),
        }
    }
}
