use async_trait::async_trait;
use serde::Serialize;

use crate::corpus::ChunkId;
use crate::error::ProviderError;

/// A `(chunk_id, text)` pair sent to the reranker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankCandidate {
    pub chunk_id: ChunkId,
    pub text: String,
}

/// Cross-encoder scoring collaborator.
#[async_trait]
pub trait RerankerProvider: Send + Sync {
    /// Relevance of each candidate to `query`. Higher is better.
    async fn score(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
    ) -> Result<Vec<(ChunkId, f32)>, ProviderError>;
}
