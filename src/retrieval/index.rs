use async_trait::async_trait;

use crate::corpus::{ChunkId, Namespace};
use crate::error::ProviderError;

/// Vector index collaborator.
#[async_trait]
pub trait DenseIndex: Send + Sync {
    /// Nearest neighbours of `vector` in `namespace`, best first.
    async fn search(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_n: usize,
    ) -> Result<Vec<(ChunkId, f32)>, ProviderError>;
}

/// Keyword (BM25-family) index collaborator.
#[async_trait]
pub trait SparseIndex: Send + Sync {
    /// Raw lexical scores for `query_text` in `namespace`, best first.
    async fn search(
        &self,
        namespace: &Namespace,
        query_text: &str,
        top_n: usize,
    ) -> Result<Vec<(ChunkId, f32)>, ProviderError>;
}
