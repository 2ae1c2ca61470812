use async_trait::async_trait;

use super::model::{Chunk, ChunkId, Namespace};
use crate::error::ProviderError;

#[async_trait]
/// Read interface over the chunked corpus, keyed by namespace.
pub trait ChunkStore: Send + Sync {
    /// Returns the chunk, [`ProviderError::ChunkNotFound`] if the namespace has no such
    /// chunk, or [`ProviderError::NamespaceNotFound`] if the namespace is unknown.
    async fn get_chunk(
        &self,
        namespace: &Namespace,
        chunk_id: &ChunkId,
    ) -> Result<Chunk, ProviderError>;
}
