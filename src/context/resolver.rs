use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, instrument, warn};

use crate::corpus::{Chunk, ChunkId, ChunkStore, Namespace};
use crate::error::{ProviderError, RetrievalError};
use crate::resilience::{Resilience, ResilienceError};

/// Resolves chunk ids to chunks through the [`ChunkStore`], concurrently.
///
/// Missing chunks are skipped. A chunk carrying a different namespace than the one
/// requested is a hard error; so is an unknown namespace.
#[derive(Clone)]
pub struct ChunkResolver {
    store: Arc<dyn ChunkStore>,
    resilience: Resilience,
}

impl std::fmt::Debug for ChunkResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkResolver")
            .field("resilience", &self.resilience)
            .finish_non_exhaustive()
    }
}

impl ChunkResolver {
    pub fn new(store: Arc<dyn ChunkStore>, resilience: Resilience) -> Self {
        Self { store, resilience }
    }

    pub fn resilience(&self) -> &Resilience {
        &self.resilience
    }

    #[instrument(skip(self, chunk_ids), fields(namespace = %namespace, requested = chunk_ids.len()))]
    pub async fn resolve(
        &self,
        namespace: &Namespace,
        chunk_ids: &[ChunkId],
    ) -> Result<HashMap<ChunkId, Chunk>, RetrievalError> {
        let fetches = chunk_ids.iter().map(|chunk_id| async move {
            let store = &self.store;
            let result = self
                .resilience
                .call(|| store.get_chunk(namespace, chunk_id))
                .await;
            (chunk_id, result)
        });

        let mut chunks = HashMap::with_capacity(chunk_ids.len());
        for (chunk_id, result) in join_all(fetches).await {
            match result {
                Ok(chunk) => {
                    if &chunk.namespace != namespace {
                        return Err(RetrievalError::NamespaceMismatch {
                            expected: namespace.to_string(),
                            found: chunk.namespace.to_string(),
                            chunk_id: chunk_id.to_string(),
                        });
                    }
                    if &chunk.chunk_id != chunk_id {
                        return Err(RetrievalError::ChunkStore {
                            reason: format!(
                                "requested chunk '{chunk_id}', store returned '{}'",
                                chunk.chunk_id
                            ),
                        });
                    }
                    chunks.insert(chunk_id.clone(), chunk);
                }
                Err(err) => match err.provider_error() {
                    Some(ProviderError::ChunkNotFound { .. }) => {
                        warn!(chunk_id = %chunk_id, "Ranked chunk missing from store, skipping");
                    }
                    Some(ProviderError::NamespaceNotFound { namespace }) => {
                        return Err(RetrievalError::NamespaceNotFound {
                            namespace: namespace.clone(),
                        });
                    }
                    _ => return Err(store_error(err)),
                },
            }
        }

        debug!(resolved = chunks.len(), "Resolved chunks");
        Ok(chunks)
    }
}

fn store_error(err: ResilienceError) -> RetrievalError {
    RetrievalError::ChunkStore {
        reason: err.to_string(),
    }
}
