use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::model::{Chunk, ChunkId, Namespace};
use super::store::ChunkStore;
use crate::error::ProviderError;

/// Chunk store held entirely in memory, partitioned by namespace.
#[derive(Default)]
pub struct InMemoryChunkStore {
    namespaces: RwLock<HashMap<Namespace, HashMap<ChunkId, Chunk>>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from chunks, creating namespaces as they appear.
    pub fn from_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        let store = Self::new();
        store.extend(chunks);
        store
    }

    /// Registers an empty namespace so lookups in it return `ChunkNotFound`
    /// rather than `NamespaceNotFound`.
    pub fn create_namespace(&self, namespace: Namespace) {
        self.namespaces.write().entry(namespace).or_default();
    }

    /// Inserts a chunk into its own namespace. Returns the previous chunk with the same id.
    pub fn insert(&self, chunk: Chunk) -> Option<Chunk> {
        self.namespaces
            .write()
            .entry(chunk.namespace.clone())
            .or_default()
            .insert(chunk.chunk_id.clone(), chunk)
    }

    pub fn extend(&self, chunks: impl IntoIterator<Item = Chunk>) {
        let mut namespaces = self.namespaces.write();
        for chunk in chunks {
            namespaces
                .entry(chunk.namespace.clone())
                .or_default()
                .insert(chunk.chunk_id.clone(), chunk);
        }
    }

    /// Number of chunks in a namespace (`None` if the namespace is unknown).
    pub fn len(&self, namespace: &Namespace) -> Option<usize> {
        self.namespaces.read().get(namespace).map(HashMap::len)
    }

    pub fn contains_namespace(&self, namespace: &Namespace) -> bool {
        self.namespaces.read().contains_key(namespace)
    }

    /// Returns a snapshot of every chunk in a namespace.
    pub fn chunks(&self, namespace: &Namespace) -> Vec<Chunk> {
        self.namespaces
            .read()
            .get(namespace)
            .map(|chunks| chunks.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for InMemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChunkStore")
            .field("namespaces", &self.namespaces.read().len())
            .finish()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn get_chunk(
        &self,
        namespace: &Namespace,
        chunk_id: &ChunkId,
    ) -> Result<Chunk, ProviderError> {
        let namespaces = self.namespaces.read();
        let chunks = namespaces
            .get(namespace)
            .ok_or_else(|| ProviderError::NamespaceNotFound {
                namespace: namespace.to_string(),
            })?;

        chunks
            .get(chunk_id)
            .cloned()
            .ok_or_else(|| ProviderError::ChunkNotFound {
                namespace: namespace.to_string(),
                chunk_id: chunk_id.to_string(),
            })
    }
}
