//! In-process reference indexes.
//!
//! [`InMemoryDenseIndex`] is a brute-force cosine scan; [`Bm25SparseIndex`] wraps the
//! `bm25` crate with one search engine per namespace. Both report unknown namespaces
//! as [`ProviderError::NamespaceNotFound`].

use std::collections::HashMap;

use async_trait::async_trait;
use bm25::{Document, Language, SearchEngine, SearchEngineBuilder};
use parking_lot::RwLock;

use super::index::{DenseIndex, SparseIndex};
use crate::corpus::{Chunk, ChunkId, Namespace};
use crate::error::ProviderError;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn namespace_not_found(namespace: &Namespace) -> ProviderError {
    ProviderError::NamespaceNotFound {
        namespace: namespace.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDenseIndex {
    namespaces: RwLock<HashMap<Namespace, HashMap<ChunkId, Vec<f32>>>>,
}

impl InMemoryDenseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_namespace(&self, namespace: Namespace) {
        self.namespaces.write().entry(namespace).or_default();
    }

    /// Inserts or replaces the vector of a chunk.
    pub fn upsert(&self, namespace: &Namespace, chunk_id: ChunkId, vector: Vec<f32>) {
        self.namespaces
            .write()
            .entry(namespace.clone())
            .or_default()
            .insert(chunk_id, vector);
    }

    /// Indexes every chunk that carries a precomputed vector. Returns how many were
    /// indexed.
    pub fn extend_from_chunks<'a>(&self, chunks: impl IntoIterator<Item = &'a Chunk>) -> usize {
        let mut indexed = 0;
        for chunk in chunks {
            if let Some(vector) = &chunk.vector {
                self.upsert(&chunk.namespace, chunk.chunk_id.clone(), vector.clone());
                indexed += 1;
            }
        }
        indexed
    }

    pub fn len(&self, namespace: &Namespace) -> Option<usize> {
        self.namespaces.read().get(namespace).map(HashMap::len)
    }
}

#[async_trait]
impl DenseIndex for InMemoryDenseIndex {
    async fn search(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_n: usize,
    ) -> Result<Vec<(ChunkId, f32)>, ProviderError> {
        let namespaces = self.namespaces.read();
        let points = namespaces
            .get(namespace)
            .ok_or_else(|| namespace_not_found(namespace))?;

        let mut scored: Vec<(ChunkId, f32)> = points
            .iter()
            .filter(|(_, stored)| stored.len() == vector.len())
            .map(|(chunk_id, stored)| (chunk_id.clone(), cosine_similarity(vector, stored)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(top_n);
        Ok(scored)
    }
}

struct NamespaceBm25 {
    engine: SearchEngine<u64>,
    ids: Vec<ChunkId>,
    positions: HashMap<ChunkId, u64>,
}

impl NamespaceBm25 {
    fn new() -> Self {
        let empty: Vec<Document<u64>> = Vec::new();
        Self {
            engine: SearchEngineBuilder::<u64>::with_documents(Language::English, empty).build(),
            ids: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn upsert(&mut self, chunk_id: ChunkId, text: String) {
        let id = match self.positions.get(&chunk_id) {
            Some(id) => *id,
            None => {
                let id = self.ids.len() as u64;
                self.ids.push(chunk_id.clone());
                self.positions.insert(chunk_id, id);
                id
            }
        };
        self.engine.upsert(Document { id, contents: text });
    }
}

/// BM25 keyword index, one engine per namespace.
#[derive(Default)]
pub struct Bm25SparseIndex {
    namespaces: RwLock<HashMap<Namespace, NamespaceBm25>>,
}

impl std::fmt::Debug for Bm25SparseIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let namespaces = self.namespaces.read();
        let sizes: HashMap<&str, usize> = namespaces
            .iter()
            .map(|(ns, index)| (ns.as_str(), index.ids.len()))
            .collect();
        f.debug_struct("Bm25SparseIndex")
            .field("namespaces", &sizes)
            .finish()
    }
}

impl Bm25SparseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chunks<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Self {
        let index = Self::new();
        for chunk in chunks {
            index.upsert(&chunk.namespace, chunk.chunk_id.clone(), chunk.text.clone());
        }
        index
    }

    pub fn create_namespace(&self, namespace: Namespace) {
        self.namespaces
            .write()
            .entry(namespace)
            .or_insert_with(NamespaceBm25::new);
    }

    pub fn upsert(&self, namespace: &Namespace, chunk_id: ChunkId, text: String) {
        self.namespaces
            .write()
            .entry(namespace.clone())
            .or_insert_with(NamespaceBm25::new)
            .upsert(chunk_id, text);
    }

    pub fn len(&self, namespace: &Namespace) -> Option<usize> {
        self.namespaces.read().get(namespace).map(|index| index.ids.len())
    }
}

#[async_trait]
impl SparseIndex for Bm25SparseIndex {
    async fn search(
        &self,
        namespace: &Namespace,
        query_text: &str,
        top_n: usize,
    ) -> Result<Vec<(ChunkId, f32)>, ProviderError> {
        let namespaces = self.namespaces.read();
        let index = namespaces
            .get(namespace)
            .ok_or_else(|| namespace_not_found(namespace))?;

        Ok(index
            .engine
            .search(query_text, top_n)
            .into_iter()
            .filter_map(|result| {
                let chunk_id = index.ids.get(result.document.id as usize)?;
                Some((chunk_id.clone(), result.score))
            })
            .collect())
    }
}
