use std::sync::Arc;

use tracing::info;

use super::pipeline::RetrievalEngine;
use crate::config::{Config, ConfigError};
use crate::context::{ChunkResolver, ContextAssembler};
use crate::corpus::ChunkStore;
use crate::embedding::{EmbeddingCache, EmbeddingProvider};
use crate::fusion::HybridMerger;
use crate::rerank::{RerankerGate, RerankerProvider};
use crate::resilience::{Resilience, RetryPolicy};
use crate::retrieval::{DenseIndex, DenseRetriever, SparseIndex, SparseRetriever};

pub const EMBEDDING_DEPENDENCY: &str = "embedding";
pub const DENSE_DEPENDENCY: &str = "dense_index";
pub const SPARSE_DEPENDENCY: &str = "sparse_index";
pub const CHUNK_STORE_DEPENDENCY: &str = "chunk_store";
pub const RERANKER_DEPENDENCY: &str = "reranker";

/// Wires collaborators into a [`RetrievalEngine`].
///
/// The chunk store, embedding provider and both indexes are required; the reranker
/// is optional. [`build`](Self::build) validates the configuration, so an invalid
/// configuration never reaches query time.
#[derive(Default)]
pub struct RetrievalEngineBuilder {
    config: Option<Config>,
    chunk_store: Option<Arc<dyn ChunkStore>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    dense_index: Option<Arc<dyn DenseIndex>>,
    sparse_index: Option<Arc<dyn SparseIndex>>,
    reranker: Option<Arc<dyn RerankerProvider>>,
}

impl RetrievalEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults to [`Config::default`].
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn chunk_store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.chunk_store = Some(store);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn dense_index(mut self, index: Arc<dyn DenseIndex>) -> Self {
        self.dense_index = Some(index);
        self
    }

    pub fn sparse_index(mut self, index: Arc<dyn SparseIndex>) -> Self {
        self.sparse_index = Some(index);
        self
    }

    pub fn reranker(mut self, reranker: Arc<dyn RerankerProvider>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn build(self) -> Result<RetrievalEngine, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let chunk_store = self
            .chunk_store
            .ok_or(ConfigError::MissingComponent(CHUNK_STORE_DEPENDENCY))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or(ConfigError::MissingComponent(EMBEDDING_DEPENDENCY))?;
        let dense_index = self
            .dense_index
            .ok_or(ConfigError::MissingComponent(DENSE_DEPENDENCY))?;
        let sparse_index = self
            .sparse_index
            .ok_or(ConfigError::MissingComponent(SPARSE_DEPENDENCY))?;

        let retry = RetryPolicy::new(config.retry.clone());
        let guarded = |name: &str, timeout| {
            Resilience::new(name, retry.clone(), config.breaker.clone(), timeout)
        };

        let embeddings = EmbeddingCache::new(
            embedding_provider,
            config.cache.clone(),
            guarded(EMBEDDING_DEPENDENCY, config.embed_timeout),
        );
        let dense = DenseRetriever::new(dense_index, guarded(DENSE_DEPENDENCY, config.search_timeout));
        let sparse =
            SparseRetriever::new(sparse_index, guarded(SPARSE_DEPENDENCY, config.search_timeout));
        let resolver = ChunkResolver::new(
            chunk_store,
            guarded(CHUNK_STORE_DEPENDENCY, config.store_timeout),
        );
        let assembler = ContextAssembler::new(resolver, config.dedup_adjacency);
        let merger = HybridMerger::new(
            config.fusion_weights,
            config.fusion_strategy,
            config.fusion_top_k,
        )?;

        // Single attempt per query; the timeout is the rerank latency budget.
        let reranker = self.reranker.map(|provider| {
            let resilience = Resilience::new(
                RERANKER_DEPENDENCY,
                RetryPolicy::no_retry(),
                config.breaker.clone(),
                config.rerank_timeout,
            );
            RerankerGate::new(provider, resilience).with_min_score(config.rerank_min_score)
        });

        info!(
            fusion_strategy = %config.fusion_strategy,
            dense_weight = config.fusion_weights.dense(),
            sparse_weight = config.fusion_weights.sparse(),
            fusion_top_k = config.fusion_top_k,
            final_top_k = config.final_top_k,
            reranker = reranker.is_some(),
            "Retrieval engine ready"
        );

        Ok(RetrievalEngine::from_parts(
            config, embeddings, dense, sparse, merger, reranker, assembler,
        ))
    }
}
