//! Sift library crate (used by the CLI and integration tests).
//!
//! Hybrid dense/sparse retrieval and context assembly: turns a chunked, namespaced
//! corpus into ranked, deduplicated, citation-bearing context for a question.
//!
//! # Public API Surface
//!
//! ## Entry Point
//! - [`RetrievalEngine`], [`RetrievalEngineBuilder`], [`RetrieveRequest`] - the `retrieve` operation
//! - [`RetrievalResult`], [`ContextBlock`], [`Citation`], [`Degradation`] - query output
//! - [`Config`], [`ConfigError`] - `SIFT_*` environment configuration
//!
//! ## Collaborator Interfaces
//! - [`ChunkStore`], [`EmbeddingProvider`], [`DenseIndex`], [`SparseIndex`], [`RerankerProvider`]
//! - [`ProviderError`] - what collaborators report; [`RetrievalError`] - what callers see
//!
//! ## Pipeline Stages
//! - [`EmbeddingCache`] - LRU+TTL embedding cache with single-flight misses
//! - [`DenseRetriever`], [`SparseRetriever`] - normalized candidate lists
//! - [`HybridMerger`], [`FusionWeights`], [`FusionStrategy`] - fusion
//! - [`RerankerGate`] - latency-bounded reranking with graceful degradation
//! - [`ContextAssembler`] - dedup and token budgeting
//! - [`Resilience`], [`CircuitBreaker`], [`RetryPolicy`] - retry, timeout, breaker
//!
//! ## Offline Adapters
//! [`InMemoryChunkStore`], [`InMemoryDenseIndex`], [`Bm25SparseIndex`], [`HashingEmbedder`]
//! and [`LexicalReranker`] run the whole pipeline without external services.
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod context;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod hashing;
pub mod rerank;
pub mod resilience;
pub mod retrieval;

pub use config::{Config, ConfigError};
pub use context::{
    Citation, ContextAssembler, ContextBlock, DEFAULT_DEDUP_ADJACENCY, Degradation,
    RetrievalResult,
};
pub use corpus::{
    Chunk, ChunkId, ChunkStore, CorpusError, DocumentId, InMemoryChunkStore, Locator, Namespace,
    load_jsonl,
};
pub use embedding::{
    CacheStats, EmbeddingCache, EmbeddingCacheConfig, EmbeddingError, EmbeddingProvider,
    HashingEmbedder, TextNormalization,
};
pub use engine::{RetrievalEngine, RetrievalEngineBuilder, RetrieveRequest};
pub use error::{ProviderError, RetrievalError};
pub use fusion::{FusionError, FusionStrategy, FusionWeights, HybridMerger};
pub use hashing::embedding_key;
pub use rerank::{LexicalReranker, RerankCandidate, RerankerGate, RerankerProvider};
pub use resilience::{
    BreakerConfig, CircuitBreaker, CircuitState, Resilience, ResilienceError, RetryConfig,
    RetryPolicy,
};
pub use retrieval::{
    Bm25SparseIndex, CandidateScore, DenseIndex, DenseRetriever, InMemoryDenseIndex,
    ScoreSource, SparseIndex, SparseRetriever,
};

#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbeddingProvider;
#[cfg(any(test, feature = "mock"))]
pub use rerank::MockReranker;
#[cfg(any(test, feature = "mock"))]
pub use retrieval::MockIndex;
