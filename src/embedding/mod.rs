//! Query embedding.
//!
//! - [`EmbeddingProvider`] is the injected embedding service.
//! - [`EmbeddingCache`] fronts it with a bounded LRU+TTL cache and single-flight misses.
//! - [`HashingEmbedder`] is a deterministic provider for offline runs.

/// Cache with single-flight miss handling.
pub mod cache;
/// Cache sizing and normalization.
pub mod config;
mod error;
/// Feature-hashing embedder.
pub mod hashing_embedder;
/// Provider trait.
pub mod provider;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use cache::{CacheStats, Embedding, EmbeddingCache};
pub use config::{EmbeddingCacheConfig, TextNormalization};
pub use error::EmbeddingError;
pub use hashing_embedder::{DEFAULT_HASHING_DIMENSIONS, HashingEmbedder};
pub use provider::EmbeddingProvider;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbeddingProvider;
