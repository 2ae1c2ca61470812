//! Deterministic bag-of-words embedder for offline use.
//!
//! Each lowercase alphanumeric term is hashed into one of `dimensions` buckets with a
//! hash-derived sign, and the resulting vector is L2-normalized. Texts sharing terms
//! get a positive cosine similarity, which is enough to exercise the dense path
//! without a model server.

use async_trait::async_trait;

use super::provider::EmbeddingProvider;
use crate::error::ProviderError;
use crate::hashing::{hash_to_u64, term_bucket};

pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

impl HashingEmbedder {
    /// `dimensions` is clamped to at least 1.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embeds `text` synchronously. An input without terms yields the zero vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();

        for term in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|term| !term.is_empty())
        {
            let bucket = term_bucket(term, self.dimensions);
            let sign = if hash_to_u64(term.as_bytes()) >> 63 == 0 {
                1.0
            } else {
                -1.0
            };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str, _model_id: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_text(text))
    }
}
