use async_trait::async_trait;

use crate::error::ProviderError;

/// External embedding service.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `text` with the model identified by `model_id`.
    async fn embed(&self, text: &str, model_id: &str) -> Result<Vec<f32>, ProviderError>;
}
