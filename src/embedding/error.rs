use thiserror::Error;

use crate::resilience::ResilienceError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable for model '{model_id}': {source}")]
    Unavailable {
        model_id: String,
        #[source]
        source: ResilienceError,
    },

    #[error("embedding provider returned an invalid vector for model '{model_id}': {reason}")]
    InvalidVector { model_id: String, reason: String },
}

impl EmbeddingError {
    pub fn model_id(&self) -> &str {
        match self {
            EmbeddingError::Unavailable { model_id, .. } => model_id,
            EmbeddingError::InvalidVector { model_id, .. } => model_id,
        }
    }
}
