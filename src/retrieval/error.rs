use thiserror::Error;

use crate::resilience::ResilienceError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RetrieverError {
    #[error("namespace not found: {namespace}")]
    NamespaceNotFound { namespace: String },

    #[error("top_n must be at least 1")]
    InvalidTopN,

    #[error(transparent)]
    Unavailable(ResilienceError),
}

impl From<ResilienceError> for RetrieverError {
    fn from(err: ResilienceError) -> Self {
        match err.namespace_not_found() {
            Some(namespace) => RetrieverError::NamespaceNotFound {
                namespace: namespace.to_string(),
            },
            None => RetrieverError::Unavailable(err),
        }
    }
}
