//! Error taxonomy shared across the retrieval pipeline.
//!
//! [`ProviderError`] is what injected collaborators (chunk store, embedding provider,
//! dense/sparse indexes, reranker) report. [`RetrievalError`] is what the caller of
//! [`crate::engine::RetrievalEngine::retrieve`] sees.

use std::time::Duration;

use thiserror::Error;

use crate::embedding::EmbeddingError;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// The namespace is unknown to the collaborator.
    #[error("namespace not found: {namespace}")]
    NamespaceNotFound {
        /// Namespace as requested.
        namespace: String,
    },

    /// The chunk store has no chunk with this id in the namespace.
    #[error("chunk '{chunk_id}' not found in namespace '{namespace}'")]
    ChunkNotFound {
        /// Namespace as requested.
        namespace: String,
        /// Missing chunk id.
        chunk_id: String,
    },

    /// The dependency could not serve the request (network, overload, 5xx).
    #[error("dependency unavailable: {reason}")]
    Unavailable {
        /// Error message.
        reason: String,
    },

    /// The call exceeded its timeout.
    #[error("call timed out after {after:?}")]
    Timeout {
        /// Configured timeout.
        after: Duration,
    },

    /// The dependency answered with something unusable.
    #[error("invalid response: {reason}")]
    InvalidResponse {
        /// Error message.
        reason: String,
    },
}

impl ProviderError {
    /// Convenience constructor for [`ProviderError::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Unavailable { .. } | ProviderError::Timeout { .. }
        )
    }

    /// Returns `true` for failures caused by the request rather than the dependency.
    ///
    /// These never count against a circuit breaker.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ProviderError::NamespaceNotFound { .. } | ProviderError::ChunkNotFound { .. }
        )
    }
}

/// Query-level failure returned by the retrieval engine.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The request itself is malformed (empty question, zero `top_k`, ...).
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Error message.
        reason: String,
    },

    /// The namespace string is not a valid namespace.
    #[error("invalid namespace '{value}': {reason}")]
    InvalidNamespace {
        /// Rejected value.
        value: String,
        /// Error message.
        reason: &'static str,
    },

    /// A collaborator does not know the namespace. Never retried, never degraded.
    #[error("namespace not found: {namespace}")]
    NamespaceNotFound {
        /// Namespace as requested.
        namespace: String,
    },

    /// The chunk store returned a chunk that belongs to another namespace.
    #[error("chunk '{chunk_id}' belongs to namespace '{found}', expected '{expected}'")]
    NamespaceMismatch {
        /// Requested namespace.
        expected: String,
        /// Namespace carried by the chunk.
        found: String,
        /// Offending chunk.
        chunk_id: String,
    },

    /// The query embedding could not be produced and no retriever could answer.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(#[source] EmbeddingError),

    /// Both retrievers failed after exhausting retries.
    #[error("retrieval unavailable (dense: {dense}; sparse: {sparse})")]
    RetrievalUnavailable {
        /// Dense failure description.
        dense: String,
        /// Sparse failure description.
        sparse: String,
    },

    /// The chunk store failed after exhausting retries.
    #[error("chunk store unavailable: {reason}")]
    ChunkStore {
        /// Error message.
        reason: String,
    },

    /// The caller cancelled the query.
    #[error("query cancelled")]
    Cancelled,
}
