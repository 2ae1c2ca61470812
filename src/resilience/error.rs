use std::time::Duration;

use thiserror::Error;

use crate::error::ProviderError;

/// Returned by [`CircuitBreaker::try_acquire`](super::CircuitBreaker::try_acquire)
/// while the circuit rejects calls.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("circuit '{name}' is open (retry after {retry_after:?})")]
pub struct BreakerOpen {
    /// Dependency name.
    pub name: String,
    /// Remaining cooldown; zero while a half-open trial is in flight.
    pub retry_after: Duration,
}

/// Outcome of a guarded call that did not succeed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResilienceError {
    /// The breaker rejected the call without invoking the dependency.
    #[error("{dependency}: circuit open (retry after {retry_after:?})")]
    CircuitOpen {
        dependency: String,
        retry_after: Duration,
    },

    /// The dependency returned a non-transient error; not retried.
    #[error("{dependency}: {source}")]
    Permanent {
        dependency: String,
        #[source]
        source: ProviderError,
    },

    /// Every attempt failed with a transient error or timed out.
    #[error("{dependency}: gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        dependency: String,
        attempts: u32,
        #[source]
        last: ProviderError,
    },
}

impl ResilienceError {
    /// The last provider error behind this failure, if the dependency was called.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            ResilienceError::CircuitOpen { .. } => None,
            ResilienceError::Permanent { source, .. } => Some(source),
            ResilienceError::Exhausted { last, .. } => Some(last),
        }
    }

    /// `true` if the final attempt timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self.provider_error(), Some(ProviderError::Timeout { .. }))
    }

    /// `true` if the breaker short-circuited the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// The namespace a dependency reported as unknown, if that is the cause.
    pub fn namespace_not_found(&self) -> Option<&str> {
        match self.provider_error() {
            Some(ProviderError::NamespaceNotFound { namespace }) => Some(namespace),
            _ => None,
        }
    }
}
