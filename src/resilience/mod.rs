//! Retry, timeout and circuit breaking for external calls.
//!
//! Each dependency (embedding provider, dense index, sparse index, chunk store,
//! reranker) gets its own [`Resilience`] instance and therefore its own
//! [`CircuitBreaker`].

pub mod breaker;
pub mod config;
pub mod error;
pub mod policy;
pub mod retry;

#[cfg(test)]
mod tests;

pub use breaker::{BreakerPermit, CircuitBreaker, CircuitState};
pub use config::{BreakerConfig, RetryConfig};
pub use error::{BreakerOpen, ResilienceError};
pub use policy::Resilience;
pub use retry::RetryPolicy;
