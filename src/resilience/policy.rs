use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::breaker::CircuitBreaker;
use super::config::BreakerConfig;
use super::error::ResilienceError;
use super::retry::RetryPolicy;
use crate::error::ProviderError;

/// Timeout + retry + circuit breaker around calls to one external dependency.
///
/// Every attempt:
/// 1. asks the breaker for a permit (fails fast with [`ResilienceError::CircuitOpen`]),
/// 2. runs the call under `timeout` (elapsing counts as a failure),
/// 3. settles the permit and either returns, backs off and retries, or gives up.
///
/// Caller errors (`NamespaceNotFound`, `ChunkNotFound`) are returned immediately and
/// count as a healthy response. Other non-transient errors are not retried but do
/// count as failures.
#[derive(Debug, Clone)]
pub struct Resilience {
    name: Arc<str>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    timeout: Duration,
}

impl Resilience {
    pub fn new(
        name: impl Into<String>,
        retry: RetryPolicy,
        breaker: BreakerConfig,
        timeout: Duration,
    ) -> Self {
        let name = name.into();
        let breaker = Arc::new(CircuitBreaker::new(name.clone(), breaker));
        Self::with_breaker(retry, breaker, timeout)
    }

    /// Shares an existing breaker (one breaker per dependency, many call sites).
    pub fn with_breaker(retry: RetryPolicy, breaker: Arc<CircuitBreaker>, timeout: Duration) -> Self {
        Self {
            name: Arc::from(breaker.name()),
            retry,
            breaker,
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `op` under the policy. `op` is invoked once per attempt.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let permit = self
                .breaker
                .try_acquire()
                .map_err(|open| ResilienceError::CircuitOpen {
                    dependency: self.name.to_string(),
                    retry_after: open.retry_after,
                })?;

            let error = match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => {
                    permit.success();
                    return Ok(value);
                }
                Ok(Err(error)) if error.is_caller_error() => {
                    permit.success();
                    return Err(self.permanent(error));
                }
                Ok(Err(error)) if !error.is_transient() => {
                    permit.failure();
                    return Err(self.permanent(error));
                }
                Ok(Err(error)) => {
                    permit.failure();
                    error
                }
                Err(_) => {
                    permit.failure();
                    ProviderError::Timeout {
                        after: self.timeout,
                    }
                }
            };

            if attempt >= max_attempts {
                warn!(
                    dependency = %self.name,
                    attempts = attempt,
                    error = %error,
                    "Giving up after retries"
                );
                return Err(ResilienceError::Exhausted {
                    dependency: self.name.to_string(),
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = self.retry.backoff(attempt);
            debug!(
                dependency = %self.name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn permanent(&self, source: ProviderError) -> ResilienceError {
        ResilienceError::Permanent {
            dependency: self.name.to_string(),
            source,
        }
    }
}
