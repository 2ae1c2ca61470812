use std::time::Duration;

use rand::Rng;

use super::config::RetryConfig;

/// Exponential backoff schedule derived from a [`RetryConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Single attempt, never sleeps.
    pub fn no_retry() -> Self {
        Self::new(RetryConfig::no_retry())
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Total attempts, at least one.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Upper bound of the delay after `attempt` (1-based) failed:
    /// `min(base * 2^(attempt - 1), max)`.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.config
            .base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.config.max_delay)
            .min(self.config.max_delay)
    }

    /// Delay to sleep after `attempt` (1-based) failed.
    ///
    /// With jitter enabled the delay is drawn uniformly from `[ceiling / 2, ceiling]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        if !self.config.jitter || ceiling.is_zero() {
            return ceiling;
        }

        let factor = rand::thread_rng().gen_range(0.5..=1.0);
        ceiling.mul_f64(factor)
    }
}
