use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 50;
pub const DEFAULT_MAX_DELAY_MS: u64 = 2_000;

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_COOLDOWN_MS: u64 = 30_000;
pub const DEFAULT_RATE_WINDOW: u32 = 20;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first call. `1` disables retries.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles per attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Randomize each delay within `[delay / 2, delay]`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no backoff.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.base_delay > self.max_delay {
            return Err(format!(
                "base_delay ({:?}) cannot exceed max_delay ({:?})",
                self.base_delay, self.max_delay
            ));
        }
        Ok(())
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Time the circuit stays open before a half-open trial call is allowed.
    pub cooldown: Duration,
    /// Optional failure fraction over the last `rate_window` outcomes that also opens
    /// the circuit. Evaluated only once the window is full.
    pub failure_rate: Option<f32>,
    /// Number of recent outcomes considered by `failure_rate`.
    pub rate_window: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            failure_rate: None,
            rate_window: DEFAULT_RATE_WINDOW,
        }
    }
}

impl BreakerConfig {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            ..Self::default()
        }
    }

    pub fn with_failure_rate(mut self, failure_rate: f32, rate_window: u32) -> Self {
        self.failure_rate = Some(failure_rate);
        self.rate_window = rate_window;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be at least 1".to_string());
        }
        if let Some(rate) = self.failure_rate {
            if !(rate > 0.0 && rate <= 1.0) {
                return Err(format!("failure_rate must be in (0, 1], got {rate}"));
            }
            if self.rate_window == 0 {
                return Err("rate_window must be at least 1".to_string());
            }
        }
        Ok(())
    }
}
