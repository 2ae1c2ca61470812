//! Three-state circuit breaker.
//!
//! ```text
//!            failures >= threshold            cooldown elapsed
//!   CLOSED ───────────────────────▶ OPEN ──────────────────────▶ HALF-OPEN
//!     ▲                               ▲                            │
//!     │          trial succeeded      │       trial failed         │
//!     └───────────────────────────────┼────────────────────────────┤
//!                                     └────────────────────────────┘
//! ```
//!
//! Callers take a [`BreakerPermit`] before invoking the dependency and settle it with
//! [`BreakerPermit::success`] or [`BreakerPermit::failure`]. A permit dropped without
//! being settled (the call was cancelled) leaves the failure counters untouched; a
//! dropped half-open trial permit lets the next caller run the trial instead.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use super::config::BreakerConfig;
use super::error::BreakerOpen;

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { trial_in_flight: bool },
}

#[derive(Debug)]
struct Inner {
    state: State,
    /// Recent outcomes for the failure-rate trip, `true` = failure.
    outcomes: VecDeque<bool>,
}

/// Circuit breaker guarding one external dependency.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: State::Closed {
                    consecutive_failures: 0,
                },
                outcomes: VecDeque::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state. An open circuit whose cooldown has elapsed still reports
    /// [`CircuitState::Open`] until a caller takes the trial permit.
    pub fn state(&self) -> CircuitState {
        match self.inner.lock().state {
            State::Closed { .. } => CircuitState::Closed,
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Consecutive failures counted while closed.
    pub fn consecutive_failures(&self) -> u32 {
        match self.inner.lock().state {
            State::Closed {
                consecutive_failures,
            } => consecutive_failures,
            _ => 0,
        }
    }

    /// Asks for permission to call the dependency.
    pub fn try_acquire(&self) -> Result<BreakerPermit<'_>, BreakerOpen> {
        let mut inner = self.inner.lock();
        let current = inner.state;

        match current {
            State::Closed { .. } => Ok(BreakerPermit::new(self, false)),
            State::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed >= self.config.cooldown {
                    inner.state = State::HalfOpen {
                        trial_in_flight: true,
                    };
                    info!(dependency = %self.name, "Circuit half-open, allowing trial call");
                    Ok(BreakerPermit::new(self, true))
                } else {
                    Err(self.rejection(self.config.cooldown - elapsed))
                }
            }
            State::HalfOpen { trial_in_flight } => {
                if trial_in_flight {
                    Err(self.rejection(Duration::ZERO))
                } else {
                    inner.state = State::HalfOpen {
                        trial_in_flight: true,
                    };
                    Ok(BreakerPermit::new(self, true))
                }
            }
        }
    }

    /// Forces the circuit closed and forgets recorded outcomes.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = State::Closed {
            consecutive_failures: 0,
        };
        inner.outcomes.clear();
    }

    fn rejection(&self, retry_after: Duration) -> BreakerOpen {
        BreakerOpen {
            name: self.name.clone(),
            retry_after,
        }
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.inner.lock();
        let current = inner.state;

        match current {
            State::HalfOpen { .. } if trial => {
                inner.state = State::Closed {
                    consecutive_failures: 0,
                };
                inner.outcomes.clear();
                info!(dependency = %self.name, "Trial call succeeded, circuit closed");
            }
            State::Closed { .. } => {
                inner.state = State::Closed {
                    consecutive_failures: 0,
                };
                self.push_outcome(&mut inner, false);
            }
            // Late result from a call admitted before the circuit opened.
            _ => {}
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.inner.lock();
        let current = inner.state;

        match current {
            State::HalfOpen { .. } if trial => {
                inner.state = State::Open {
                    opened_at: Instant::now(),
                };
                warn!(dependency = %self.name, "Trial call failed, circuit re-opened");
            }
            State::Closed {
                consecutive_failures,
            } => {
                let consecutive_failures = consecutive_failures + 1;
                self.push_outcome(&mut inner, true);

                let rate_tripped = self.failure_rate_exceeded(&inner.outcomes);
                if consecutive_failures >= self.config.failure_threshold || rate_tripped {
                    inner.state = State::Open {
                        opened_at: Instant::now(),
                    };
                    inner.outcomes.clear();
                    warn!(
                        dependency = %self.name,
                        consecutive_failures,
                        rate_tripped,
                        cooldown_ms = self.config.cooldown.as_millis() as u64,
                        "Circuit opened"
                    );
                } else {
                    inner.state = State::Closed {
                        consecutive_failures,
                    };
                }
            }
            _ => {}
        }
    }

    fn on_abandon(&self, trial: bool) {
        if !trial {
            return;
        }
        let mut inner = self.inner.lock();
        if let State::HalfOpen { .. } = inner.state {
            inner.state = State::HalfOpen {
                trial_in_flight: false,
            };
        }
    }

    fn push_outcome(&self, inner: &mut Inner, failed: bool) {
        if self.config.failure_rate.is_none() {
            return;
        }
        inner.outcomes.push_back(failed);
        while inner.outcomes.len() > self.config.rate_window as usize {
            inner.outcomes.pop_front();
        }
    }

    fn failure_rate_exceeded(&self, outcomes: &VecDeque<bool>) -> bool {
        let Some(rate) = self.config.failure_rate else {
            return false;
        };
        if outcomes.len() < self.config.rate_window as usize || outcomes.is_empty() {
            return false;
        }
        let failures = outcomes.iter().filter(|failed| **failed).count();
        failures as f32 / outcomes.len() as f32 >= rate
    }
}

/// Permission to make one call through a [`CircuitBreaker`].
#[must_use = "settle the permit with success() or failure()"]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> BreakerPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    /// `true` if this permit is the half-open trial call.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandon(self.trial);
        }
    }
}
