use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::*;
use crate::error::ProviderError;

fn breaker(threshold: u32, cooldown_ms: u64) -> CircuitBreaker {
    CircuitBreaker::new("test", BreakerConfig::new(threshold, Duration::from_millis(cooldown_ms)))
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        RetryConfig::default()
            .with_max_attempts(max_attempts)
            .with_delays(Duration::from_millis(10), Duration::from_millis(40))
            .without_jitter(),
    )
}

fn resilience(max_attempts: u32, threshold: u32, timeout_ms: u64) -> Resilience {
    Resilience::new(
        "dep",
        fast_retry(max_attempts),
        BreakerConfig::new(threshold, Duration::from_secs(30)),
        Duration::from_millis(timeout_ms),
    )
}

#[test]
fn test_backoff_doubles_and_caps() {
    let policy = fast_retry(5);

    assert_eq!(policy.backoff(1), Duration::from_millis(10));
    assert_eq!(policy.backoff(2), Duration::from_millis(20));
    assert_eq!(policy.backoff(3), Duration::from_millis(40));
    assert_eq!(policy.backoff(4), Duration::from_millis(40));
    assert_eq!(policy.backoff(200), Duration::from_millis(40));
}

#[test]
fn test_backoff_jitter_stays_in_range() {
    let policy = RetryPolicy::new(
        RetryConfig::default().with_delays(Duration::from_millis(100), Duration::from_secs(1)),
    );

    for _ in 0..200 {
        let delay = policy.backoff(2);
        assert!(delay >= Duration::from_millis(100), "{delay:?}");
        assert!(delay <= Duration::from_millis(200), "{delay:?}");
    }
}

#[test]
fn test_retry_config_validation() {
    assert!(RetryConfig::default().validate().is_ok());
    assert!(RetryConfig::default().with_max_attempts(0).validate().is_err());
    assert!(
        RetryConfig::default()
            .with_delays(Duration::from_secs(2), Duration::from_secs(1))
            .validate()
            .is_err()
    );
}

#[test]
fn test_breaker_config_validation() {
    assert!(BreakerConfig::default().validate().is_ok());
    assert!(BreakerConfig::new(0, Duration::from_secs(1)).validate().is_err());
    assert!(BreakerConfig::default().with_failure_rate(1.5, 10).validate().is_err());
    assert!(BreakerConfig::default().with_failure_rate(0.5, 0).validate().is_err());
    assert!(BreakerConfig::default().with_failure_rate(0.5, 10).validate().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_breaker_opens_after_threshold() {
    let breaker = breaker(3, 1_000);

    for _ in 0..2 {
        breaker.try_acquire().expect("closed").failure();
    }
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.consecutive_failures(), 2);

    breaker.try_acquire().expect("closed").failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    let rejected = breaker.try_acquire().err().expect("open circuit rejects");
    assert_eq!(rejected.retry_after, Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn test_breaker_success_resets_consecutive_failures() {
    let breaker = breaker(3, 1_000);

    breaker.try_acquire().expect("closed").failure();
    breaker.try_acquire().expect("closed").failure();
    breaker.try_acquire().expect("closed").success();
    breaker.try_acquire().expect("closed").failure();
    breaker.try_acquire().expect("closed").failure();

    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_half_open_trial_closes_on_success() {
    let breaker = breaker(1, 1_000);
    breaker.try_acquire().expect("closed").failure();

    tokio::time::advance(Duration::from_millis(999)).await;
    assert!(breaker.try_acquire().is_err());

    tokio::time::advance(Duration::from_millis(1)).await;
    let trial = breaker.try_acquire().expect("cooldown elapsed");
    assert!(trial.is_trial());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    assert!(breaker.try_acquire().is_err(), "only one trial at a time");

    trial.success();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_half_open_trial_reopens_on_failure() {
    let breaker = breaker(1, 1_000);
    breaker.try_acquire().expect("closed").failure();

    tokio::time::advance(Duration::from_millis(1_000)).await;
    breaker.try_acquire().expect("trial").failure();

    assert_eq!(breaker.state(), CircuitState::Open);
    let rejected = breaker.try_acquire().err().expect("re-opened");
    assert_eq!(rejected.retry_after, Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn test_breaker_abandoned_trial_frees_slot() {
    let breaker = breaker(1, 1_000);
    breaker.try_acquire().expect("closed").failure();
    tokio::time::advance(Duration::from_millis(1_000)).await;

    drop(breaker.try_acquire().expect("trial"));

    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    let next = breaker.try_acquire().expect("next caller runs the trial");
    assert!(next.is_trial());
    next.success();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_failure_rate_trip() {
    let breaker = CircuitBreaker::new(
        "rate",
        BreakerConfig::new(100, Duration::from_secs(1)).with_failure_rate(0.5, 4),
    );

    breaker.try_acquire().expect("closed").success();
    breaker.try_acquire().expect("closed").failure();
    breaker.try_acquire().expect("closed").success();
    assert_eq!(breaker.state(), CircuitState::Closed);

    breaker.try_acquire().expect("closed").failure();
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_reset() {
    let breaker = breaker(1, 60_000);
    breaker.try_acquire().expect("closed").failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    breaker.reset();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(breaker.try_acquire().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_call_retries_transient_then_succeeds() {
    let policy = resilience(3, 10, 1_000);
    let calls = AtomicU32::new(0);

    let value = policy
        .call(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::unavailable("flaky"))
            } else {
                Ok(7)
            }
        })
        .await
        .expect("third attempt succeeds");

    assert_eq!(value, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(policy.breaker().state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_call_gives_up_after_max_attempts() {
    let policy = resilience(3, 10, 1_000);
    let calls = AtomicU32::new(0);

    let err = policy
        .call(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ProviderError::unavailable("down"))
        })
        .await
        .expect_err("always fails");

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(matches!(err, ResilienceError::Exhausted { attempts: 3, .. }));
    assert_eq!(policy.breaker().consecutive_failures(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_call_does_not_retry_caller_errors() {
    let policy = resilience(3, 1, 1_000);
    let calls = AtomicU32::new(0);

    let err = policy
        .call(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ProviderError::NamespaceNotFound {
                namespace: "ghost".to_string(),
            })
        })
        .await
        .expect_err("caller error");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(err.namespace_not_found(), Some("ghost"));
    assert_eq!(policy.breaker().state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_call_invalid_response_is_permanent_failure() {
    let policy = resilience(3, 1, 1_000);
    let calls = AtomicU32::new(0);

    let err = policy
        .call(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ProviderError::InvalidResponse {
                reason: "garbage".to_string(),
            })
        })
        .await
        .expect_err("permanent");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(err, ResilienceError::Permanent { .. }));
    assert_eq!(policy.breaker().state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_call_timeout_counts_as_failure() {
    let policy = resilience(2, 10, 100);

    let err = policy
        .call(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await
        .expect_err("times out");

    assert!(err.is_timeout());
    assert!(matches!(err, ResilienceError::Exhausted { attempts: 2, .. }));
    assert_eq!(policy.breaker().consecutive_failures(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_call_fails_fast_when_open() {
    let policy = resilience(1, 2, 1_000);
    let calls = Arc::new(AtomicU32::new(0));

    for _ in 0..2 {
        let calls = calls.clone();
        let _ = policy
            .call(move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ProviderError::unavailable("down"))
                }
            })
            .await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let err = policy
        .call(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .expect_err("circuit open");

    assert!(err.is_circuit_open());
    assert_eq!(calls.load(Ordering::SeqCst), 2, "no call while open");
}

#[tokio::test(start_paused = true)]
async fn test_call_stops_retrying_when_circuit_opens_midway() {
    let policy = resilience(5, 2, 1_000);
    let calls = AtomicU32::new(0);

    let err = policy
        .call(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ProviderError::unavailable("down"))
        })
        .await
        .expect_err("breaker trips during retries");

    assert!(err.is_circuit_open());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_call_leaves_breaker_untouched() {
    let policy = resilience(3, 1, 10_000);

    let call = policy.call(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    });
    let cancelled = tokio::time::timeout(Duration::from_millis(10), call).await;

    assert!(cancelled.is_err());
    assert_eq!(policy.breaker().state(), CircuitState::Closed);
    assert_eq!(policy.breaker().consecutive_failures(), 0);
}
