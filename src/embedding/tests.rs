use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use super::*;
use crate::error::ProviderError;
use crate::resilience::{BreakerConfig, Resilience, RetryConfig, RetryPolicy};

const MODEL: &str = "test-model";

fn resilience() -> Resilience {
    Resilience::new(
        "embedding",
        RetryPolicy::new(
            RetryConfig::default()
                .with_delays(Duration::from_millis(10), Duration::from_millis(50))
                .without_jitter(),
        ),
        BreakerConfig::default(),
        Duration::from_secs(2),
    )
}

fn cache_with(provider: Arc<MockEmbeddingProvider>, config: EmbeddingCacheConfig) -> EmbeddingCache {
    EmbeddingCache::new(provider, config, resilience())
}

fn cache(provider: Arc<MockEmbeddingProvider>) -> EmbeddingCache {
    cache_with(provider, EmbeddingCacheConfig::default())
}

#[test]
fn test_normalization_policies() {
    assert_eq!(TextNormalization::None.apply("  Rust "), "  Rust ");
    assert_eq!(TextNormalization::Trim.apply("  Rust "), "Rust");
    assert_eq!(TextNormalization::Lowercase.apply("  Rust "), "rust");
}

#[test]
fn test_normalization_from_str() {
    assert_eq!("TRIM".parse::<TextNormalization>(), Ok(TextNormalization::Trim));
    assert_eq!(
        "lowercase".parse::<TextNormalization>(),
        Ok(TextNormalization::Lowercase)
    );
    assert!("upper".parse::<TextNormalization>().is_err());
}

#[test]
fn test_cache_config_validation() {
    assert!(EmbeddingCacheConfig::default().validate().is_ok());

    let zero_entries = EmbeddingCacheConfig {
        max_entries: 0,
        ..Default::default()
    };
    assert!(zero_entries.validate().is_err());

    let zero_ttl = EmbeddingCacheConfig {
        ttl: Duration::ZERO,
        ..Default::default()
    };
    assert!(zero_ttl.validate().is_err());
}

#[test]
fn test_hashing_embedder_is_normalized_and_deterministic() {
    let embedder = HashingEmbedder::new(64);

    let a = embedder.embed_text("Circuit breakers stop cascading failures");
    let b = embedder.embed_text("Circuit breakers stop cascading failures");
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);

    let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);
}

#[test]
fn test_hashing_embedder_empty_text_is_zero_vector() {
    let vector = HashingEmbedder::new(16).embed_text("  ... ");
    assert!(vector.iter().all(|x| *x == 0.0));
}

#[tokio::test]
async fn test_hit_after_miss_skips_provider() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let cache = cache(provider.clone());

    let first = cache.get_or_compute("what is bm25", MODEL).await.expect("miss");
    let second = cache.get_or_compute("what is bm25", MODEL).await.expect("hit");

    assert_eq!(first, second);
    assert_eq!(provider.call_count(), 1);

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.provider_calls, 1);
}

#[tokio::test]
async fn test_trim_normalization_shares_entry() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let cache = cache(provider.clone());

    cache.get_or_compute("hybrid search", MODEL).await.expect("miss");
    cache.get_or_compute("  hybrid search\n", MODEL).await.expect("hit");

    assert_eq!(provider.call_count(), 1);
    assert_eq!(provider.seen()[0].0, "hybrid search");
}

#[tokio::test]
async fn test_model_id_is_part_of_key() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let cache = cache(provider.clone());

    cache.get_or_compute("query", "model-a").await.expect("a");
    cache.get_or_compute("query", "model-b").await.expect("b");

    assert_eq!(provider.call_count(), 2);
    assert!(cache.get("query", "model-a").is_some());
    assert!(cache.get("query", "model-c").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_single_flight() {
    let provider = Arc::new(MockEmbeddingProvider::new().with_delay(Duration::from_millis(50)));
    let cache = cache(provider.clone());

    let results = join_all((0..16).map(|_| cache.get_or_compute("same question", MODEL))).await;

    assert_eq!(provider.call_count(), 1);
    let first = results[0].as_ref().expect("computed").clone();
    for result in &results {
        assert_eq!(result.as_ref().expect("shared result"), &first);
    }
    assert_eq!(cache.stats().coalesced, 15);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_for_distinct_keys_run_independently() {
    let provider = Arc::new(MockEmbeddingProvider::new().with_delay(Duration::from_millis(50)));
    let cache = cache(provider.clone());

    let texts = ["alpha", "beta", "gamma"];
    let results = join_all(texts.iter().map(|t| cache.get_or_compute(t, MODEL))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_is_retried() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    provider.fail_next(2, ProviderError::unavailable("503"));
    let cache = cache(provider.clone());

    let vector = cache.get_or_compute("retry me", MODEL).await;

    assert!(vector.is_ok());
    assert_eq!(provider.call_count(), 3);
    assert_eq!(cache.stats().provider_calls, 3);
}

#[tokio::test(start_paused = true)]
async fn test_failure_writes_nothing_and_reaches_all_waiters() {
    let provider = Arc::new(MockEmbeddingProvider::new().with_delay(Duration::from_millis(20)));
    provider.fail_always(ProviderError::unavailable("down"));
    let cache = cache(provider.clone());

    let results = join_all((0..4).map(|_| cache.get_or_compute("doomed", MODEL))).await;

    for result in &results {
        assert!(matches!(result, Err(EmbeddingError::Unavailable { .. })));
    }
    assert_eq!(provider.call_count(), 3, "one leader, three attempts");
    assert!(cache.get("doomed", MODEL).is_none());

    provider.recover();
    cache.get_or_compute("doomed", MODEL).await.expect("recovered");
    assert_eq!(provider.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_follower_takes_over_when_leader_cancelled() {
    let provider = Arc::new(MockEmbeddingProvider::new().with_delay(Duration::from_millis(100)));
    let cache = Arc::new(cache(provider.clone()));

    let leader = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_or_compute("handoff", MODEL).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let follower = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_or_compute("handoff", MODEL).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    leader.abort();
    let result = follower.await.expect("join");

    assert!(result.is_ok());
    assert_eq!(provider.call_count(), 2);
    assert!(cache.get("handoff", MODEL).is_some());
}

#[tokio::test]
async fn test_invalid_vector_is_not_cached() {
    struct EmptyProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for EmptyProvider {
        async fn embed(&self, _text: &str, _model_id: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(Vec::new())
        }
    }

    let cache = EmbeddingCache::new(
        Arc::new(EmptyProvider),
        EmbeddingCacheConfig::default(),
        resilience(),
    );

    let err = cache.get_or_compute("x", MODEL).await.expect_err("empty vector");
    assert!(matches!(err, EmbeddingError::InvalidVector { .. }));
    assert_eq!(cache.entry_count(), 0);
}

#[tokio::test]
async fn test_capacity_bounds_entries() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let cache = cache_with(
        provider,
        EmbeddingCacheConfig {
            max_entries: 2,
            ..Default::default()
        },
    );

    for text in ["one", "two", "three", "four"] {
        cache.get_or_compute(text, MODEL).await.expect("computed");
    }
    cache.run_pending_tasks();

    assert!(cache.entry_count() <= 2);
}

#[tokio::test]
async fn test_expired_entry_is_recomputed() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let cache = cache_with(
        provider.clone(),
        EmbeddingCacheConfig {
            ttl: Duration::from_millis(200),
            ..Default::default()
        },
    );

    let first = cache.get_or_compute("ttl query", MODEL).await.expect("miss");
    // moka expires on its own clock, so the wait has to be real time.
    tokio::time::sleep(Duration::from_millis(400)).await;
    cache.run_pending_tasks();

    assert!(cache.get("ttl query", MODEL).is_none());
    let second = cache.get_or_compute("ttl query", MODEL).await.expect("recomputed");

    assert_eq!(first, second);
    assert_eq!(provider.call_count(), 2);
    let stats = cache.stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.provider_calls, 2);
    assert_eq!(stats.hits, 0);
}
