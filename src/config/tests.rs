use super::*;
use serial_test::serial;
use std::env;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_sift_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        for name in Config::ENV_VARS {
            env::remove_var(name);
        }
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.fusion_weights.dense(), 0.6);
    assert_eq!(config.fusion_weights.sparse(), 0.4);
    assert_eq!(config.fusion_strategy, FusionStrategy::WeightedLinear);
    assert_eq!(config.fusion_top_k, 20);
    assert_eq!(config.final_top_k, 8);
    assert_eq!(config.rerank_timeout, Duration::from_millis(800));
    assert_eq!(config.dedup_adjacency, 2);
    assert_eq!(config.token_budget, 3000);
    assert!(config.rerank_min_score.is_none());
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_sift_env();

    let config = Config::from_env().expect("should parse with defaults");

    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_sift_env();

    let config = with_env_vars(
        &[
            ("SIFT_FUSION_DENSE_WEIGHT", "0.7"),
            ("SIFT_FUSION_SPARSE_WEIGHT", "0.3"),
            ("SIFT_FUSION_TOP_K", "10"),
            ("SIFT_RERANK_TIMEOUT_MS", "250"),
            ("SIFT_CACHE_NORMALIZATION", "lowercase"),
            ("SIFT_RERANK_MIN_SCORE", "0.2"),
            ("SIFT_EMBEDDING_MODEL", "  bge-small  "),
        ],
        || Config::from_env().expect("should parse overrides"),
    );

    assert_eq!(config.fusion_weights.dense(), 0.7);
    assert_eq!(config.fusion_weights.sparse(), 0.3);
    assert_eq!(config.fusion_top_k, 10);
    assert_eq!(config.rerank_timeout, Duration::from_millis(250));
    assert_eq!(config.cache.normalization, TextNormalization::Lowercase);
    assert_eq!(config.rerank_min_score, Some(0.2));
    assert_eq!(config.embedding_model, "bge-small");
}

#[test]
#[serial]
fn test_from_env_rrf_strategy_reads_k() {
    clear_sift_env();

    let config = with_env_vars(
        &[("SIFT_FUSION_STRATEGY", "rrf"), ("SIFT_RRF_K", "30")],
        || Config::from_env().expect("should parse rrf"),
    );

    assert_eq!(config.fusion_strategy, FusionStrategy::ReciprocalRank { k: 30 });
}

#[test]
#[serial]
fn test_from_env_weighted_strategy_ignores_rrf_k() {
    clear_sift_env();

    let config = with_env_vars(&[("SIFT_RRF_K", "30")], || {
        Config::from_env().expect("should parse")
    });

    assert_eq!(config.fusion_strategy, FusionStrategy::WeightedLinear);
}

#[test]
#[serial]
fn test_from_env_rejects_weights_not_summing_to_one() {
    clear_sift_env();

    let result = with_env_vars(
        &[
            ("SIFT_FUSION_DENSE_WEIGHT", "0.7"),
            ("SIFT_FUSION_SPARSE_WEIGHT", "0.5"),
        ],
        Config::from_env,
    );

    assert!(matches!(result, Err(ConfigError::Fusion(_))));
}

#[test]
#[serial]
fn test_from_env_rejects_unparseable_number() {
    clear_sift_env();

    let result = with_env_vars(&[("SIFT_FUSION_TOP_K", "lots")], Config::from_env);

    match result {
        Err(ConfigError::InvalidValue { name, value, .. }) => {
            assert_eq!(name, "SIFT_FUSION_TOP_K");
            assert_eq!(value, "lots");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
#[serial]
fn test_from_env_rejects_unknown_strategy() {
    clear_sift_env();

    let result = with_env_vars(&[("SIFT_FUSION_STRATEGY", "borda")], Config::from_env);

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
#[serial]
fn test_from_env_blank_value_uses_default() {
    clear_sift_env();

    let config = with_env_vars(&[("SIFT_FINAL_TOP_K", "   ")], || {
        Config::from_env().expect("blank falls back")
    });

    assert_eq!(config.final_top_k, DEFAULT_FINAL_TOP_K);
}

#[test]
fn test_validate_rejects_zero_top_k() {
    let config = Config {
        fusion_top_k: 0,
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid {
            field: "fusion_top_k",
            ..
        })
    ));
}

#[test]
fn test_validate_rejects_zero_rrf_k() {
    let config = Config {
        fusion_strategy: FusionStrategy::ReciprocalRank { k: 0 },
        ..Default::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let config = Config {
        rerank_timeout: Duration::ZERO,
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid {
            field: "rerank_timeout",
            ..
        })
    ));
}

#[test]
fn test_validate_rejects_invalid_nested_configs() {
    let retry = Config {
        retry: RetryConfig::default().with_max_attempts(0),
        ..Default::default()
    };
    assert!(matches!(
        retry.validate(),
        Err(ConfigError::Invalid { field: "retry", .. })
    ));

    let breaker = Config {
        breaker: BreakerConfig::new(0, Duration::from_secs(1)),
        ..Default::default()
    };
    assert!(breaker.validate().is_err());

    let cache = Config {
        cache: EmbeddingCacheConfig {
            max_entries: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(cache.validate().is_err());
}

#[test]
fn test_validate_rejects_non_finite_min_score() {
    let config = Config {
        rerank_min_score: Some(f32::NAN),
        ..Default::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_blank_model() {
    let config = Config {
        embedding_model: "  ".to_string(),
        ..Default::default()
    };

    assert!(config.validate().is_err());
}
