//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `SIFT_*` environment variables; a value
//! that does not parse is an error rather than a silent fallback.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_EMBED_TIMEOUT_MS, DEFAULT_EMBEDDING_MODEL, DEFAULT_FINAL_TOP_K, DEFAULT_FUSION_TOP_K,
    DEFAULT_RERANK_TIMEOUT_MS, DEFAULT_RETRIEVER_TOP_N, DEFAULT_SEARCH_TIMEOUT_MS,
    DEFAULT_STORE_TIMEOUT_MS, DEFAULT_TOKEN_BUDGET,
};
use crate::context::DEFAULT_DEDUP_ADJACENCY;
use crate::embedding::{EmbeddingCacheConfig, TextNormalization};
use crate::fusion::{DEFAULT_RRF_K, FusionStrategy, FusionWeights};
use crate::resilience::{BreakerConfig, RetryConfig};

/// Retrieval engine configuration.
///
/// Use [`Config::from_env`] to read `SIFT_*` overrides on top of defaults, and
/// [`Config::validate`] (called by the engine builder) before use.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Dense/sparse fusion weights. Default: `0.6 / 0.4`.
    pub fusion_weights: FusionWeights,

    /// Fusion rule. Default: weighted linear.
    pub fusion_strategy: FusionStrategy,

    /// Fused candidates surviving to the reranker. Default: `20`.
    pub fusion_top_k: usize,

    /// Candidates entering context assembly when a request does not say. Default: `8`.
    pub final_top_k: usize,

    /// Candidates requested from each retriever. Default: `50`.
    pub retriever_top_n: usize,

    /// Retry policy for embedding, index and chunk store calls.
    pub retry: RetryConfig,

    /// Circuit breaker thresholds, one breaker per dependency.
    pub breaker: BreakerConfig,

    /// Embedding cache sizing, expiry and normalization.
    pub cache: EmbeddingCacheConfig,

    /// Hard latency budget of the reranker call. Default: `800ms`.
    pub rerank_timeout: Duration,

    /// Reranked candidates scoring below this are dropped. Default: unset.
    pub rerank_min_score: Option<f32>,

    pub embed_timeout: Duration,
    pub search_timeout: Duration,
    pub store_timeout: Duration,

    /// Ordinal distance strictly below which same-document chunks merge. Default: `2`.
    pub dedup_adjacency: u32,

    /// Model id passed to the embedding provider. Default: `"default"`.
    pub embedding_model: String,

    /// Token budget when a request does not say. Default: `3000`.
    pub token_budget: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fusion_weights: FusionWeights::default(),
            fusion_strategy: FusionStrategy::default(),
            fusion_top_k: DEFAULT_FUSION_TOP_K,
            final_top_k: DEFAULT_FINAL_TOP_K,
            retriever_top_n: DEFAULT_RETRIEVER_TOP_N,
            retry: RetryConfig::default(),
            breaker: BreakerConfig::default(),
            cache: EmbeddingCacheConfig::default(),
            rerank_timeout: Duration::from_millis(DEFAULT_RERANK_TIMEOUT_MS),
            rerank_min_score: None,
            embed_timeout: Duration::from_millis(DEFAULT_EMBED_TIMEOUT_MS),
            search_timeout: Duration::from_millis(DEFAULT_SEARCH_TIMEOUT_MS),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            dedup_adjacency: DEFAULT_DEDUP_ADJACENCY,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            token_budget: DEFAULT_TOKEN_BUDGET,
        }
    }
}

impl Config {
    pub const ENV_DENSE_WEIGHT: &'static str = "SIFT_FUSION_DENSE_WEIGHT";
    pub const ENV_SPARSE_WEIGHT: &'static str = "SIFT_FUSION_SPARSE_WEIGHT";
    pub const ENV_FUSION_STRATEGY: &'static str = "SIFT_FUSION_STRATEGY";
    pub const ENV_RRF_K: &'static str = "SIFT_RRF_K";
    pub const ENV_FUSION_TOP_K: &'static str = "SIFT_FUSION_TOP_K";
    pub const ENV_FINAL_TOP_K: &'static str = "SIFT_FINAL_TOP_K";
    pub const ENV_RETRIEVER_TOP_N: &'static str = "SIFT_RETRIEVER_TOP_N";
    pub const ENV_RETRY_MAX_ATTEMPTS: &'static str = "SIFT_RETRY_MAX_ATTEMPTS";
    pub const ENV_RETRY_BASE_DELAY_MS: &'static str = "SIFT_RETRY_BASE_DELAY_MS";
    pub const ENV_RETRY_MAX_DELAY_MS: &'static str = "SIFT_RETRY_MAX_DELAY_MS";
    pub const ENV_BREAKER_FAILURE_THRESHOLD: &'static str = "SIFT_BREAKER_FAILURE_THRESHOLD";
    pub const ENV_BREAKER_COOLDOWN_MS: &'static str = "SIFT_BREAKER_COOLDOWN_MS";
    pub const ENV_BREAKER_FAILURE_RATE: &'static str = "SIFT_BREAKER_FAILURE_RATE";
    pub const ENV_BREAKER_RATE_WINDOW: &'static str = "SIFT_BREAKER_RATE_WINDOW";
    pub const ENV_CACHE_MAX_ENTRIES: &'static str = "SIFT_CACHE_MAX_ENTRIES";
    pub const ENV_CACHE_TTL_S: &'static str = "SIFT_CACHE_TTL_S";
    pub const ENV_CACHE_NORMALIZATION: &'static str = "SIFT_CACHE_NORMALIZATION";
    pub const ENV_RERANK_TIMEOUT_MS: &'static str = "SIFT_RERANK_TIMEOUT_MS";
    pub const ENV_RERANK_MIN_SCORE: &'static str = "SIFT_RERANK_MIN_SCORE";
    pub const ENV_EMBED_TIMEOUT_MS: &'static str = "SIFT_EMBED_TIMEOUT_MS";
    pub const ENV_SEARCH_TIMEOUT_MS: &'static str = "SIFT_SEARCH_TIMEOUT_MS";
    pub const ENV_STORE_TIMEOUT_MS: &'static str = "SIFT_STORE_TIMEOUT_MS";
    pub const ENV_DEDUP_ADJACENCY: &'static str = "SIFT_DEDUP_ADJACENCY";
    pub const ENV_EMBEDDING_MODEL: &'static str = "SIFT_EMBEDDING_MODEL";
    pub const ENV_TOKEN_BUDGET: &'static str = "SIFT_TOKEN_BUDGET";

    /// Every variable read by [`Config::from_env`].
    pub const ENV_VARS: &'static [&'static str] = &[
        Self::ENV_DENSE_WEIGHT,
        Self::ENV_SPARSE_WEIGHT,
        Self::ENV_FUSION_STRATEGY,
        Self::ENV_RRF_K,
        Self::ENV_FUSION_TOP_K,
        Self::ENV_FINAL_TOP_K,
        Self::ENV_RETRIEVER_TOP_N,
        Self::ENV_RETRY_MAX_ATTEMPTS,
        Self::ENV_RETRY_BASE_DELAY_MS,
        Self::ENV_RETRY_MAX_DELAY_MS,
        Self::ENV_BREAKER_FAILURE_THRESHOLD,
        Self::ENV_BREAKER_COOLDOWN_MS,
        Self::ENV_BREAKER_FAILURE_RATE,
        Self::ENV_BREAKER_RATE_WINDOW,
        Self::ENV_CACHE_MAX_ENTRIES,
        Self::ENV_CACHE_TTL_S,
        Self::ENV_CACHE_NORMALIZATION,
        Self::ENV_RERANK_TIMEOUT_MS,
        Self::ENV_RERANK_MIN_SCORE,
        Self::ENV_EMBED_TIMEOUT_MS,
        Self::ENV_SEARCH_TIMEOUT_MS,
        Self::ENV_STORE_TIMEOUT_MS,
        Self::ENV_DEDUP_ADJACENCY,
        Self::ENV_EMBEDDING_MODEL,
        Self::ENV_TOKEN_BUDGET,
    ];

    /// Loads configuration from environment variables (falling back to defaults).
    ///
    /// Fusion weights are validated here, so a weight pair that does not sum to 1.0
    /// is rejected before any engine exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let dense = Self::parse_from_env(Self::ENV_DENSE_WEIGHT, defaults.fusion_weights.dense())?;
        let sparse =
            Self::parse_from_env(Self::ENV_SPARSE_WEIGHT, defaults.fusion_weights.sparse())?;
        let fusion_weights = FusionWeights::new(dense, sparse)?;

        let fusion_strategy =
            match Self::parse_from_env(Self::ENV_FUSION_STRATEGY, defaults.fusion_strategy)? {
                FusionStrategy::ReciprocalRank { .. } => FusionStrategy::ReciprocalRank {
                    k: Self::parse_from_env(Self::ENV_RRF_K, DEFAULT_RRF_K)?,
                },
                other => other,
            };

        let retry = RetryConfig {
            max_attempts: Self::parse_from_env(
                Self::ENV_RETRY_MAX_ATTEMPTS,
                defaults.retry.max_attempts,
            )?,
            base_delay: Self::parse_millis_from_env(
                Self::ENV_RETRY_BASE_DELAY_MS,
                defaults.retry.base_delay,
            )?,
            max_delay: Self::parse_millis_from_env(
                Self::ENV_RETRY_MAX_DELAY_MS,
                defaults.retry.max_delay,
            )?,
            ..defaults.retry
        };

        let breaker = BreakerConfig {
            failure_threshold: Self::parse_from_env(
                Self::ENV_BREAKER_FAILURE_THRESHOLD,
                defaults.breaker.failure_threshold,
            )?,
            cooldown: Self::parse_millis_from_env(
                Self::ENV_BREAKER_COOLDOWN_MS,
                defaults.breaker.cooldown,
            )?,
            failure_rate: Self::parse_optional_from_env(Self::ENV_BREAKER_FAILURE_RATE)?,
            rate_window: Self::parse_from_env(
                Self::ENV_BREAKER_RATE_WINDOW,
                defaults.breaker.rate_window,
            )?,
        };

        let cache = EmbeddingCacheConfig {
            max_entries: Self::parse_from_env(
                Self::ENV_CACHE_MAX_ENTRIES,
                defaults.cache.max_entries,
            )?,
            ttl: Duration::from_secs(Self::parse_from_env(
                Self::ENV_CACHE_TTL_S,
                defaults.cache.ttl.as_secs(),
            )?),
            normalization: Self::parse_from_env::<TextNormalization>(
                Self::ENV_CACHE_NORMALIZATION,
                defaults.cache.normalization,
            )?,
        };

        Ok(Self {
            fusion_weights,
            fusion_strategy,
            fusion_top_k: Self::parse_from_env(Self::ENV_FUSION_TOP_K, defaults.fusion_top_k)?,
            final_top_k: Self::parse_from_env(Self::ENV_FINAL_TOP_K, defaults.final_top_k)?,
            retriever_top_n: Self::parse_from_env(
                Self::ENV_RETRIEVER_TOP_N,
                defaults.retriever_top_n,
            )?,
            retry,
            breaker,
            cache,
            rerank_timeout: Self::parse_millis_from_env(
                Self::ENV_RERANK_TIMEOUT_MS,
                defaults.rerank_timeout,
            )?,
            rerank_min_score: Self::parse_optional_from_env(Self::ENV_RERANK_MIN_SCORE)?,
            embed_timeout: Self::parse_millis_from_env(
                Self::ENV_EMBED_TIMEOUT_MS,
                defaults.embed_timeout,
            )?,
            search_timeout: Self::parse_millis_from_env(
                Self::ENV_SEARCH_TIMEOUT_MS,
                defaults.search_timeout,
            )?,
            store_timeout: Self::parse_millis_from_env(
                Self::ENV_STORE_TIMEOUT_MS,
                defaults.store_timeout,
            )?,
            dedup_adjacency: Self::parse_from_env(
                Self::ENV_DEDUP_ADJACENCY,
                defaults.dedup_adjacency,
            )?,
            embedding_model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_MODEL,
                defaults.embedding_model,
            ),
            token_budget: Self::parse_from_env(Self::ENV_TOKEN_BUDGET, defaults.token_budget)?,
        })
    }

    /// Checks ranges and cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("fusion_top_k", self.fusion_top_k),
            ("final_top_k", self.final_top_k),
            ("retriever_top_n", self.retriever_top_n),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }

        if let FusionStrategy::ReciprocalRank { k: 0 } = self.fusion_strategy {
            return Err(invalid("rrf_k", "must be at least 1"));
        }

        self.retry
            .validate()
            .map_err(|reason| invalid("retry", reason))?;
        self.breaker
            .validate()
            .map_err(|reason| invalid("breaker", reason))?;
        self.cache
            .validate()
            .map_err(|reason| invalid("cache", reason))?;

        let timeouts = [
            ("rerank_timeout", self.rerank_timeout),
            ("embed_timeout", self.embed_timeout),
            ("search_timeout", self.search_timeout),
            ("store_timeout", self.store_timeout),
        ];
        for (field, value) in timeouts {
            if value.is_zero() {
                return Err(invalid(field, "must be non-zero"));
            }
        }

        if let Some(min_score) = self.rerank_min_score {
            if !min_score.is_finite() {
                return Err(invalid("rerank_min_score", "must be finite"));
            }
        }

        if self.embedding_model.trim().is_empty() {
            return Err(invalid("embedding_model", "cannot be empty"));
        }

        Ok(())
    }

    fn parse_from_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match Self::parse_optional_from_env(name)? {
            Some(value) => Ok(value),
            None => Ok(default),
        }
    }

    fn parse_optional_from_env<T>(name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Ok(raw) = env::var(name) else {
            return Ok(None);
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        trimmed
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name,
                value: raw.clone(),
                reason: e.to_string(),
            })
    }

    fn parse_millis_from_env(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        let millis = Self::parse_from_env(name, default.as_millis() as u64)?;
        Ok(Duration::from_millis(millis))
    }

    fn parse_string_from_env(name: &str, default: String) -> String {
        env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
