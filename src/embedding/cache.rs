//! Content-addressed embedding cache with single-flight miss handling.
//!
//! Entries are keyed by [`embedding_key`] over `(normalized text, model id)` and
//! are never replaced once written: a racing insert for an existing key keeps the
//! stored vector. Concurrent misses for one key are collapsed through an in-flight
//! table; the first caller (the leader) calls the provider, everyone else waits on
//! the leader's `watch` channel. If the leader is cancelled before publishing, the
//! waiters retry and one of them takes over.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use super::config::EmbeddingCacheConfig;
use super::error::EmbeddingError;
use super::provider::EmbeddingProvider;
use crate::hashing::{EmbeddingKey, embedding_key, key_prefix};
use crate::resilience::Resilience;

/// Shared, immutable embedding vector.
pub type Embedding = Arc<[f32]>;

type FlightOutcome = Option<Result<Embedding, EmbeddingError>>;

#[derive(Debug, Clone)]
struct CachedEmbedding {
    vector: Embedding,
    created_at: DateTime<Utc>,
}

/// Counters exposed for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Calls issued to the provider, retries included.
    pub provider_calls: u64,
    /// Callers that waited on another caller's computation.
    pub coalesced: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    provider_calls: AtomicU64,
    coalesced: AtomicU64,
}

enum Role {
    Leader(watch::Sender<FlightOutcome>),
    Follower(watch::Receiver<FlightOutcome>),
}

/// Removes the in-flight entry when the leader finishes or is dropped.
struct FlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<EmbeddingKey, watch::Receiver<FlightOutcome>>>,
    key: EmbeddingKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    entries: Cache<EmbeddingKey, CachedEmbedding>,
    in_flight: Mutex<HashMap<EmbeddingKey, watch::Receiver<FlightOutcome>>>,
    resilience: Resilience,
    config: EmbeddingCacheConfig,
    counters: Counters,
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("entries", &self.entries.entry_count())
            .field("in_flight", &self.in_flight.lock().len())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl EmbeddingCache {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        config: EmbeddingCacheConfig,
        resilience: Resilience,
    ) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            provider,
            entries,
            in_flight: Mutex::new(HashMap::new()),
            resilience,
            config,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &EmbeddingCacheConfig {
        &self.config
    }

    pub fn resilience(&self) -> &Resilience {
        &self.resilience
    }

    /// Returns the vector for `text` under `model_id`, computing it on a miss.
    ///
    /// On provider failure nothing is cached and every waiter receives the error.
    #[instrument(skip(self, text), fields(text_len = text.len(), model_id = %model_id))]
    pub async fn get_or_compute(
        &self,
        text: &str,
        model_id: &str,
    ) -> Result<Embedding, EmbeddingError> {
        let normalized = self.config.normalization.apply(text);
        let key = embedding_key(&normalized, model_id);

        loop {
            if let Some(vector) = self.lookup(&key) {
                return Ok(vector);
            }

            let role = {
                let mut in_flight = self.in_flight.lock();
                match in_flight.get(&key) {
                    Some(rx) => Role::Follower(rx.clone()),
                    None => {
                        // The previous leader may have finished between the lookup
                        // above and taking the lock.
                        if let Some(vector) = self.lookup(&key) {
                            return Ok(vector);
                        }
                        let (tx, rx) = watch::channel(None);
                        in_flight.insert(key, rx);
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Leader(tx) => return self.lead(key, &normalized, model_id, tx).await,
                Role::Follower(mut rx) => {
                    let outcome = match rx.wait_for(Option::is_some).await {
                        Ok(outcome) => outcome.clone(),
                        Err(_) => {
                            debug!(key = %key_prefix(&key), "In-flight leader dropped, retrying");
                            continue;
                        }
                    };
                    if let Some(outcome) = outcome {
                        self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                        return outcome;
                    }
                }
            }
        }
    }

    /// Cached vector for `text`, without computing on a miss.
    pub fn get(&self, text: &str, model_id: &str) -> Option<Embedding> {
        let normalized = self.config.normalization.apply(text);
        self.entries
            .get(&embedding_key(&normalized, model_id))
            .map(|entry| entry.vector)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            provider_calls: self.counters.provider_calls.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }

    /// Approximate entry count; pending evictions may not be reflected yet.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    fn lookup(&self, key: &EmbeddingKey) -> Option<Embedding> {
        let entry = self.entries.get(key)?;
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        debug!(
            key = %key_prefix(key),
            age_s = (Utc::now() - entry.created_at).num_seconds(),
            "Embedding cache hit"
        );
        Some(entry.vector)
    }

    async fn lead(
        &self,
        key: EmbeddingKey,
        normalized: &str,
        model_id: &str,
        tx: watch::Sender<FlightOutcome>,
    ) -> Result<Embedding, EmbeddingError> {
        let _guard = FlightGuard {
            in_flight: &self.in_flight,
            key,
        };
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key_prefix(&key), "Embedding cache miss");

        let outcome = match self.compute(normalized, model_id).await {
            Ok(vector) => {
                let stored = self
                    .entries
                    .entry(key)
                    .or_insert(CachedEmbedding {
                        vector,
                        created_at: Utc::now(),
                    })
                    .into_value();
                Ok(stored.vector)
            }
            Err(error) => {
                warn!(model_id = %model_id, error = %error, "Embedding computation failed");
                Err(error)
            }
        };

        tx.send_replace(Some(outcome.clone()));
        outcome
    }

    async fn compute(&self, normalized: &str, model_id: &str) -> Result<Embedding, EmbeddingError> {
        let vector = self
            .resilience
            .call(|| {
                self.counters.provider_calls.fetch_add(1, Ordering::Relaxed);
                self.provider.embed(normalized, model_id)
            })
            .await
            .map_err(|source| EmbeddingError::Unavailable {
                model_id: model_id.to_string(),
                source,
            })?;

        if vector.is_empty() {
            return Err(EmbeddingError::InvalidVector {
                model_id: model_id.to_string(),
                reason: "empty vector".to_string(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(EmbeddingError::InvalidVector {
                model_id: model_id.to_string(),
                reason: "vector contains non-finite values".to_string(),
            });
        }

        Ok(Arc::from(vector))
    }
}
