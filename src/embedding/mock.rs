use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::hashing_embedder::HashingEmbedder;
use super::provider::EmbeddingProvider;
use crate::error::ProviderError;

/// Embedding provider with call counting, latency, and scripted failures.
///
/// Successful calls delegate to a [`HashingEmbedder`], so vectors are deterministic.
#[derive(Debug, Default)]
pub struct MockEmbeddingProvider {
    inner: HashingEmbedder,
    calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
    failures: Mutex<VecDeque<ProviderError>>,
    always_fail: Mutex<Option<ProviderError>>,
    seen: Mutex<Vec<(String, String)>>,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    /// Fails the next `count` calls with `error`, then recovers.
    pub fn fail_next(&self, count: usize, error: ProviderError) {
        let mut failures = self.failures.lock();
        for _ in 0..count {
            failures.push_back(error.clone());
        }
    }

    pub fn fail_always(&self, error: ProviderError) {
        *self.always_fail.lock() = Some(error);
    }

    pub fn recover(&self) {
        *self.always_fail.lock() = None;
        self.failures.lock().clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(text, model_id)` pairs received, in call order.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str, model_id: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .push((text.to_string(), model_id.to_string()));

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.always_fail.lock().clone() {
            return Err(error);
        }
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }

        Ok(self.inner.embed_text(text))
    }
}
