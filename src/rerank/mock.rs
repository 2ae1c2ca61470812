use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::provider::{RerankCandidate, RerankerProvider};
use crate::corpus::ChunkId;
use crate::error::ProviderError;

/// Reranker with canned scores, latency, scripted failures and call counting.
///
/// Candidates without a canned score get `0.0`.
#[derive(Debug, Default)]
pub struct MockReranker {
    scores: Mutex<HashMap<ChunkId, f32>>,
    delay: Mutex<Option<Duration>>,
    failures: Mutex<VecDeque<ProviderError>>,
    always_fail: Mutex<Option<ProviderError>>,
    omit: Mutex<Option<ChunkId>>,
    calls: AtomicUsize,
}

impl MockReranker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scores<I, S>(self, scores: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<ChunkId>,
    {
        self.scores
            .lock()
            .extend(scores.into_iter().map(|(id, s)| (id.into(), s)));
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    /// Leaves `chunk_id` out of every response.
    pub fn omitting(self, chunk_id: impl Into<ChunkId>) -> Self {
        *self.omit.lock() = Some(chunk_id.into());
        self
    }

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
}

#[async_trait]
impl RerankerProvider for MockReranker {
    async fn score(
        &self,
        _query: &str,
        candidates: &[RerankCandidate],
    ) -> Result<Vec<(ChunkId, f32)>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

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

        let scores = self.scores.lock();
        let omit = self.omit.lock().clone();
        Ok(candidates
            .iter()
            .filter(|c| Some(&c.chunk_id) != omit.as_ref())
            .map(|c| {
                let score = scores.get(&c.chunk_id).copied().unwrap_or(0.0);
                (c.chunk_id.clone(), score)
            })
            .collect())
    }
}
