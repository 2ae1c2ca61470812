use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::index::{DenseIndex, SparseIndex};
use crate::corpus::{ChunkId, Namespace};
use crate::error::ProviderError;

/// Index returning canned `(chunk_id, score)` lists per namespace.
///
/// Implements both [`DenseIndex`] and [`SparseIndex`]; the query is ignored.
/// Namespaces without a canned response are reported as not found.
#[derive(Debug, Default)]
pub struct MockIndex {
    responses: Mutex<HashMap<Namespace, Vec<(ChunkId, f32)>>>,
    failures: Mutex<VecDeque<ProviderError>>,
    always_fail: Mutex<Option<ProviderError>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results<I, S>(self, namespace: &Namespace, results: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<ChunkId>,
    {
        self.set_results(namespace, results);
        self
    }

    pub fn set_results<I, S>(&self, namespace: &Namespace, results: I)
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<ChunkId>,
    {
        let results = results.into_iter().map(|(id, s)| (id.into(), s)).collect();
        self.responses.lock().insert(namespace.clone(), results);
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
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

    async fn respond(
        &self,
        namespace: &Namespace,
        top_n: usize,
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

        let responses = self.responses.lock();
        let results = responses
            .get(namespace)
            .ok_or_else(|| ProviderError::NamespaceNotFound {
                namespace: namespace.to_string(),
            })?;
        Ok(results.iter().take(top_n).cloned().collect())
    }
}

#[async_trait]
impl DenseIndex for MockIndex {
    async fn search(
        &self,
        namespace: &Namespace,
        _vector: &[f32],
        top_n: usize,
    ) -> Result<Vec<(ChunkId, f32)>, ProviderError> {
        self.respond(namespace, top_n).await
    }
}

#[async_trait]
impl SparseIndex for MockIndex {
    async fn search(
        &self,
        namespace: &Namespace,
        _query_text: &str,
        top_n: usize,
    ) -> Result<Vec<(ChunkId, f32)>, ProviderError> {
        self.respond(namespace, top_n).await
    }
}
