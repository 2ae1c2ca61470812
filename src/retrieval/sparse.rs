use std::sync::Arc;

use tracing::{debug, instrument};

use super::error::RetrieverError;
use super::index::SparseIndex;
use super::types::{CandidateScore, ScoreSource, rank_candidates};
use crate::corpus::{ChunkId, Namespace};
use crate::resilience::Resilience;

const FLAT_RANGE_EPSILON: f32 = 1e-9;

/// Sparse retrieval over an injected [`SparseIndex`].
///
/// Raw BM25 magnitudes depend on corpus size, so scores are min-max normalized
/// within the candidate set of each call. A set whose scores are all equal maps
/// to `1.0`.
#[derive(Clone)]
pub struct SparseRetriever {
    index: Arc<dyn SparseIndex>,
    resilience: Resilience,
}

impl std::fmt::Debug for SparseRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseRetriever")
            .field("resilience", &self.resilience)
            .finish_non_exhaustive()
    }
}

impl SparseRetriever {
    pub fn new(index: Arc<dyn SparseIndex>, resilience: Resilience) -> Self {
        Self { index, resilience }
    }

    pub fn resilience(&self) -> &Resilience {
        &self.resilience
    }

    #[instrument(skip(self, query_text), fields(namespace = %namespace, query_len = query_text.len()))]
    pub async fn search(
        &self,
        namespace: &Namespace,
        query_text: &str,
        top_n: usize,
    ) -> Result<Vec<CandidateScore>, RetrieverError> {
        if top_n == 0 {
            return Err(RetrieverError::InvalidTopN);
        }

        let raw = self
            .resilience
            .call(|| self.index.search(namespace, query_text, top_n))
            .await?;

        let candidates = rank_candidates(min_max_normalize(raw), ScoreSource::Sparse, top_n);
        debug!(candidates = candidates.len(), "Sparse search complete");
        Ok(candidates)
    }
}

/// Min-max normalizes scores into `[0, 1]`; non-finite scores are dropped.
pub fn min_max_normalize(raw: Vec<(ChunkId, f32)>) -> Vec<(ChunkId, f32)> {
    let finite: Vec<_> = raw.into_iter().filter(|(_, s)| s.is_finite()).collect();

    let (min, max) = finite
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (_, s)| {
            (lo.min(*s), hi.max(*s))
        });
    let range = max - min;

    finite
        .into_iter()
        .map(|(chunk_id, score)| {
            let normalized = if range <= FLAT_RANGE_EPSILON {
                1.0
            } else {
                (score - min) / range
            };
            (chunk_id, normalized)
        })
        .collect()
}
