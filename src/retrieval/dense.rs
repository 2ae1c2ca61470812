use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::error::RetrieverError;
use super::index::DenseIndex;
use super::types::{CandidateScore, ScoreSource, rank_candidates};
use crate::corpus::Namespace;
use crate::resilience::Resilience;

/// Dense retrieval over an injected [`DenseIndex`].
///
/// Cosine scores are clamped into `[0, 1]`; non-finite scores are dropped.
#[derive(Clone)]
pub struct DenseRetriever {
    index: Arc<dyn DenseIndex>,
    resilience: Resilience,
}

impl std::fmt::Debug for DenseRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseRetriever")
            .field("resilience", &self.resilience)
            .finish_non_exhaustive()
    }
}

impl DenseRetriever {
    pub fn new(index: Arc<dyn DenseIndex>, resilience: Resilience) -> Self {
        Self { index, resilience }
    }

    pub fn resilience(&self) -> &Resilience {
        &self.resilience
    }

    #[instrument(skip(self, vector), fields(namespace = %namespace, dims = vector.len()))]
    pub async fn search(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_n: usize,
    ) -> Result<Vec<CandidateScore>, RetrieverError> {
        if top_n == 0 {
            return Err(RetrieverError::InvalidTopN);
        }

        let raw = self
            .resilience
            .call(|| self.index.search(namespace, vector, top_n))
            .await?;

        let total = raw.len();
        let scored: Vec<_> = raw
            .into_iter()
            .filter(|(_, score)| score.is_finite())
            .map(|(chunk_id, score)| (chunk_id, score.clamp(0.0, 1.0)))
            .collect();
        if scored.len() < total {
            warn!(dropped = total - scored.len(), "Dense index returned non-finite scores");
        }

        let candidates = rank_candidates(scored, ScoreSource::Dense, top_n);
        debug!(candidates = candidates.len(), "Dense search complete");
        Ok(candidates)
    }
}
