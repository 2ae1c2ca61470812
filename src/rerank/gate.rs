//! Reranker gate.
//!
//! Reranked scores replace fused scores outright. The provider gets one attempt per
//! query under a hard timeout and a circuit breaker; any failure returns the fused
//! order unchanged, tagged with a [`Degradation`]. Reranking never fails a query.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::provider::{RerankCandidate, RerankerProvider};
use crate::context::Degradation;
use crate::corpus::{Chunk, ChunkId};
use crate::error::ProviderError;
use crate::resilience::{Resilience, ResilienceError};
use crate::retrieval::{CandidateScore, ScoreSource};

/// Ranked candidates plus the degradation, if the reranker was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankOutcome {
    pub candidates: Vec<CandidateScore>,
    pub degradation: Option<Degradation>,
}

impl RerankOutcome {
    fn degraded(candidates: Vec<CandidateScore>, degradation: Degradation) -> Self {
        Self {
            candidates,
            degradation: Some(degradation),
        }
    }
}

#[derive(Clone)]
pub struct RerankerGate {
    provider: Arc<dyn RerankerProvider>,
    resilience: Resilience,
    min_score: Option<f32>,
}

impl std::fmt::Debug for RerankerGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankerGate")
            .field("resilience", &self.resilience)
            .field("min_score", &self.min_score)
            .finish_non_exhaustive()
    }
}

impl RerankerGate {
    /// `resilience` should allow a single attempt; its timeout is the rerank latency
    /// budget.
    pub fn new(provider: Arc<dyn RerankerProvider>, resilience: Resilience) -> Self {
        Self {
            provider,
            resilience,
            min_score: None,
        }
    }

    /// Drops reranked candidates scoring below `min_score`. Not applied when degraded.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn resilience(&self) -> &Resilience {
        &self.resilience
    }

    /// Reranks `fused` using the text of `chunks`. Candidates without a resolved chunk
    /// are not sent to the provider and are left out of the result.
    #[instrument(skip_all, fields(candidates = fused.len()))]
    pub async fn rerank(
        &self,
        query: &str,
        fused: Vec<CandidateScore>,
        chunks: &HashMap<ChunkId, Chunk>,
    ) -> RerankOutcome {
        let fused: Vec<CandidateScore> = fused
            .into_iter()
            .filter(|c| chunks.contains_key(&c.chunk_id))
            .collect();
        if fused.is_empty() {
            return RerankOutcome {
                candidates: fused,
                degradation: None,
            };
        }

        let inputs: Vec<RerankCandidate> = fused
            .iter()
            .filter_map(|c| {
                chunks.get(&c.chunk_id).map(|chunk| RerankCandidate {
                    chunk_id: c.chunk_id.clone(),
                    text: chunk.text.clone(),
                })
            })
            .collect();

        let provider = &self.provider;
        let inputs = &inputs;
        let result = self
            .resilience
            .call(|| async move {
                let scores = provider.score(query, inputs).await?;
                align_scores(inputs, scores)
            })
            .await;

        match result {
            Ok(scores) => RerankOutcome {
                candidates: self.apply(&fused, scores),
                degradation: None,
            },
            Err(err) => {
                let degradation = classify(&err);
                warn!(error = %err, degradation = %degradation, "Reranker skipped, keeping fused order");
                RerankOutcome::degraded(fused, degradation)
            }
        }
    }

    fn apply(&self, fused: &[CandidateScore], scores: HashMap<ChunkId, f32>) -> Vec<CandidateScore> {
        let mut reranked: Vec<(usize, ChunkId, f32)> = fused
            .iter()
            .filter_map(|c| scores.get(&c.chunk_id).map(|s| (c.rank, c.chunk_id.clone(), *s)))
            .collect();

        reranked.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

        let before = reranked.len();
        if let Some(min_score) = self.min_score {
            reranked.retain(|(_, _, score)| *score >= min_score);
        }
        debug!(
            reranked = before,
            kept = reranked.len(),
            top_score = reranked.first().map(|(_, _, s)| *s),
            "Rerank complete"
        );

        reranked
            .into_iter()
            .enumerate()
            .map(|(idx, (_, chunk_id, score))| {
                CandidateScore::new(chunk_id, score, ScoreSource::Reranked, idx + 1)
            })
            .collect()
    }
}

/// Checks that every candidate received exactly one finite score.
fn align_scores(
    inputs: &[RerankCandidate],
    scores: Vec<(ChunkId, f32)>,
) -> Result<HashMap<ChunkId, f32>, ProviderError> {
    let scores: HashMap<ChunkId, f32> = scores.into_iter().collect();

    for input in inputs {
        match scores.get(&input.chunk_id) {
            Some(score) if score.is_finite() => {}
            Some(_) => {
                return Err(ProviderError::InvalidResponse {
                    reason: format!("non-finite score for chunk '{}'", input.chunk_id),
                });
            }
            None => {
                return Err(ProviderError::InvalidResponse {
                    reason: format!("no score for chunk '{}'", input.chunk_id),
                });
            }
        }
    }

    Ok(scores)
}

fn classify(err: &ResilienceError) -> Degradation {
    if err.is_timeout() {
        Degradation::RerankerTimeout
    } else {
        Degradation::RerankerUnavailable
    }
}
