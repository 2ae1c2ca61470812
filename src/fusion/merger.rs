use std::collections::HashMap;

use tracing::debug;

use super::error::FusionError;
use super::weights::{FusionStrategy, FusionWeights};
use crate::corpus::ChunkId;
use crate::retrieval::{CandidateScore, ScoreSource};

#[derive(Debug, Default, Clone, Copy)]
struct Signals {
    dense: Option<(f32, usize)>,
    sparse: Option<(f32, usize)>,
}

impl Signals {
    fn dense_score(&self) -> f32 {
        self.dense.map_or(0.0, |(score, _)| score)
    }

    fn sparse_score(&self) -> f32 {
        self.sparse.map_or(0.0, |(score, _)| score)
    }
}

fn collect_signals(
    dense: &[CandidateScore],
    sparse: &[CandidateScore],
) -> HashMap<ChunkId, Signals> {
    let mut signals: HashMap<ChunkId, Signals> = HashMap::new();

    for (idx, candidate) in dense.iter().enumerate() {
        let entry = signals.entry(candidate.chunk_id.clone()).or_default();
        if entry.dense.is_none() {
            entry.dense = Some((candidate.score, idx + 1));
        }
    }
    for (idx, candidate) in sparse.iter().enumerate() {
        let entry = signals.entry(candidate.chunk_id.clone()).or_default();
        if entry.sparse.is_none() {
            entry.sparse = Some((candidate.score, idx + 1));
        }
    }

    signals
}

fn rank_fused(mut fused: Vec<(ChunkId, f32, f32)>) -> Vec<CandidateScore> {
    // (chunk_id, fused score, raw dense score)
    fused.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| b.2.total_cmp(&a.2))
            .then_with(|| a.0.cmp(&b.0))
    });

    fused
        .into_iter()
        .enumerate()
        .map(|(idx, (chunk_id, score, _))| {
            CandidateScore::new(chunk_id, score, ScoreSource::Fused, idx + 1)
        })
        .collect()
}

/// Weighted linear fusion of two normalized candidate lists.
///
/// Candidates are unioned by chunk id; a chunk missing from one list scores 0 there.
/// Ties on the fused score prefer the higher dense score, then the lower chunk id.
pub fn merge(
    dense: &[CandidateScore],
    sparse: &[CandidateScore],
    weights: &FusionWeights,
) -> Vec<CandidateScore> {
    let fused = collect_signals(dense, sparse)
        .into_iter()
        .map(|(chunk_id, s)| {
            let score = weights.dense() * s.dense_score() + weights.sparse() * s.sparse_score();
            (chunk_id, score, s.dense_score())
        })
        .collect();

    rank_fused(fused)
}

/// Weighted reciprocal rank fusion. Ranks are list positions (1-based); a chunk
/// missing from one list contributes nothing from it.
pub fn reciprocal_rank_merge(
    dense: &[CandidateScore],
    sparse: &[CandidateScore],
    weights: &FusionWeights,
    k: u32,
) -> Vec<CandidateScore> {
    let k = k as f32;
    let contribution = |signal: Option<(f32, usize)>, weight: f32| {
        signal.map_or(0.0, |(_, rank)| weight / (k + rank as f32))
    };

    let fused = collect_signals(dense, sparse)
        .into_iter()
        .map(|(chunk_id, s)| {
            let score =
                contribution(s.dense, weights.dense()) + contribution(s.sparse, weights.sparse());
            (chunk_id, score, s.dense_score())
        })
        .collect();

    rank_fused(fused)
}

/// Applies the configured strategy and truncates to `fusion_top_k`.
#[derive(Debug, Clone)]
pub struct HybridMerger {
    weights: FusionWeights,
    strategy: FusionStrategy,
    fusion_top_k: usize,
}

impl HybridMerger {
    pub fn new(
        weights: FusionWeights,
        strategy: FusionStrategy,
        fusion_top_k: usize,
    ) -> Result<Self, FusionError> {
        if fusion_top_k == 0 {
            return Err(FusionError::ZeroTopK);
        }
        if let FusionStrategy::ReciprocalRank { k: 0 } = strategy {
            return Err(FusionError::ZeroRrfK);
        }
        Ok(Self {
            weights,
            strategy,
            fusion_top_k,
        })
    }

    pub fn weights(&self) -> &FusionWeights {
        &self.weights
    }

    pub fn strategy(&self) -> FusionStrategy {
        self.strategy
    }

    pub fn fusion_top_k(&self) -> usize {
        self.fusion_top_k
    }

    pub fn merge(&self, dense: &[CandidateScore], sparse: &[CandidateScore]) -> Vec<CandidateScore> {
        let mut fused = match self.strategy {
            FusionStrategy::WeightedLinear => merge(dense, sparse, &self.weights),
            FusionStrategy::ReciprocalRank { k } => {
                reciprocal_rank_merge(dense, sparse, &self.weights, k)
            }
        };

        let before = fused.len();
        fused.truncate(self.fusion_top_k);
        debug!(
            dense = dense.len(),
            sparse = sparse.len(),
            fused = before,
            kept = fused.len(),
            strategy = %self.strategy,
            "Fused candidate lists"
        );
        fused
    }
}
