use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::corpus::ChunkId;

/// Which stage produced a [`CandidateScore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Dense,
    Sparse,
    Fused,
    Reranked,
}

impl ScoreSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreSource::Dense => "dense",
            ScoreSource::Sparse => "sparse",
            ScoreSource::Fused => "fused",
            ScoreSource::Reranked => "reranked",
        }
    }
}

impl fmt::Display for ScoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored candidate, valid for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub chunk_id: ChunkId,
    /// Normalized score in `[0, 1]` for dense, sparse and weighted fusion.
    pub score: f32,
    pub source: ScoreSource,
    /// 1-based position in the list that produced this score.
    pub rank: usize,
}

impl CandidateScore {
    pub fn new(chunk_id: ChunkId, score: f32, source: ScoreSource, rank: usize) -> Self {
        Self {
            chunk_id,
            score,
            source,
            rank,
        }
    }
}

/// Keeps the best score per chunk id, orders by score (ties by chunk id), truncates
/// to `top_n` and assigns 1-based ranks.
pub(crate) fn rank_candidates(
    scored: impl IntoIterator<Item = (ChunkId, f32)>,
    source: ScoreSource,
    top_n: usize,
) -> Vec<CandidateScore> {
    let mut best: HashMap<ChunkId, f32> = HashMap::new();
    for (chunk_id, score) in scored {
        best.entry(chunk_id)
            .and_modify(|current| *current = current.max(score))
            .or_insert(score);
    }

    let mut ordered: Vec<(ChunkId, f32)> = best.into_iter().collect();
    ordered.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ordered.truncate(top_n);

    ordered
        .into_iter()
        .enumerate()
        .map(|(idx, (chunk_id, score))| CandidateScore::new(chunk_id, score, source, idx + 1))
        .collect()
}
