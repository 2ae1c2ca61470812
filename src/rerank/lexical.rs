//! Term-overlap reranker for offline runs.

use std::collections::HashSet;

use async_trait::async_trait;

use super::provider::{RerankCandidate, RerankerProvider};
use crate::corpus::ChunkId;
use crate::error::ProviderError;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "can", "to",
    "of", "in", "for", "on", "with", "at", "by", "from", "as", "into", "through", "during",
    "before", "after", "above", "below", "between", "under", "then", "once", "here", "there",
    "when", "where", "why", "how", "all", "each", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "just", "and", "but", "if",
    "or", "because", "until", "while", "what", "which", "who", "whom", "this", "that", "these",
    "those", "am", "it", "its",
];

/// Scores candidates by query-term recall and Jaccard overlap, squashed into `[0, 1]`
/// with a logistic curve centred at 0.5.
#[derive(Debug, Clone)]
pub struct LexicalReranker {
    stop_words: HashSet<&'static str>,
}

impl Default for LexicalReranker {
    fn default() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }
}

impl LexicalReranker {
    pub fn new() -> Self {
        Self::default()
    }

    fn terms<'a>(&self, lowered: &'a str) -> HashSet<&'a str> {
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !self.stop_words.contains(w))
            .collect()
    }

    pub fn score_pair(&self, query: &str, candidate: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let candidate_lower = candidate.to_lowercase();
        let query_terms = self.terms(&query_lower);
        let candidate_terms = self.terms(&candidate_lower);

        if query_terms.is_empty() {
            return 0.0;
        }

        let matches = query_terms.intersection(&candidate_terms).count();
        let recall = matches as f32 / query_terms.len() as f32;
        let union = query_terms.union(&candidate_terms).count();
        let jaccard = if union > 0 {
            matches as f32 / union as f32
        } else {
            0.0
        };

        let base = 0.6 * recall + 0.4 * jaccard;
        (1.0 / (1.0 + (-8.0 * (base - 0.5)).exp())).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl RerankerProvider for LexicalReranker {
    async fn score(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
    ) -> Result<Vec<(ChunkId, f32)>, ProviderError> {
        Ok(candidates
            .iter()
            .map(|c| (c.chunk_id.clone(), self.score_pair(query, &c.text)))
            .collect())
    }
}
