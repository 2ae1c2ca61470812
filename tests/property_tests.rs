//! Property tests for assembly and fusion invariants.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use sift::context::{ChunkResolver, ContextAssembler};
use sift::corpus::{Chunk, ChunkId, InMemoryChunkStore, Namespace};
use sift::fusion::{FusionWeights, WEIGHT_SUM_TOLERANCE, merge};
use sift::resilience::{BreakerConfig, Resilience, RetryPolicy};
use sift::retrieval::{CandidateScore, ScoreSource, min_max_normalize};

fn assembler(adjacency: u32) -> ContextAssembler {
    let resolver = ChunkResolver::new(
        Arc::new(InMemoryChunkStore::new()),
        Resilience::new(
            "chunk_store",
            RetryPolicy::no_retry(),
            BreakerConfig::default(),
            Duration::from_secs(1),
        ),
    );
    ContextAssembler::new(resolver, adjacency)
}

/// Ranked chunks with unique `(document, ordinal)` pairs; scores fall with rank.
fn ranked_corpus(
    raw: Vec<(u8, u32, usize)>,
) -> (Vec<CandidateScore>, HashMap<ChunkId, Chunk>) {
    let namespace = Namespace::new("acme").expect("valid namespace");
    let mut seen = HashSet::new();
    let mut ranked = Vec::new();
    let mut chunks = HashMap::new();

    for (doc, ordinal, tokens) in raw {
        if !seen.insert((doc, ordinal)) {
            continue;
        }
        let chunk_id = ChunkId::new(format!("d{doc}-{ordinal}"));
        let rank = ranked.len() + 1;
        ranked.push(CandidateScore::new(
            chunk_id.clone(),
            1.0 / rank as f32,
            ScoreSource::Fused,
            rank,
        ));
        chunks.insert(
            chunk_id.clone(),
            Chunk::new(
                namespace.clone(),
                chunk_id,
                format!("doc-{doc}"),
                ordinal,
                format!("text of d{doc} #{ordinal}"),
                tokens,
            ),
        );
    }

    (ranked, chunks)
}

fn candidates(scores: &[f32], source: ScoreSource) -> Vec<CandidateScore> {
    scores
        .iter()
        .enumerate()
        .map(|(idx, score)| {
            CandidateScore::new(ChunkId::new(format!("c{idx}")), *score, source, idx + 1)
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_assembly_never_exceeds_budget(
        raw in prop::collection::vec((0u8..3, 0u32..12, 1usize..60), 0..30),
        budget in 0usize..300,
        adjacency in 0u32..4,
    ) {
        let (ranked, chunks) = ranked_corpus(raw);
        let namespace = Namespace::new("acme").expect("valid namespace");

        let result = assembler(adjacency).assemble_resolved(&namespace, &ranked, &chunks, budget);

        prop_assert!(result.total_tokens <= budget);
        let sum: usize = result.blocks.iter().map(|b| b.token_count).sum();
        prop_assert_eq!(sum, result.total_tokens);
    }

    #[test]
    fn prop_no_chunk_in_two_blocks(
        raw in prop::collection::vec((0u8..3, 0u32..12, 1usize..60), 0..30),
        budget in 0usize..600,
        adjacency in 0u32..4,
    ) {
        let (ranked, chunks) = ranked_corpus(raw);
        let namespace = Namespace::new("acme").expect("valid namespace");

        let result = assembler(adjacency).assemble_resolved(&namespace, &ranked, &chunks, budget);

        let mut seen = HashSet::new();
        for block in &result.blocks {
            let documents: HashSet<_> = block.citations.iter().map(|c| &c.document_id).collect();
            prop_assert_eq!(documents.len(), 1);

            let ordinals: Vec<u32> = block.citations.iter().map(|c| c.ordinal).collect();
            let mut sorted = ordinals.clone();
            sorted.sort_unstable();
            prop_assert_eq!(ordinals, sorted);

            for id in &block.chunk_ids {
                prop_assert!(chunks.contains_key(id));
                prop_assert!(seen.insert(id.clone()));
            }
        }
    }

    #[test]
    fn prop_weights_validated_by_sum(dense in 0.0f32..=1.0, sparse in 0.0f32..=1.0) {
        let valid = (dense + sparse - 1.0).abs() <= WEIGHT_SUM_TOLERANCE;
        prop_assert_eq!(FusionWeights::new(dense, sparse).is_ok(), valid);
    }

    #[test]
    fn prop_complementary_weights_accepted(dense in 0.0f32..=1.0) {
        prop_assert!(FusionWeights::new(dense, 1.0 - dense).is_ok());
    }

    #[test]
    fn prop_fused_scores_bounded_and_sorted(
        dense_scores in prop::collection::vec(0.0f32..=1.0, 0..20),
        sparse_scores in prop::collection::vec(0.0f32..=1.0, 0..20),
        dense_weight in 0.0f32..=1.0,
    ) {
        let weights = FusionWeights::new(dense_weight, 1.0 - dense_weight).expect("valid weights");
        let dense = candidates(&dense_scores, ScoreSource::Dense);
        let sparse = candidates(&sparse_scores, ScoreSource::Sparse);

        let fused = merge(&dense, &sparse, &weights);

        prop_assert_eq!(fused.len(), dense.len().max(sparse.len()));
        for pair in fused.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        for candidate in &fused {
            prop_assert!((-1e-6..=1.0 + 1e-6).contains(&candidate.score));
            prop_assert_eq!(candidate.source, ScoreSource::Fused);
        }
    }

    #[test]
    fn prop_min_max_normalize_in_unit_range(
        raw in prop::collection::vec(-50.0f32..50.0, 0..20),
    ) {
        let input: Vec<(ChunkId, f32)> = raw
            .iter()
            .enumerate()
            .map(|(idx, s)| (ChunkId::new(format!("c{idx}")), *s))
            .collect();

        let normalized = min_max_normalize(input);

        prop_assert_eq!(normalized.len(), raw.len());
        for (_, score) in &normalized {
            prop_assert!((0.0..=1.0).contains(score));
        }
    }
}
