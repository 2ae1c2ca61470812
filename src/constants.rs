//! Engine-level defaults.
//!
//! Component defaults live next to their components (`resilience::config`,
//! `embedding::config`, `fusion::weights`, `context::assembler`).

/// Fused candidates surviving to the reranker.
pub const DEFAULT_FUSION_TOP_K: usize = 20;
/// Ranked candidates entering context assembly.
pub const DEFAULT_FINAL_TOP_K: usize = 8;
/// Candidates requested from each retriever.
pub const DEFAULT_RETRIEVER_TOP_N: usize = 50;

pub const DEFAULT_TOKEN_BUDGET: usize = 3_000;

pub const DEFAULT_RERANK_TIMEOUT_MS: u64 = 800;
pub const DEFAULT_EMBED_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 1_500;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 1_000;

pub const DEFAULT_EMBEDDING_MODEL: &str = "default";
