//! Hybrid merger: fuses dense and sparse candidate lists into one ranking.

mod error;
pub mod merger;
pub mod weights;


pub use error::FusionError;
pub use merger::{HybridMerger, merge, reciprocal_rank_merge};
pub use weights::{
    DEFAULT_DENSE_WEIGHT, DEFAULT_RRF_K, DEFAULT_SPARSE_WEIGHT, FusionStrategy, FusionWeights,
    WEIGHT_SUM_TOLERANCE,
};
