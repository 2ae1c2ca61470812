use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FusionError {
    #[error("fusion weight '{name}' must be within [0, 1], got {value}")]
    WeightOutOfRange { name: &'static str, value: f32 },

    #[error("fusion weights must sum to 1.0, got {dense} + {sparse} = {sum}")]
    WeightsDoNotSumToOne { dense: f32, sparse: f32, sum: f32 },

    #[error("fusion_top_k must be at least 1")]
    ZeroTopK,

    #[error("rrf k must be at least 1")]
    ZeroRrfK,
}
