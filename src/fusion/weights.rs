use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::FusionError;

pub const DEFAULT_DENSE_WEIGHT: f32 = 0.6;
pub const DEFAULT_SPARSE_WEIGHT: f32 = 0.4;
pub const DEFAULT_RRF_K: u32 = 60;

/// Tolerance on `dense + sparse == 1.0`.
pub const WEIGHT_SUM_TOLERANCE: f32 = 1e-6;

/// Dense/sparse weights. Only constructible through [`FusionWeights::new`], so an
/// instance always sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusionWeights {
    dense: f32,
    sparse: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            dense: DEFAULT_DENSE_WEIGHT,
            sparse: DEFAULT_SPARSE_WEIGHT,
        }
    }
}

impl FusionWeights {
    pub fn new(dense: f32, sparse: f32) -> Result<Self, FusionError> {
        for (name, value) in [("dense", dense), ("sparse", sparse)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FusionError::WeightOutOfRange { name, value });
            }
        }

        let sum = dense + sparse;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(FusionError::WeightsDoNotSumToOne { dense, sparse, sum });
        }

        Ok(Self { dense, sparse })
    }

    pub fn dense(&self) -> f32 {
        self.dense
    }

    pub fn sparse(&self) -> f32 {
        self.sparse
    }
}

/// How dense and sparse lists are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FusionStrategy {
    #[default]
    /// `w_dense * dense + w_sparse * sparse`, missing scores count as 0.
    WeightedLinear,
    /// Weighted reciprocal rank fusion: `w_dense / (k + rank_dense) + w_sparse / (k + rank_sparse)`.
    ReciprocalRank { k: u32 },
}

impl FusionStrategy {
    pub fn rrf() -> Self {
        FusionStrategy::ReciprocalRank { k: DEFAULT_RRF_K }
    }
}

impl FromStr for FusionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted" | "linear" | "weighted_linear" => Ok(FusionStrategy::WeightedLinear),
            "rrf" | "reciprocal_rank" => Ok(FusionStrategy::rrf()),
            other => Err(format!("unknown fusion strategy '{other}'")),
        }
    }
}

impl fmt::Display for FusionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FusionStrategy::WeightedLinear => f.write_str("weighted"),
            FusionStrategy::ReciprocalRank { k } => write!(f, "rrf(k={k})"),
        }
    }
}
