//! Dense and sparse retrieval.
//!
//! Retrievers wrap an injected index behind the resilience layer and return
//! [`CandidateScore`]s normalized into `[0, 1]`, best first.

pub mod dense;
mod error;
pub mod index;
pub mod memory;
pub mod sparse;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use dense::DenseRetriever;
pub use error::RetrieverError;
pub use index::{DenseIndex, SparseIndex};
pub use memory::{Bm25SparseIndex, InMemoryDenseIndex, cosine_similarity};
pub use sparse::{SparseRetriever, min_max_normalize};
pub use types::{CandidateScore, ScoreSource};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockIndex;
