//! Optional cross-encoder reranking behind a latency budget and circuit breaker.

pub mod gate;
pub mod lexical;
pub mod provider;

#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use gate::{RerankOutcome, RerankerGate};
pub use lexical::LexicalReranker;
pub use provider::{RerankCandidate, RerankerProvider};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockReranker;
