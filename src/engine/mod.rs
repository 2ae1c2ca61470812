//! The `retrieve` operation.
//!
//! [`RetrievalEngine`] owns one resilience policy (retry, timeout, circuit breaker)
//! per collaborator and runs the full pipeline for a query: embed, dense and
//! sparse search in parallel, fuse, resolve, optionally rerank, assemble.

pub mod builder;
mod pipeline;
pub mod request;


pub use builder::{
    CHUNK_STORE_DEPENDENCY, DENSE_DEPENDENCY, EMBEDDING_DEPENDENCY, RERANKER_DEPENDENCY,
    RetrievalEngineBuilder, SPARSE_DEPENDENCY,
};
pub use pipeline::RetrievalEngine;
pub use request::RetrieveRequest;
