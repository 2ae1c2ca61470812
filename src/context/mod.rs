//! Context assembly: deduplicated, budgeted, citation-bearing blocks.

pub mod assembler;
pub mod resolver;
pub mod types;


pub use assembler::{ContextAssembler, DEFAULT_DEDUP_ADJACENCY};
pub use resolver::ChunkResolver;
pub use types::{Citation, ContextBlock, Degradation, RetrievalResult};
