//! Chunked corpus: data model and the chunk store adapter.
//!
//! Chunks are produced by ingestion (out of this crate) and are read-only here.
//! [`ChunkStore`] is the only way the pipeline reads chunk text; every lookup is
//! scoped by [`Namespace`].

pub mod loader;
pub mod memory;
pub mod model;
pub mod store;


pub use loader::{CorpusError, estimate_tokens, load_jsonl, read_jsonl};
pub use memory::InMemoryChunkStore;
pub use model::{Chunk, ChunkId, DocumentId, Locator, MAX_NAMESPACE_LEN, Namespace};
pub use store::ChunkStore;
