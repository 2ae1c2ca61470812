//! Shared corpora and engine wiring for integration tests.

use std::sync::Arc;
use std::time::Duration;

use sift::config::Config;
use sift::corpus::{Chunk, InMemoryChunkStore, Locator, Namespace};
use sift::embedding::HashingEmbedder;
use sift::engine::RetrievalEngine;
use sift::rerank::LexicalReranker;
use sift::resilience::RetryConfig;
use sift::retrieval::{Bm25SparseIndex, InMemoryDenseIndex};

pub const ACME: &str = "acme";
pub const GLOBEX: &str = "globex";

pub fn ns(value: &str) -> Namespace {
    Namespace::new(value).expect("valid namespace")
}

/// Config with millisecond backoff so retry paths stay fast.
pub fn fast_config() -> Config {
    Config {
        retry: RetryConfig::default()
            .with_delays(Duration::from_millis(1), Duration::from_millis(4))
            .without_jitter(),
        ..Default::default()
    }
}

/// Builds chunks of one document with consecutive ordinals.
pub struct DocumentBuilder {
    namespace: Namespace,
    document_id: String,
    chunks: Vec<Chunk>,
}

impl DocumentBuilder {
    pub fn new(namespace: &str, document_id: &str) -> Self {
        Self {
            namespace: ns(namespace),
            document_id: document_id.to_string(),
            chunks: Vec::new(),
        }
    }

    pub fn chunk(mut self, text: &str, token_count: usize) -> Self {
        let ordinal = self.chunks.len() as u32;
        let chunk_id = format!("{}-{ordinal}", self.document_id);
        self.chunks.push(
            Chunk::new(
                self.namespace.clone(),
                chunk_id,
                self.document_id.as_str(),
                ordinal,
                text,
                token_count,
            )
            .with_locator(Locator::page(ordinal + 1)),
        );
        self
    }

    pub fn build(self) -> Vec<Chunk> {
        self.chunks
    }
}

/// A small operations handbook for `acme` plus an unrelated `globex` document that
/// shares vocabulary with it.
pub fn handbook() -> Vec<Chunk> {
    let mut chunks = Vec::new();
    chunks.extend(
        DocumentBuilder::new(ACME, "keys")
            .chunk("API keys are issued per project from the admin console.", 12)
            .chunk("To rotate API keys, open the console, select the key and press rotate.", 15)
            .chunk("Rotated keys stay valid for 24 hours so clients can roll over.", 13)
            .build(),
    );
    chunks.extend(
        DocumentBuilder::new(ACME, "billing")
            .chunk("Invoices are generated on the first day of each month.", 11)
            .chunk("Refunds are processed within five business days.", 9)
            .build(),
    );
    chunks.extend(
        DocumentBuilder::new(ACME, "onboarding")
            .chunk("New engineers receive laptop and badge on day one.", 10)
            .build(),
    );
    chunks.extend(
        DocumentBuilder::new(GLOBEX, "secrets")
            .chunk("Globex rotates API keys every night from the vault.", 11)
            .build(),
    );
    chunks
}

/// In-memory adapters over `chunks`, all namespaces included.
pub struct OfflineStack {
    pub store: Arc<InMemoryChunkStore>,
    pub dense: Arc<InMemoryDenseIndex>,
    pub sparse: Arc<Bm25SparseIndex>,
    pub embedder: Arc<HashingEmbedder>,
}

impl OfflineStack {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        let embedder = HashingEmbedder::default();
        let dense = InMemoryDenseIndex::new();
        for chunk in &chunks {
            dense.upsert(
                &chunk.namespace,
                chunk.chunk_id.clone(),
                embedder.embed_text(&chunk.text),
            );
        }
        let sparse = Bm25SparseIndex::from_chunks(&chunks);

        Self {
            store: Arc::new(InMemoryChunkStore::from_chunks(chunks)),
            dense: Arc::new(dense),
            sparse: Arc::new(sparse),
            embedder: Arc::new(embedder),
        }
    }

    pub fn engine(&self, config: Config) -> RetrievalEngine {
        RetrievalEngine::builder()
            .config(config)
            .chunk_store(self.store.clone())
            .embedding_provider(self.embedder.clone())
            .dense_index(self.dense.clone())
            .sparse_index(self.sparse.clone())
            .reranker(Arc::new(LexicalReranker::new()))
            .build()
            .expect("engine builds")
    }
}
