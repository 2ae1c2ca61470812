//! Sift CLI: offline hybrid retrieval over a JSONL corpus.
//!
//! ```text
//! sift <corpus.jsonl> <namespace> <question...> [--top-k N] [--budget N] [--no-rerank]
//! ```
//!
//! Configuration comes from `SIFT_*` variables; logging from `RUST_LOG`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

use sift::config::Config;
use sift::corpus::{InMemoryChunkStore, Namespace, load_jsonl};
use sift::embedding::HashingEmbedder;
use sift::engine::{RetrievalEngine, RetrieveRequest};
use sift::rerank::LexicalReranker;
use sift::retrieval::{Bm25SparseIndex, InMemoryDenseIndex};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Offline hybrid retrieval over a JSONL corpus.
///
/// Prints the assembled context for the question as JSON.
#[derive(Debug, Parser)]
#[command(name = "sift", version, about)]
struct Args {
    /// JSONL corpus, one chunk per line
    corpus: PathBuf,

    /// Namespace the corpus is loaded into and queried from
    namespace: String,

    /// Question words
    #[arg(required = true, num_args = 1..)]
    question: Vec<String>,

    /// Candidates entering context assembly (default: SIFT_FINAL_TOP_K)
    #[arg(long)]
    top_k: Option<usize>,

    /// Token budget for the assembled context (default: SIFT_TOKEN_BUDGET)
    #[arg(long = "budget")]
    token_budget: Option<usize>,

    /// Skip the reranking pass
    #[arg(long)]
    no_rerank: bool,
}

impl Args {
    fn request(&self) -> RetrieveRequest {
        let mut request = RetrieveRequest::new(self.namespace.clone(), self.question.join(" "))
            .with_rerank(!self.no_rerank);
        if let Some(top_k) = self.top_k {
            request = request.with_top_k(top_k);
        }
        if let Some(token_budget) = self.token_budget {
            request = request.with_token_budget(token_budget);
        }
        request
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    config.validate()?;

    let namespace = Namespace::new(args.namespace.clone())?;
    let chunks = load_jsonl(&args.corpus, &namespace)?;
    tracing::info!(
        corpus = %args.corpus.display(),
        namespace = %namespace,
        chunks = chunks.len(),
        "Corpus loaded"
    );

    let embedder = HashingEmbedder::default();
    let dense_index = InMemoryDenseIndex::new();
    dense_index.create_namespace(namespace.clone());
    let mut reembedded = 0usize;
    for chunk in &chunks {
        let vector = match &chunk.vector {
            Some(vector) if vector.len() == embedder.dimensions() => vector.clone(),
            _ => {
                reembedded += 1;
                embedder.embed_text(&chunk.text)
            }
        };
        dense_index.upsert(&namespace, chunk.chunk_id.clone(), vector);
    }
    if reembedded > 0 {
        tracing::debug!(
            reembedded,
            dimensions = embedder.dimensions(),
            "Embedded chunks without a compatible precomputed vector"
        );
    }

    let sparse_index = Bm25SparseIndex::from_chunks(&chunks);
    sparse_index.create_namespace(namespace.clone());
    let store = InMemoryChunkStore::from_chunks(chunks);
    store.create_namespace(namespace.clone());

    let engine = RetrievalEngine::builder()
        .config(config)
        .chunk_store(Arc::new(store))
        .embedding_provider(Arc::new(embedder))
        .dense_index(Arc::new(dense_index))
        .sparse_index(Arc::new(sparse_index))
        .reranker(Arc::new(LexicalReranker::new()))
        .build()?;

    let request = args.request();

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let result = engine.retrieve_with_cancellation(&request, cancel).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    tracing::debug!(stats = ?engine.cache_stats(), "Embedding cache");
    Ok(())
}
