use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use tracing::{debug, info, instrument, warn};

use super::builder::RetrievalEngineBuilder;
use super::request::RetrieveRequest;
use crate::config::Config;
use crate::context::{ContextAssembler, Degradation, RetrievalResult};
use crate::corpus::{Chunk, ChunkId, Namespace};
use crate::embedding::{CacheStats, EmbeddingCache, EmbeddingError};
use crate::error::RetrievalError;
use crate::fusion::HybridMerger;
use crate::rerank::RerankerGate;
use crate::resilience::CircuitState;
use crate::retrieval::{CandidateScore, DenseRetriever, RetrieverError, SparseRetriever};

/// Why the dense side of a query produced no candidates.
#[derive(Debug)]
enum DenseFailure {
    Embedding(EmbeddingError),
    Search(RetrieverError),
}

impl DenseFailure {
    fn missing_namespace(&self) -> Option<&str> {
        match self {
            DenseFailure::Search(err) => missing_namespace(err),
            DenseFailure::Embedding(_) => None,
        }
    }
}

impl fmt::Display for DenseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenseFailure::Embedding(err) => write!(f, "query embedding failed: {err}"),
            DenseFailure::Search(err) => write!(f, "dense search failed: {err}"),
        }
    }
}

fn missing_namespace(err: &RetrieverError) -> Option<&str> {
    match err {
        RetrieverError::NamespaceNotFound { namespace } => Some(namespace),
        _ => None,
    }
}

/// Hybrid retrieval and context assembly for one process.
///
/// ```text
/// question ─▶ embed (cached) ─▶ dense ──┐
///          └────────────────▶ sparse ───┴▶ fuse ─▶ resolve ─▶ rerank? ─▶ assemble
/// ```
///
/// Dense and sparse run concurrently inside the query's own task; nothing is
/// spawned, so dropping the `retrieve` future cancels every in-flight call.
pub struct RetrievalEngine {
    config: Config,
    embeddings: EmbeddingCache,
    dense: DenseRetriever,
    sparse: SparseRetriever,
    merger: HybridMerger,
    reranker: Option<RerankerGate>,
    assembler: ContextAssembler,
}

impl fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("config", &self.config)
            .field("embeddings", &self.embeddings)
            .field("reranker", &self.reranker.is_some())
            .finish_non_exhaustive()
    }
}

impl RetrievalEngine {
    pub fn builder() -> RetrievalEngineBuilder {
        RetrievalEngineBuilder::new()
    }

    pub(super) fn from_parts(
        config: Config,
        embeddings: EmbeddingCache,
        dense: DenseRetriever,
        sparse: SparseRetriever,
        merger: HybridMerger,
        reranker: Option<RerankerGate>,
        assembler: ContextAssembler,
    ) -> Self {
        Self {
            config,
            embeddings,
            dense,
            sparse,
            merger,
            reranker,
            assembler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn embedding_cache(&self) -> &EmbeddingCache {
        &self.embeddings
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.embeddings.stats()
    }

    /// Breaker state per dependency, reranker last when configured.
    pub fn breaker_states(&self) -> Vec<(&str, CircuitState)> {
        let mut states = vec![
            self.embeddings.resilience().breaker(),
            self.dense.resilience().breaker(),
            self.sparse.resilience().breaker(),
            self.assembler.resolver().resilience().breaker(),
        ];
        if let Some(gate) = &self.reranker {
            states.push(gate.resilience().breaker());
        }
        states
            .into_iter()
            .map(|breaker| (breaker.name(), breaker.state()))
            .collect()
    }

    /// Retrieves budgeted, cited context for `question` within `namespace`.
    ///
    /// `top_k` caps the candidates entering context assembly. A result with no
    /// blocks is a success; the caller decides whether "no context" is answerable.
    pub async fn retrieve(
        &self,
        namespace: &str,
        question: &str,
        top_k: usize,
        rerank_enabled: bool,
        token_budget: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        let namespace = Namespace::new(namespace)?;
        self.run(&namespace, question, top_k, rerank_enabled, token_budget)
            .await
    }

    /// [`retrieve`](Self::retrieve) with configured defaults for unset fields.
    pub async fn retrieve_request(
        &self,
        request: &RetrieveRequest,
    ) -> Result<RetrievalResult, RetrievalError> {
        self.retrieve(
            &request.namespace,
            &request.question,
            request.top_k.unwrap_or(self.config.final_top_k),
            request.rerank_enabled,
            request.token_budget.unwrap_or(self.config.token_budget),
        )
        .await
    }

    /// Runs the request until it completes or `cancel` resolves, whichever is first.
    ///
    /// On cancellation every in-flight provider call is dropped and
    /// [`RetrievalError::Cancelled`] is returned.
    pub async fn retrieve_with_cancellation<C>(
        &self,
        request: &RetrieveRequest,
        cancel: C,
    ) -> Result<RetrievalResult, RetrievalError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                info!(namespace = %request.namespace, "Query cancelled by caller");
                Err(RetrievalError::Cancelled)
            }
            result = self.retrieve_request(request) => result,
        }
    }

    #[instrument(
        skip_all,
        fields(
            namespace = %namespace,
            question_len = question.len(),
            top_k = top_k,
            rerank_enabled = rerank_enabled,
            token_budget = token_budget
        )
    )]
    async fn run(
        &self,
        namespace: &Namespace,
        question: &str,
        top_k: usize,
        rerank_enabled: bool,
        token_budget: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        if question.trim().is_empty() {
            return Err(RetrievalError::InvalidRequest {
                reason: "question cannot be empty".to_string(),
            });
        }
        if top_k == 0 {
            return Err(RetrievalError::InvalidRequest {
                reason: "top_k must be at least 1".to_string(),
            });
        }

        let top_n = self.config.retriever_top_n;
        let (dense, sparse) = tokio::join!(
            self.dense_search(namespace, question, top_n),
            self.sparse.search(namespace, question, top_n),
        );

        let unknown = dense
            .as_ref()
            .err()
            .and_then(DenseFailure::missing_namespace)
            .or_else(|| sparse.as_ref().err().and_then(missing_namespace));
        if let Some(unknown) = unknown {
            warn!(namespace = %unknown, "Namespace not found");
            return Err(RetrievalError::NamespaceNotFound {
                namespace: unknown.to_string(),
            });
        }

        let mut degradations = Vec::new();
        let (dense, sparse) = match (dense, sparse) {
            (Ok(dense), Ok(sparse)) => (dense, sparse),
            (Ok(dense), Err(err)) => {
                warn!(error = %err, "Sparse retrieval unavailable, ranking on dense only");
                degradations.push(Degradation::SparseUnavailable);
                (dense, Vec::new())
            }
            (Err(err), Ok(sparse)) => {
                warn!(error = %err, "Dense retrieval unavailable, ranking on sparse only");
                degradations.push(Degradation::DenseUnavailable);
                (Vec::new(), sparse)
            }
            (Err(dense_err), Err(sparse_err)) => {
                warn!(dense = %dense_err, sparse = %sparse_err, "Both retrievers unavailable");
                return Err(match dense_err {
                    DenseFailure::Embedding(err) => RetrievalError::EmbeddingUnavailable(err),
                    DenseFailure::Search(err) => RetrievalError::RetrievalUnavailable {
                        dense: err.to_string(),
                        sparse: sparse_err.to_string(),
                    },
                });
            }
        };

        let mut fused = self.merger.merge(&dense, &sparse);
        if fused.is_empty() {
            debug!("No candidates from either retriever");
            return Ok(with_degradations(
                RetrievalResult::empty(namespace.clone(), token_budget),
                degradations,
            ));
        }

        let ids: Vec<ChunkId> = fused.iter().map(|c| c.chunk_id.clone()).collect();
        let chunks = self.assembler.resolver().resolve(namespace, &ids).await?;
        fused.retain(|c| chunks.contains_key(&c.chunk_id));

        let mut ranked = if rerank_enabled {
            self.rerank(question, fused, &chunks, &mut degradations).await
        } else {
            fused
        };
        ranked.truncate(top_k);

        let result = with_degradations(
            self.assembler
                .assemble_resolved(namespace, &ranked, &chunks, token_budget),
            degradations,
        );

        info!(
            query_id = %result.query_id,
            blocks = result.blocks.len(),
            total_tokens = result.total_tokens,
            degraded = result.is_degraded(),
            "Retrieval complete"
        );
        Ok(result)
    }

    async fn dense_search(
        &self,
        namespace: &Namespace,
        question: &str,
        top_n: usize,
    ) -> Result<Vec<CandidateScore>, DenseFailure> {
        let vector = self
            .embeddings
            .get_or_compute(question, &self.config.embedding_model)
            .await
            .map_err(DenseFailure::Embedding)?;

        self.dense
            .search(namespace, &vector, top_n)
            .await
            .map_err(DenseFailure::Search)
    }

    async fn rerank(
        &self,
        question: &str,
        fused: Vec<CandidateScore>,
        chunks: &HashMap<ChunkId, Chunk>,
        degradations: &mut Vec<Degradation>,
    ) -> Vec<CandidateScore> {
        let Some(gate) = &self.reranker else {
            debug!("Rerank requested but no reranker configured");
            degradations.push(Degradation::RerankerUnavailable);
            return fused;
        };

        let outcome = gate.rerank(question, fused, chunks).await;
        if let Some(degradation) = outcome.degradation {
            degradations.push(degradation);
        }
        outcome.candidates
    }
}

fn with_degradations(
    mut result: RetrievalResult,
    degradations: Vec<Degradation>,
) -> RetrievalResult {
    result.degradations = degradations;
    result
}
