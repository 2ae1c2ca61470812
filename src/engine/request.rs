use serde::{Deserialize, Serialize};

/// A single `retrieve` call.
///
/// `top_k` and `token_budget` fall back to the engine's configured
/// `final_top_k` / `token_budget` when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveRequest {
    pub namespace: String,
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default = "default_rerank_enabled")]
    pub rerank_enabled: bool,
    #[serde(default)]
    pub token_budget: Option<usize>,
}

fn default_rerank_enabled() -> bool {
    true
}

impl RetrieveRequest {
    pub fn new(namespace: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            question: question.into(),
            top_k: None,
            rerank_enabled: true,
            token_budget: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_rerank(mut self, enabled: bool) -> Self {
        self.rerank_enabled = enabled;
        self
    }

    pub fn with_token_budget(mut self, token_budget: usize) -> Self {
        self.token_budget = Some(token_budget);
        self
    }
}
