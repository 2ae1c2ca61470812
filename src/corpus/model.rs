use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// Longest accepted namespace, in bytes.
pub const MAX_NAMESPACE_LEN: usize = 128;

/// Tenant/project isolation unit. Every read is scoped by one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validates and wraps a namespace string.
    ///
    /// Rejects empty strings, strings longer than [`MAX_NAMESPACE_LEN`] bytes, and
    /// strings containing whitespace or control characters. No trimming or case
    /// folding is applied: `"Acme"` and `"acme"` are different tenants.
    pub fn new(value: impl Into<String>) -> Result<Self, RetrievalError> {
        let value = value.into();

        let reason = if value.is_empty() {
            Some("namespace cannot be empty")
        } else if value.len() > MAX_NAMESPACE_LEN {
            Some("namespace exceeds 128 bytes")
        } else if value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            Some("namespace cannot contain whitespace or control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(RetrievalError::InvalidNamespace { value, reason }),
            None => Ok(Self(value)),
        }
    }

    /// Returns the namespace as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Namespace {
    type Error = RetrievalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chunk identifier, unique within a namespace.
///
/// Ordered lexicographically; the ordering is the final tie-break in fusion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Wraps a chunk id.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChunkId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChunkId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wraps a document id.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Page/section position of a chunk inside its document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// 1-based page number, when the source format has pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Section heading or path, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl Locator {
    /// Locator pointing at a page.
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            section: None,
        }
    }

    /// Locator pointing at a section.
    pub fn section(section: impl Into<String>) -> Self {
        Self {
            page: None,
            section: Some(section.into()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.page, &self.section) {
            (Some(page), Some(section)) => write!(f, "p. {page}, {section}"),
            (Some(page), None) => write!(f, "p. {page}"),
            (None, Some(section)) => f.write_str(section),
            (None, None) => f.write_str("-"),
        }
    }
}

/// Immutable unit of retrievable text, produced by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Owning namespace.
    pub namespace: Namespace,
    /// Unique id within the namespace.
    pub chunk_id: ChunkId,
    /// Source document.
    pub document_id: DocumentId,
    /// Position of the chunk within its document (0-based).
    pub ordinal: u32,
    /// Raw chunk text.
    pub text: String,
    /// Token cost of `text`, as counted by the ingestion tokenizer.
    pub token_count: usize,
    /// Page/section locator used for citations.
    #[serde(default)]
    pub locator: Locator,
    /// Precomputed dense vector, if ingestion produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl Chunk {
    /// Creates a chunk without locator or vector.
    pub fn new(
        namespace: Namespace,
        chunk_id: impl Into<ChunkId>,
        document_id: impl Into<DocumentId>,
        ordinal: u32,
        text: impl Into<String>,
        token_count: usize,
    ) -> Self {
        Self {
            namespace,
            chunk_id: chunk_id.into(),
            document_id: document_id.into(),
            ordinal,
            text: text.into(),
            token_count,
            locator: Locator::default(),
            vector: None,
        }
    }

    /// Sets the locator.
    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }

    /// Sets the precomputed vector.
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }
}
