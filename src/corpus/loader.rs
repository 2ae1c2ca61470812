//! JSONL corpus loading.
//!
//! One chunk per line:
//!
//! ```json
//! {"chunk_id":"guide-3","document_id":"guide.pdf","ordinal":3,"text":"...","page":2}
//! ```
//!
//! `token_count` is optional; when absent it is estimated from whitespace-separated words.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::model::{Chunk, ChunkId, DocumentId, Locator, Namespace};

/// Errors raised while loading a corpus file.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read corpus '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid chunk record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ChunkRecord {
    chunk_id: String,
    document_id: String,
    ordinal: u32,
    text: String,
    #[serde(default)]
    token_count: Option<usize>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

impl ChunkRecord {
    fn into_chunk(self, namespace: &Namespace) -> Chunk {
        let token_count = self
            .token_count
            .unwrap_or_else(|| estimate_tokens(&self.text));

        Chunk {
            namespace: namespace.clone(),
            chunk_id: ChunkId::new(self.chunk_id),
            document_id: DocumentId::new(self.document_id),
            ordinal: self.ordinal,
            text: self.text,
            token_count,
            locator: Locator {
                page: self.page,
                section: self.section,
            },
            vector: self.vector,
        }
    }
}

/// Rough token estimate used when ingestion did not record a count.
pub fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Parses chunk records from a reader, assigning them to `namespace`.
///
/// Blank lines are skipped.
pub fn read_jsonl<R: BufRead>(reader: R, namespace: &Namespace) -> Result<Vec<Chunk>, CorpusError> {
    let mut chunks = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| CorpusError::Io {
            path: PathBuf::from("<reader>"),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let record: ChunkRecord =
            serde_json::from_str(&line).map_err(|source| CorpusError::Parse {
                line: idx + 1,
                source,
            })?;
        chunks.push(record.into_chunk(namespace));
    }

    Ok(chunks)
}

/// Loads a JSONL corpus file into chunks for `namespace`.
pub fn load_jsonl(path: &Path, namespace: &Namespace) -> Result<Vec<Chunk>, CorpusError> {
    let file = std::fs::File::open(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    read_jsonl(std::io::BufReader::new(file), namespace).map_err(|e| match e {
        CorpusError::Io { source, .. } => CorpusError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}
