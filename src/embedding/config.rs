use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 10_000;
pub const DEFAULT_CACHE_TTL_S: u64 = 3_600;

/// Text normalization applied before hashing and before calling the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextNormalization {
    /// Hash the text exactly as given.
    None,
    /// Strip leading/trailing whitespace.
    #[default]
    Trim,
    /// Strip surrounding whitespace and lowercase.
    Lowercase,
}

impl TextNormalization {
    pub fn apply(self, text: &str) -> String {
        match self {
            TextNormalization::None => text.to_string(),
            TextNormalization::Trim => text.trim().to_string(),
            TextNormalization::Lowercase => text.trim().to_lowercase(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextNormalization::None => "none",
            TextNormalization::Trim => "trim",
            TextNormalization::Lowercase => "lowercase",
        }
    }
}

impl FromStr for TextNormalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(TextNormalization::None),
            "trim" => Ok(TextNormalization::Trim),
            "lowercase" => Ok(TextNormalization::Lowercase),
            other => Err(format!("unknown normalization '{other}'")),
        }
    }
}

impl fmt::Display for TextNormalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sizing and expiry of the [`EmbeddingCache`](super::EmbeddingCache).
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingCacheConfig {
    /// LRU capacity, in entries.
    pub max_entries: u64,
    /// Time-to-live of each entry since insertion.
    pub ttl: Duration,
    pub normalization: TextNormalization,
}

impl Default for EmbeddingCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_S),
            normalization: TextNormalization::default(),
        }
    }
}

impl EmbeddingCacheConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == 0 {
            return Err("cache max_entries must be at least 1".to_string());
        }
        if self.ttl.is_zero() {
            return Err("cache ttl must be non-zero".to_string());
        }
        Ok(())
    }
}
