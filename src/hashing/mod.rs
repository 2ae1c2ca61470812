//! BLAKE3 content addressing.
//!
//! Embedding cache keys are the full 32-byte digest of `(model_id, normalized text)`.
//! Each field is length-prefixed so that no two distinct pairs hash the same input
//! bytes (`("ab", "c")` vs `("a", "bc")`).

use blake3::Hasher;

/// Key of an embedding cache entry.
pub type EmbeddingKey = [u8; 32];

/// Computes the cache key for an already-normalized text under a model id.
#[inline]
pub fn embedding_key(normalized_text: &str, model_id: &str) -> EmbeddingKey {
    let mut hasher = Hasher::new();
    hasher.update(&(model_id.len() as u64).to_le_bytes());
    hasher.update(model_id.as_bytes());
    hasher.update(&(normalized_text.len() as u64).to_le_bytes());
    hasher.update(normalized_text.as_bytes());
    *hasher.finalize().as_bytes()
}

/// First 8 bytes of the BLAKE3 digest, little-endian.
///
/// Collisions are tolerable only where a collision degrades quality rather than
/// correctness (feature hashing buckets). Cache keys use the full digest.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Maps a term to one of `buckets` feature-hashing slots.
#[inline]
pub fn term_bucket(term: &str, buckets: usize) -> usize {
    if buckets == 0 {
        return 0;
    }
    (hash_to_u64(term.as_bytes()) % buckets as u64) as usize
}

/// Short hex rendering of a key for logs.
pub fn key_prefix(key: &EmbeddingKey) -> String {
    key[..6].iter().map(|b| format!("{b:02x}")).collect()
}
