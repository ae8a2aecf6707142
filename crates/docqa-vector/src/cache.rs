//! In-memory embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! Fine, coarse and positional chunks frequently share identical text, and a
//! re-initialization over the same document repeats every chunk. The cache is
//! consulted before calling the embedder and written through on misses.

use std::collections::HashMap;

pub fn content_hash(text: &str) -> String { blake3::hash(text.as_bytes()).to_hex().to_string() }

#[derive(Debug, Clone, Default)]
pub struct EmbeddingCache {
    embedder_id: String,
    entries: HashMap<String, Vec<f32>>,
}

impl EmbeddingCache {
    pub fn new() -> Self { Self::default() }

    /// Drops every entry when `embedder_id` differs from the one the cache was filled with.
    pub fn bind(&mut self, embedder_id: &str) {
        if self.embedder_id != embedder_id {
            self.entries.clear();
            self.embedder_id = embedder_id.to_string();
        }
    }

    pub fn get(&self, hash: &str) -> Option<&Vec<f32>> { self.entries.get(hash) }

    pub fn contains(&self, hash: &str) -> bool { self.entries.contains_key(hash) }

    pub fn put(&mut self, hash: String, vector: Vec<f32>) { self.entries.insert(hash, vector); }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebinding_to_another_embedder_clears_entries() {
        let mut cache = EmbeddingCache::new();
        cache.bind("a");
        cache.put(content_hash("x"), vec![1.0]);
        cache.bind("a");
        assert_eq!(cache.len(), 1);
        cache.bind("b");
        assert!(cache.is_empty());
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        assert_eq!(content_hash("gpu"), content_hash("gpu"));
        assert_ne!(content_hash("gpu"), content_hash("gpus"));
    }
}
