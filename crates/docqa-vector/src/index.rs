use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use docqa_core::error::{Error, Result};
use docqa_core::traits::{ChunkIndex, Embedder};
use docqa_core::types::{sort_hits, ChunkId, ChunkSet, RetrievalResult, SearchHit, SourceKind};

use crate::cache::{content_hash, EmbeddingCache};

/// Cosine-similarity index over chunk embeddings.
///
/// Vectors are stored unit-length; chunks whose embedding failed or came back
/// malformed are left out and reported by [`SemanticIndex::excluded`].
pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    vectors: Vec<(ChunkId, Vec<f32>)>,
    excluded: Vec<ChunkId>,
}

impl SemanticIndex {
    pub fn build(chunks: &ChunkSet, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<Self> {
        let mut cache = EmbeddingCache::new();
        Self::build_with_cache(chunks, embedder, batch_size, &mut cache)
    }

    /// Like [`SemanticIndex::build`], reusing and filling `cache`.
    pub fn build_with_cache(chunks: &ChunkSet, embedder: Arc<dyn Embedder>, batch_size: usize, cache: &mut EmbeddingCache) -> Result<Self> {
        let dim = embedder.dim();
        if dim == 0 {
            return Err(Error::IndexBuild(format!("embedder {} reports dimension 0", embedder.embedder_id())));
        }
        cache.bind(embedder.embedder_id());

        let hashes: Vec<String> = chunks.iter().map(|c| content_hash(&c.text)).collect();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut pending: Vec<(String, String)> = Vec::new();
        for (chunk, hash) in chunks.iter().zip(&hashes) {
            if !cache.contains(hash) && seen.insert(hash.as_str()) {
                pending.push((hash.clone(), chunk.text.clone()));
            }
        }
        info!(chunks = chunks.len(), to_embed = pending.len(), cached = cache.len(), "building semantic index");

        for batch in pending.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|(_, t)| t.clone()).collect();
            for ((hash, _), vector) in batch.iter().zip(embed_batch_resilient(embedder.as_ref(), &texts)) {
                if let Some(v) = vector.and_then(|v| unit(v, dim)) {
                    cache.put(hash.clone(), v);
                }
            }
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        let mut excluded = Vec::new();
        for (chunk, hash) in chunks.iter().zip(&hashes) {
            match cache.get(hash) {
                Some(v) => vectors.push((chunk.id, v.clone())),
                None => {
                    warn!(id = chunk.id, granularity = %chunk.granularity, "no usable embedding, chunk excluded");
                    excluded.push(chunk.id);
                }
            }
        }
        if vectors.is_empty() {
            return Err(Error::IndexBuild(format!("no chunk could be embedded by {}", embedder.embedder_id())));
        }
        info!(embedded = vectors.len(), excluded = excluded.len(), "semantic index built");
        Ok(Self { embedder, vectors, excluded })
    }

    pub fn len(&self) -> usize { self.vectors.len() }

    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }

    pub fn excluded(&self) -> &[ChunkId] { &self.excluded }

    pub fn embedder_id(&self) -> &str { self.embedder.embedder_id() }

    /// Top `k` chunks by cosine similarity to `query`.
    ///
    /// Fails with [`Error::Embedding`] when the query cannot be embedded.
    pub fn search(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let dim = self.embedder.dim();
        let q = self
            .embedder
            .embed_batch(&[query.to_string()])
            .map_err(|e| Error::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .and_then(|v| unit(v, dim))
            .ok_or_else(|| Error::Embedding("query embedding is empty or malformed".to_string()))?;

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .map(|(id, v)| SearchHit { id: *id, score: dot(&q, v), source: SourceKind::Vector })
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        debug!(hits = hits.len(), top = hits.first().map(|h| h.score), "semantic search");
        Ok(hits)
    }
}

impl ChunkIndex for SemanticIndex {
    fn kind(&self) -> SourceKind { SourceKind::Vector }

    fn search(&self, query: &str, k: usize) -> Result<RetrievalResult> { Self::search(self, query, k) }
}

/// Embeds a batch; when the batch call fails or returns the wrong number of
/// rows, retries text by text so one bad input only loses itself.
fn embed_batch_resilient(embedder: &dyn Embedder, texts: &[String]) -> Vec<Option<Vec<f32>>> {
    match embedder.embed_batch(texts) {
        Ok(rows) if rows.len() == texts.len() => return rows.into_iter().map(Some).collect(),
        Ok(rows) => warn!(expected = texts.len(), got = rows.len(), "embedder returned wrong batch size, retrying one by one"),
        Err(e) => warn!(error = %e, size = texts.len(), "batch embedding failed, retrying one by one"),
    }
    texts
        .iter()
        .map(|text| match embedder.embed_batch(std::slice::from_ref(text)) {
            Ok(mut rows) if rows.len() == 1 => rows.pop(),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "chunk embedding failed");
                None
            }
        })
        .collect()
}

/// `v` scaled to unit length, or `None` when it has the wrong dimension,
/// non-finite values or zero norm.
fn unit(mut v: Vec<f32>, dim: usize) -> Option<Vec<f32>> {
    if v.len() != dim || v.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let norm = dot(&v, &v).sqrt();
    if norm <= f32::EPSILON {
        return None;
    }
    for x in &mut v { *x /= norm; }
    Some(v)
}

fn dot(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_rejects_malformed_vectors() {
        assert!(unit(vec![1.0, 2.0], 3).is_none());
        assert!(unit(vec![0.0, 0.0, 0.0], 3).is_none());
        assert!(unit(vec![f32::NAN, 1.0, 0.0], 3).is_none());
        let v = unit(vec![3.0, 4.0], 2).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
    }
}
