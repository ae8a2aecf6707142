//! Weighted fusion of semantic and lexical hit lists.

use std::collections::BTreeMap;

use docqa_core::config::FusionConfig;
use docqa_core::types::{ChunkId, SearchHit};

/// A chunk with its fused score and the normalized per-engine components.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: ChunkId,
    pub score: f32,
    pub semantic: Option<f32>,
    pub lexical: Option<f32>,
}

/// Min-max normalizes scores to `[0, 1]` over the given hits.
///
/// A list whose scores are all equal normalizes to 1.0.
pub fn normalize(hits: &[SearchHit]) -> Vec<(ChunkId, f32)> {
    let (min, max) = hits.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), h| (lo.min(h.score), hi.max(h.score)));
    let range = max - min;
    hits.iter()
        .map(|h| {
            let norm = if range > f32::EPSILON { (h.score - min) / range } else { 1.0 };
            (h.id, norm)
        })
        .collect()
}

/// `combined = w_sem * sem + w_lex * lex`, a chunk missing from one list
/// scoring 0 there. Sorted by combined score, ties by insertion order.
pub fn fuse(semantic: &[SearchHit], lexical: &[SearchHit], config: &FusionConfig) -> Vec<ScoredChunk> {
    let mut merged: BTreeMap<ChunkId, (Option<f32>, Option<f32>)> = BTreeMap::new();
    for (id, s) in normalize(semantic) { merged.entry(id).or_default().0 = Some(s); }
    for (id, l) in normalize(lexical) { merged.entry(id).or_default().1 = Some(l); }

    let mut fused: Vec<ScoredChunk> = merged
        .into_iter()
        .map(|(id, (semantic, lexical))| ScoredChunk {
            id,
            score: config.semantic_weight * semantic.unwrap_or(0.0) + config.lexical_weight * lexical.unwrap_or(0.0),
            semantic,
            lexical,
        })
        .collect();
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then(a.id.cmp(&b.id)));
    fused
}
