//! Near-duplicate suppression across chunk families.
//!
//! Fine, coarse and positional windows cover the same text many times over.
//! Two chunks are duplicates when most word shingles of the smaller one also
//! occur in the larger one, which collapses a fine window nested inside a
//! coarse window as well as two heavily overlapping neighbours.

use std::collections::HashSet;
use tracing::debug;

use docqa_core::types::ChunkSet;

use crate::fusion::ScoredChunk;

const SHINGLE_WORDS: usize = 3;

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

fn shingles(words: &[String], n: usize) -> HashSet<&[String]> {
    words.windows(n).collect()
}

fn containment(a: &[String], b: &[String]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return if a.is_empty() && b.is_empty() { 1.0 } else { 0.0 };
    }
    let n = SHINGLE_WORDS.min(a.len()).min(b.len());
    let (sa, sb) = (shingles(a, n), shingles(b, n));
    let (small, large) = if sa.len() <= sb.len() { (&sa, &sb) } else { (&sb, &sa) };
    small.iter().filter(|s| large.contains(*s)).count() as f32 / small.len() as f32
}

/// Share of the smaller text's word shingles found in the other text, in `[0, 1]`.
///
/// Case-insensitive and whitespace-insensitive; symmetric.
pub fn overlap_ratio(a: &str, b: &str) -> f32 {
    containment(&words(a), &words(b))
}

/// Keeps ranked chunks in order, dropping any whose overlap with an already
/// kept chunk reaches `threshold`. Since input is score-descending, the
/// survivor of each duplicate group is its highest-scored member.
pub fn dedup(ranked: Vec<ScoredChunk>, chunks: &ChunkSet, threshold: f32) -> Vec<ScoredChunk> {
    let mut kept: Vec<(ScoredChunk, Vec<String>)> = Vec::with_capacity(ranked.len());
    let mut dropped = 0usize;
    for candidate in ranked {
        let Some(chunk) = chunks.get(candidate.id) else { continue };
        let w = words(&chunk.text);
        if kept.iter().any(|(_, k)| containment(&w, k) >= threshold) {
            dropped += 1;
            continue;
        }
        kept.push((candidate, w));
    }
    debug!(kept = kept.len(), dropped, "deduplicated candidates");
    kept.into_iter().map(|(c, _)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::{Chunk, Granularity};

    #[test]
    fn nested_text_fully_overlaps() {
        let inner = "restart the worker node";
        let outer = "If jobs hang, restart the worker node and check the logs.";
        assert_eq!(overlap_ratio(inner, outer), 1.0);
        assert_eq!(overlap_ratio(outer, inner), 1.0);
    }

    #[test]
    fn unrelated_text_does_not_overlap() {
        assert_eq!(overlap_ratio("billing runs monthly on the first", "gpu drivers need a reboot"), 0.0);
    }

    #[test]
    fn partial_overlap_is_fractional() {
        let r = overlap_ratio("a b c d e f", "a b c d x y");
        assert!(r > 0.0 && r < 0.9, "{r}");
    }

    #[test]
    fn short_texts_use_shorter_shingles() {
        assert_eq!(overlap_ratio("GPU", "gpu"), 1.0);
        assert_eq!(overlap_ratio("", ""), 1.0);
        assert_eq!(overlap_ratio("", "x"), 0.0);
    }

    #[test]
    fn keeps_highest_ranked_of_each_group() {
        let set = ChunkSet::new(
            ["configure the gpu driver first", "the gpu driver", "billing questions go to finance"]
                .iter()
                .map(|t| Chunk { id: 0, text: t.to_string(), source_id: "d".into(), granularity: Granularity::Fine, position: None })
                .collect(),
        );
        let ranked = vec![
            ScoredChunk { id: 1, score: 0.9, semantic: None, lexical: None },
            ScoredChunk { id: 0, score: 0.8, semantic: None, lexical: None },
            ScoredChunk { id: 2, score: 0.1, semantic: None, lexical: None },
        ];
        let ids: Vec<_> = dedup(ranked, &set, 0.9).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
