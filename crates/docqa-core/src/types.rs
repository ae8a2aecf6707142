//! Domain types shared by the chunker, both indices and the retriever.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Dense insertion ordinal of a chunk inside its [`ChunkSet`].
pub type ChunkId = usize;

/// The chunking family a chunk was produced by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Fine,
    Coarse,
    Positional,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Fine => "fine",
            Granularity::Coarse => "coarse",
            Granularity::Positional => "positional",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive, 1-based line range of a positional chunk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineSpan {
    pub start_line: usize,
    pub end_line: usize,
}

impl LineSpan {
    pub fn contains(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}

/// A contiguous span of document text stored as a retrieval unit.
///
/// - `id`: position in the owning [`ChunkSet`], also the tie-breaker for equal scores
/// - `source_id`: identifier of the document the text came from
/// - `granularity`: fine, coarse or positional family
/// - `position`: line range, present only for positional chunks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub source_id: String,
    pub granularity: Granularity,
    pub position: Option<LineSpan>,
}

/// Ordered, immutable set of chunks produced from one document.
///
/// Indices hold it behind an `Arc` and resolve [`SearchHit::id`] through it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSet {
    chunks: Vec<Chunk>,
}

impl ChunkSet {
    /// Takes ownership of `chunks`, renumbering ids to their position.
    pub fn new(mut chunks: Vec<Chunk>) -> Self {
        for (i, c) in chunks.iter_mut().enumerate() {
            c.id = i;
        }
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    pub fn of_granularity(&self, granularity: Granularity) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(move |c| c.granularity == granularity)
    }
}

impl Index<ChunkId> for ChunkSet {
    type Output = Chunk;

    fn index(&self, id: ChunkId) -> &Chunk {
        &self.chunks[id]
    }
}

impl<'a> IntoIterator for &'a ChunkSet {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// The minimal surface returned by both indices.
///
/// `id` matches `Chunk::id`. `score` is engine-specific but higher is
/// always better. `source` labels the origin engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

/// Hits in relevance-descending order.
pub type RetrievalResult = Vec<SearchHit>;

/// Sorts hits by descending score, breaking ties by chunk insertion order.
pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, granularity: Granularity) -> Chunk {
        Chunk { id: 99, text: text.to_string(), source_id: "doc".into(), granularity, position: None }
    }

    #[test]
    fn chunk_set_renumbers_ids() {
        let set = ChunkSet::new(vec![chunk("a", Granularity::Fine), chunk("b", Granularity::Coarse)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set[0].id, 0);
        assert_eq!(set[1].id, 1);
        assert_eq!(set.of_granularity(Granularity::Coarse).count(), 1);
    }

    #[test]
    fn sort_hits_breaks_ties_by_insertion_order() {
        let mut hits = vec![
            SearchHit { id: 3, score: 0.5, source: SourceKind::Text },
            SearchHit { id: 1, score: 0.5, source: SourceKind::Text },
            SearchHit { id: 2, score: 0.9, source: SourceKind::Text },
        ];
        sort_hits(&mut hits);
        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn granularity_displays_lowercase() {
        assert_eq!(Granularity::Positional.to_string(), "positional");
        assert!(LineSpan { start_line: 1, end_line: 10 }.contains(10));
    }
}
