//! docqa-text
//!
//! Keyword retrieval over a chunk set: an in-RAM tantivy index, scored with
//! BM25, whose text field is tokenized by [`Analyzer`]. The index is immutable
//! once built.

pub mod analyzer;
pub mod index;

pub use analyzer::Analyzer;
pub use index::LexicalIndex;
