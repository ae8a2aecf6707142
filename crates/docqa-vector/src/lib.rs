//! docqa-vector
//!
//! Embedding-based retrieval: chunk vectors are computed once at build time
//! and searched by cosine similarity. The index is immutable after `build`.

pub mod cache;
pub mod index;

pub use cache::EmbeddingCache;
pub use index::SemanticIndex;
