use crate::error::Result;
use crate::types::{RetrievalResult, SourceKind};

/// External embedding model.
///
/// Implementations return one vector of length `dim()` per input text, in
/// input order. Vectors need not be normalized.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g., `bert:all-minilm-l6-v2:d384`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// A built, read-only index over a chunk set.
pub trait ChunkIndex: Send + Sync {
    fn kind(&self) -> SourceKind;
    fn search(&self, query: &str, k: usize) -> Result<RetrievalResult>;
}

/// Turns a query into a context string for the answering collaborator.
pub trait ContextRetriever: Send + Sync {
    fn retrieve(&self, query: &str) -> Result<String>;
}

/// The answering collaborator (an LLM call in practice).
pub trait Answerer: Send + Sync {
    fn answer(&self, query: &str, context: &str) -> anyhow::Result<String>;
}
