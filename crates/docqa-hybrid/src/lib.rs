//! docqa-hybrid
//!
//! Hybrid retrieval over one document: weighted fusion of lexical and
//! semantic hits, near-duplicate suppression, bounded context assembly, the
//! full-document fallback policy and the [`DocumentAgent`] that ties them
//! together.

pub mod agent;
pub mod context;
pub mod dedup;
pub mod fusion;
pub mod orchestrator;
pub mod retriever;

pub use agent::{Answer, DocumentAgent};
pub use context::strip_provenance;
pub use orchestrator::{Orchestrator, Outcome, Retrieval};
pub use retriever::HybridRetriever;
