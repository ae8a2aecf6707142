//! Sufficiency policy between retrieval and the full document.
//!
//! Each query moves `Retrieving -> Sufficient | Fallback`. A context that is
//! empty or shorter than `min_context_chars` is replaced by the whole
//! document text, verbatim apart from provenance tags; anything else passes
//! through unchanged. Retriever errors are not
//! an insufficiency signal and propagate.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use docqa_core::chunker::preview;
use docqa_core::document::Document;
use docqa_core::error::Result;
use docqa_core::events::{EventSink, RetrievalEvent};
use docqa_core::traits::ContextRetriever;

use crate::context::remove_tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Sufficient,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    pub outcome: Outcome,
    pub context: String,
    /// Length of what the retriever produced, before any fallback.
    pub retrieved_chars: usize,
}

pub struct Orchestrator {
    retriever: Box<dyn ContextRetriever>,
    document: Arc<Document>,
    min_context_chars: usize,
    sink: Option<Arc<dyn EventSink>>,
}

impl Orchestrator {
    pub fn new(retriever: Box<dyn ContextRetriever>, document: Arc<Document>, min_context_chars: usize) -> Self {
        Self { retriever, document, min_context_chars, sink: None }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn run(&self, query: &str) -> Result<Retrieval> {
        let retrieved = self.retriever.retrieve(query)?;
        let retrieved_chars = retrieved.trim().chars().count();

        let retrieval = if retrieved_chars < self.min_context_chars {
            warn!(retrieved_chars, min = self.min_context_chars, "retrieved context too small, using full document");
            self.emit(RetrievalEvent::Fallback { retrieved_chars, min_chars: self.min_context_chars });
            Retrieval { outcome: Outcome::Fallback, context: remove_tags(&self.document.text), retrieved_chars }
        } else {
            self.emit(RetrievalEvent::Sufficient { context_chars: retrieved_chars });
            Retrieval { outcome: Outcome::Sufficient, context: retrieved, retrieved_chars }
        };
        info!(outcome = ?retrieval.outcome, chars = retrieval.context.chars().count(), preview = %preview(&retrieval.context, 200), "context ready");
        Ok(retrieval)
    }

    fn emit(&self, event: RetrievalEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }
}

impl ContextRetriever for Orchestrator {
    fn retrieve(&self, query: &str) -> Result<String> { Ok(self.run(query)?.context) }
}
