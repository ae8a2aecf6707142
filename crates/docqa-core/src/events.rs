//! Structured retrieval events.
//!
//! The library never writes to the console. Every milestone is logged through
//! `tracing` and, when an [`EventSink`] is installed, also delivered as a
//! [`RetrievalEvent`] so callers can drive their own presentation or metrics.

use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalEvent {
    /// Chunking finished; counts are per family.
    Chunked { fine: usize, coarse: usize, positional: usize },
    /// Semantic index built; `excluded` chunks had no usable embedding.
    SemanticIndexBuilt { embedded: usize, excluded: usize },
    /// Semantic capability disabled or lost; retrieval is lexical-only.
    LexicalOnly { reason: String },
    /// A query was answered from retrieved chunks.
    Sufficient { context_chars: usize },
    /// A query fell back to the full document.
    Fallback { retrieved_chars: usize, min_chars: usize },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: RetrievalEvent);
}

/// Sink that stores every event, mostly useful in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RetrievalEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RetrievalEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: RetrievalEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
