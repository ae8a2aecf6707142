use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use docqa_core::chunker::Chunker;
use docqa_core::config::RetrievalSettings;
use docqa_core::document::Document;
use docqa_core::error::{Error, Result};
use docqa_core::events::{EventSink, RetrievalEvent};
use docqa_core::traits::{Answerer, Embedder};
use docqa_core::types::{ChunkSet, Granularity};
use docqa_text::LexicalIndex;
use docqa_vector::{EmbeddingCache, SemanticIndex};

use crate::orchestrator::{Orchestrator, Retrieval};
use crate::retriever::HybridRetriever;

/// An answer paired with the context it was grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub context: String,
}

/// Owns the indexed document and serves queries against it.
///
/// `initialize` chunks the document and builds both indices to completion;
/// until it succeeds every query fails with [`Error::NotInitialized`]. A new
/// `initialize` replaces the previous state entirely, but embeddings of
/// unchanged chunk texts are reused.
pub struct DocumentAgent {
    settings: RetrievalSettings,
    embedder: Option<Arc<dyn Embedder>>,
    sink: Option<Arc<dyn EventSink>>,
    cache: EmbeddingCache,
    ready: Option<Orchestrator>,
}

impl DocumentAgent {
    pub fn new(settings: RetrievalSettings) -> Self {
        Self { settings, embedder: None, sink: None, cache: EmbeddingCache::new(), ready: None }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn settings(&self) -> &RetrievalSettings { &self.settings }

    pub fn is_ready(&self) -> bool { self.ready.is_some() }

    /// Indexes `document`, reporting success; the cause is logged.
    pub fn initialize(&mut self, document: Document) -> bool {
        match self.try_initialize(document) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "initialization failed");
                false
            }
        }
    }

    pub fn try_initialize(&mut self, document: Document) -> Result<()> {
        self.ready = None;
        self.settings.validate()?;
        let start = Instant::now();
        let document = Arc::new(document);

        let chunks = Arc::new(Chunker::new(self.settings.chunking.clone()).chunk(&document)?);
        self.emit(RetrievalEvent::Chunked {
            fine: chunks.of_granularity(Granularity::Fine).count(),
            coarse: chunks.of_granularity(Granularity::Coarse).count(),
            positional: chunks.of_granularity(Granularity::Positional).count(),
        });

        let lexical = LexicalIndex::build(&chunks)?;
        let mut retriever = HybridRetriever::new(chunks.clone(), lexical, self.settings.fusion.clone());
        match self.build_semantic(&chunks) {
            Ok(Some(semantic)) => {
                self.emit(RetrievalEvent::SemanticIndexBuilt { embedded: semantic.len(), excluded: semantic.excluded().len() });
                retriever = retriever.with_semantic(semantic, self.settings.tolerate_embedding_failure);
            }
            Ok(None) => self.emit(RetrievalEvent::LexicalOnly { reason: "embeddings disabled".to_string() }),
            Err(e @ Error::IndexBuild(_)) if self.settings.tolerate_embedding_failure => {
                warn!(error = %e, "semantic index unavailable, continuing lexical-only");
                self.emit(RetrievalEvent::LexicalOnly { reason: e.to_string() });
            }
            Err(e) => return Err(e),
        }

        let mut orchestrator = Orchestrator::new(Box::new(retriever), document.clone(), self.settings.min_context_chars);
        if let Some(sink) = &self.sink {
            orchestrator = orchestrator.with_sink(sink.clone());
        }
        self.ready = Some(orchestrator);
        info!(source = %document.id, chunks = chunks.len(), elapsed_ms = start.elapsed().as_millis() as u64, "document ready");
        Ok(())
    }

    fn build_semantic(&mut self, chunks: &ChunkSet) -> Result<Option<SemanticIndex>> {
        if !self.settings.use_embeddings {
            return Ok(None);
        }
        let Some(embedder) = self.embedder.clone() else {
            return Err(Error::IndexBuild("no embedder configured".to_string()));
        };
        SemanticIndex::build_with_cache(chunks, embedder, self.settings.embed_batch_size, &mut self.cache).map(Some)
    }

    /// Context for `query`, with the outcome of the sufficiency check.
    pub fn retrieve_detailed(&self, query: &str) -> Result<Retrieval> {
        self.ready.as_ref().ok_or(Error::NotInitialized)?.run(query)
    }

    pub fn retrieve(&self, query: &str) -> Result<String> { Ok(self.retrieve_detailed(query)?.context) }

    /// Retrieves context and asks `answerer`. A failing or empty answer is
    /// replaced by an explanation so the caller always has something to show.
    pub fn ask(&self, query: &str, answerer: &dyn Answerer) -> Result<Answer> {
        let context = self.retrieve(query)?;
        let answer = match answerer.answer(query, &context) {
            Ok(a) if !a.trim().is_empty() => a,
            Ok(_) => {
                warn!("answerer returned an empty response");
                "The answering service returned an empty response.".to_string()
            }
            Err(e) => {
                warn!(error = %e, "answerer failed");
                format!("The answering service failed: {e}")
            }
        };
        Ok(Answer { answer, context })
    }

    fn emit(&self, event: RetrievalEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }
}
