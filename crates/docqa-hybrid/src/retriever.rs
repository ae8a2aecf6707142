use std::sync::Arc;
use tracing::{debug, warn};

use docqa_core::chunker::preview;
use docqa_core::config::FusionConfig;
use docqa_core::error::{Error, Result};
use docqa_core::traits::{ChunkIndex, ContextRetriever};
use docqa_core::types::{ChunkSet, RetrievalResult};

use crate::context::{assemble, AssembledContext};
use crate::dedup::dedup;
use crate::fusion::{fuse, ScoredChunk};

/// Queries the lexical index and, when present, the semantic index, fuses
/// the two hit lists, drops near-duplicates and assembles a bounded context.
pub struct HybridRetriever {
    chunks: Arc<ChunkSet>,
    lexical: Box<dyn ChunkIndex>,
    semantic: Option<Box<dyn ChunkIndex>>,
    fusion: FusionConfig,
    tolerate_embedding_failure: bool,
}

impl HybridRetriever {
    /// A lexical-only retriever.
    pub fn new(chunks: Arc<ChunkSet>, lexical: impl ChunkIndex + 'static, fusion: FusionConfig) -> Self {
        Self { chunks, lexical: Box::new(lexical), semantic: None, fusion, tolerate_embedding_failure: true }
    }

    /// Adds a semantic index. With `tolerate_embedding_failure`, a query whose
    /// embedding fails is served lexical-only instead of returning the error.
    pub fn with_semantic(mut self, semantic: impl ChunkIndex + 'static, tolerate_embedding_failure: bool) -> Self {
        self.semantic = Some(Box::new(semantic));
        self.tolerate_embedding_failure = tolerate_embedding_failure;
        self
    }

    pub fn is_semantic(&self) -> bool { self.semantic.is_some() }

    pub fn chunks(&self) -> &ChunkSet { &self.chunks }

    /// Fused, deduplicated candidates in descending combined score.
    pub fn search(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let k = self.fusion.candidates_per_index;
        let semantic = self.semantic_hits(query, k)?;
        let lexical = self.lexical.search(query, k)?;
        let fused = fuse(&semantic, &lexical, &self.fusion);
        for c in fused.iter().take(5) {
            debug!(id = c.id, score = c.score, semantic = ?c.semantic, lexical = ?c.lexical, "candidate");
        }
        Ok(dedup(fused, &self.chunks, self.fusion.dedup_threshold))
    }

    /// Context for `query` plus its annotated rendering and counts.
    pub fn assemble(&self, query: &str) -> Result<AssembledContext> {
        let ranked = self.search(query)?;
        let ctx = assemble(ranked.iter().filter_map(|c| self.chunks.get(c.id)), self.fusion.max_context_chars);
        debug!(included = ctx.included, skipped = ctx.skipped, chars = ctx.text.chars().count(), "context assembled");
        debug!(annotated = %preview(&ctx.annotated, 1000), "annotated context");
        Ok(ctx)
    }

    fn semantic_hits(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let Some(index) = &self.semantic else { return Ok(Vec::new()) };
        match index.search(query, k) {
            Ok(hits) => Ok(hits),
            Err(Error::Embedding(reason)) if self.tolerate_embedding_failure => {
                warn!(%reason, "query embedding failed, serving this query lexical-only");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

impl ContextRetriever for HybridRetriever {
    fn retrieve(&self, query: &str) -> Result<String> { Ok(self.assemble(query)?.text) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::{Chunk, Granularity, SearchHit, SourceKind};
    use docqa_text::LexicalIndex;

    struct Broken;

    impl ChunkIndex for Broken {
        fn kind(&self) -> SourceKind { SourceKind::Vector }
        fn search(&self, _query: &str, _k: usize) -> Result<RetrievalResult> { Err(Error::Embedding("offline".into())) }
    }

    struct Fixed(Vec<SearchHit>);

    impl ChunkIndex for Fixed {
        fn kind(&self) -> SourceKind { SourceKind::Vector }
        fn search(&self, _query: &str, k: usize) -> Result<RetrievalResult> { Ok(self.0.iter().take(k).cloned().collect()) }
    }

    fn chunks(texts: &[&str]) -> Arc<ChunkSet> {
        Arc::new(ChunkSet::new(
            texts
                .iter()
                .map(|t| Chunk { id: 0, text: t.to_string(), source_id: "d".into(), granularity: Granularity::Fine, position: None })
                .collect(),
        ))
    }

    fn lexical(set: &Arc<ChunkSet>) -> HybridRetriever {
        HybridRetriever::new(set.clone(), LexicalIndex::build(set).unwrap(), FusionConfig::default())
    }

    #[test]
    fn lexical_only_finds_keyword() {
        let set = chunks(&["installing drivers", "configuring multiple GPUs", "billing"]);
        assert_eq!(lexical(&set).retrieve("GPU").unwrap(), "configuring multiple GPUs");
    }

    #[test]
    fn tolerated_embedding_failure_falls_back_to_lexical() {
        let set = chunks(&["alpha beta", "gamma"]);
        let r = lexical(&set).with_semantic(Broken, true);
        assert_eq!(r.retrieve("gamma").unwrap(), "gamma");
    }

    #[test]
    fn untolerated_embedding_failure_propagates() {
        let set = chunks(&["alpha beta", "gamma"]);
        let r = lexical(&set).with_semantic(Broken, false);
        assert!(matches!(r.retrieve("gamma"), Err(Error::Embedding(_))));
    }

    #[test]
    fn semantic_only_hits_are_included() {
        let set = chunks(&["reset your password from the login page", "gpu drivers"]);
        let hits = vec![SearchHit { id: 0, score: 0.8, source: SourceKind::Vector }];
        let r = lexical(&set).with_semantic(Fixed(hits), true);
        let ranked = r.search("forgot credentials").unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, 0);
    }

    #[test]
    fn duplicates_collapse_in_context() {
        let set = chunks(&["restart the worker node", "restart the worker node", "restart the worker node now please"]);
        let ctx = lexical(&set).assemble("restart worker").unwrap();
        assert_eq!(ctx.included, 1);
    }
}
