use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, FAST, STORED};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info};

use docqa_core::error::{Error, Result};
use docqa_core::traits::ChunkIndex;
use docqa_core::types::{sort_hits, ChunkSet, RetrievalResult, SearchHit, SourceKind};

use crate::analyzer::{Analyzer, TOKENIZER_NAME};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

fn build_schema() -> (Schema, Field, Field) {
	let mut schema_builder = Schema::builder();
	let id_field = schema_builder.add_u64_field("chunk_id", STORED | FAST);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_field = schema_builder.add_text_field("text", TextOptions::default().set_indexing_options(text_field_indexing));
	(schema_builder.build(), id_field, text_field)
}

/// In-RAM tantivy index over chunk text, scored with BM25.
///
/// Query terms are OR-ed, so each additional matched term and each additional
/// occurrence of a matched term raises a chunk's score at equal length. Equal
/// scores are ordered by chunk insertion order.
pub struct LexicalIndex {
	index: Index,
	reader: IndexReader,
	analyzer: Analyzer,
	id_field: Field,
	text_field: Field,
	chunk_count: usize,
}

impl LexicalIndex {
	pub fn build(chunks: &ChunkSet) -> Result<Self> {
		let build_err = |e: tantivy::TantivyError| Error::IndexBuild(format!("lexical index: {e}"));
		let (schema, id_field, text_field) = build_schema();
		let index = Index::create_in_ram(schema);
		let analyzer = Analyzer::new();
		index.tokenizers().register(TOKENIZER_NAME, analyzer.text_analyzer());

		let mut index_writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES).map_err(build_err)?;
		for chunk in chunks {
			index_writer.add_document(doc!(id_field => chunk.id as u64, text_field => chunk.text.as_str())).map_err(build_err)?;
		}
		index_writer.commit().map_err(build_err)?;

		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(build_err)?;
		info!(chunks = chunks.len(), "lexical index built");
		Ok(Self { index, reader, analyzer, id_field, text_field, chunk_count: chunks.len() })
	}

	pub fn len(&self) -> usize { self.chunk_count }

	pub fn is_empty(&self) -> bool { self.chunk_count == 0 }

	/// Number of chunks containing the (already normalized) term.
	pub fn document_frequency(&self, term: &str) -> Result<usize> {
		let term = Term::from_field_text(self.text_field, term);
		let df = self.reader.searcher().doc_freq(&term).map_err(|e| Error::Search(e.to_string()))?;
		Ok(df as usize)
	}

	/// Top `k` chunks sharing at least one term with `query`.
	pub fn search(&self, query: &str, k: usize) -> Result<RetrievalResult> {
		if k == 0 || self.analyzer.terms(query).is_empty() {
			return Ok(Vec::new());
		}
		let search_err = |e: tantivy::TantivyError| Error::Search(e.to_string());
		// Operators and field prefixes are query syntax; only words are searched.
		let words: String = query.to_lowercase().chars().map(|c| if c.is_alphanumeric() { c } else { ' ' }).collect();
		let query_parser = QueryParser::for_index(&self.index, vec![self.text_field]);
		let parsed = query_parser.parse_query(&words).map_err(|e| Error::Search(e.to_string()))?;

		let searcher = self.reader.searcher();
		// Every match is collected so ties at the cut-off resolve by chunk id.
		let top_docs = searcher.search(&parsed, &TopDocs::with_limit(self.chunk_count.max(1))).map_err(search_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(search_err)?;
			let Some(id) = doc.get_first(self.id_field).and_then(|v| v.as_u64()) else { continue };
			if score > 0.0 {
				hits.push(SearchHit { id: id as usize, score, source: SourceKind::Text });
			}
		}
		sort_hits(&mut hits);
		hits.truncate(k);
		debug!(query = %words.trim(), hits = hits.len(), "lexical search");
		Ok(hits)
	}
}

impl ChunkIndex for LexicalIndex {
	fn kind(&self) -> SourceKind { SourceKind::Text }

	fn search(&self, query: &str, k: usize) -> Result<RetrievalResult> { Self::search(self, query, k) }
}

#[cfg(test)]
mod tests {
	use super::*;
	use docqa_core::types::{Chunk, Granularity};

	fn set(texts: &[&str]) -> ChunkSet {
		ChunkSet::new(
			texts
				.iter()
				.map(|t| Chunk { id: 0, text: t.to_string(), source_id: "doc".into(), granularity: Granularity::Fine, position: None })
				.collect(),
		)
	}

	fn index(texts: &[&str]) -> LexicalIndex { LexicalIndex::build(&set(texts)).unwrap() }

	fn ids(hits: &[SearchHit]) -> Vec<usize> { hits.iter().map(|h| h.id).collect() }

	#[test]
	fn singular_query_matches_plural_text() {
		let index = index(&["installing drivers", "configuring multiple GPUs", "billing"]);
		let hits = index.search("GPU", 5).unwrap();
		assert_eq!(ids(&hits), vec![1]);
	}

	#[test]
	fn case_insensitive() {
		let index = index(&["Rust Programming Language"]);
		for q in ["rust", "RUST", "RuSt"] { assert_eq!(index.search(q, 1).unwrap().len(), 1, "{q}"); }
	}

	#[test]
	fn zero_match_chunks_are_excluded() {
		let index = index(&["alpha beta", "gamma delta", "alpha"]);
		let mut found = ids(&index.search("alpha", 10).unwrap());
		found.sort_unstable();
		assert_eq!(found, vec![0, 2]);
	}

	#[test]
	fn more_distinct_terms_rank_higher() {
		let index = index(&["restart worker", "restart worker node", "restart"]);
		let hits = index.search("restart worker node", 3).unwrap();
		assert_eq!(ids(&hits), vec![1, 0, 2]);
		assert!(hits[0].score > hits[1].score && hits[1].score > hits[2].score);
	}

	#[test]
	fn more_occurrences_rank_higher() {
		let index = index(&["rust programming", "rust rust rust is a language", "python"]);
		let hits = index.search("rust", 3).unwrap();
		assert_eq!(ids(&hits), vec![1, 0]);
	}

	#[test]
	fn ties_follow_insertion_order() {
		let index = index(&["timeout error", "other", "timeout error", "timeout error"]);
		let hits = index.search("timeout", 10).unwrap();
		assert_eq!(ids(&hits), vec![0, 2, 3]);
		assert_eq!(hits[0].score, hits[2].score);
	}

	#[test]
	fn respects_k_and_repeated_query_terms() {
		let index = index(&["log", "log", "log", "log"]);
		assert_eq!(index.search("log log log", 2).unwrap().len(), 2);
		assert_eq!(index.document_frequency("log").unwrap(), 4);
	}

	#[test]
	fn stop_word_query_returns_nothing() {
		let index = index(&["the and of"]);
		assert!(index.search("the of", 5).unwrap().is_empty());
		assert!(index.search("", 5).unwrap().is_empty());
	}

	#[test]
	fn query_syntax_is_treated_as_words() {
		let index = index(&["error code E042 on node", "worker restarted"]);
		let hits = index.search("text:E042 AND (node", 5).unwrap();
		assert_eq!(ids(&hits), vec![0]);
		assert!(index.search("worker OR -restart", 5).unwrap().iter().any(|h| h.id == 1));
	}
}
