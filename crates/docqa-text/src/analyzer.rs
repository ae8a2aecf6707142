use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer, Token, TokenFilter, TokenStream, Tokenizer};

/// Name under which the analyzer is registered on the index.
pub const TOKENIZER_NAME: &str = "docqa_text";

const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having","i","my","me","we","our","you","your",
];

/// Lowercasing, stop-word removing, plural folding tokenizer shared by
/// indexing and querying.
#[derive(Clone)]
pub struct Analyzer {
	inner: TextAnalyzer,
}

impl Analyzer {
	pub fn new() -> Self {
		let inner = TextAnalyzer::builder(SimpleTokenizer::default())
			.filter(RemoveLongFilter::limit(40))
			.filter(LowerCaser)
			.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
			.filter(PluralFolder)
			.build();
		Self { inner }
	}

	/// The tantivy pipeline, for registering on an index.
	pub fn text_analyzer(&self) -> TextAnalyzer { self.inner.clone() }

	/// Normalized terms of `text`, in order, duplicates kept.
	pub fn terms(&self, text: &str) -> Vec<String> {
		let mut analyzer = self.inner.clone();
		let mut stream = analyzer.token_stream(text);
		let mut terms = Vec::new();
		while stream.advance() {
			terms.push(stream.token().text.clone());
		}
		terms
	}
}

impl Default for Analyzer {
	fn default() -> Self { Self::new() }
}

/// Light plural folding so `gpu` matches `gpus` and `query` matches `queries`.
/// Applied identically to documents and queries, so over-folding is harmless.
pub fn fold_plural(term: &str) -> String {
	if term.len() > 4 && term.ends_with("ies") {
		return format!("{}y", &term[..term.len() - 3]);
	}
	if term.len() > 3 && term.ends_with('s') && !term.ends_with("ss") {
		return term[..term.len() - 1].to_string();
	}
	term.to_string()
}

/// Token filter applying [`fold_plural`].
#[derive(Clone)]
pub struct PluralFolder;

impl TokenFilter for PluralFolder {
	type Tokenizer<T: Tokenizer> = PluralFolderFilter<T>;

	fn transform<T: Tokenizer>(self, tokenizer: T) -> Self::Tokenizer<T> { PluralFolderFilter { tokenizer } }
}

#[derive(Clone)]
pub struct PluralFolderFilter<T> {
	tokenizer: T,
}

impl<T: Tokenizer> Tokenizer for PluralFolderFilter<T> {
	type TokenStream<'a> = PluralFolderTokenStream<T::TokenStream<'a>>;

	fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
		PluralFolderTokenStream { tail: self.tokenizer.token_stream(text) }
	}
}

pub struct PluralFolderTokenStream<S> {
	tail: S,
}

impl<S: TokenStream> TokenStream for PluralFolderTokenStream<S> {
	fn advance(&mut self) -> bool {
		if !self.tail.advance() {
			return false;
		}
		let token = self.tail.token_mut();
		token.text = fold_plural(&token.text);
		true
	}

	fn token(&self) -> &Token { self.tail.token() }

	fn token_mut(&mut self) -> &mut Token { self.tail.token_mut() }
}
