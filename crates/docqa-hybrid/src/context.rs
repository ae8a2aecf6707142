//! Context assembly and provenance markup.
//!
//! Selected chunks are rendered twice: once annotated with `[CHUNK n - TYPE: x]`
//! and `[LINES a-b]` tags for debug tracing, and once clean for the answering
//! model. Tags never reach the returned context.

use regex::Regex;
use std::sync::LazyLock;

use docqa_core::types::Chunk;

/// Separates chunks inside a context.
pub const CHUNK_DELIMITER: &str = "\n\n---\n\n";

static PROVENANCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[CHUNK \d+ - TYPE: [^\]\n]*\][ \t]*\n?|\[LINES \d+-\d+\][ \t]*\n?").ok());

/// Debug header for a chunk at 1-based `rank`.
pub fn annotate(rank: usize, chunk: &Chunk) -> String {
    let mut out = format!("[CHUNK {rank} - TYPE: {}]\n", chunk.granularity.as_str().to_uppercase());
    if let Some(span) = chunk.position {
        out.push_str(&format!("[LINES {}-{}]\n", span.start_line, span.end_line));
    }
    out.push_str(&chunk.text);
    out
}

/// Removes chunk-type and line-range tags, leaving all other text as is.
pub fn remove_tags(text: &str) -> String {
    match PROVENANCE.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// [`remove_tags`], then trims the result.
pub fn strip_provenance(text: &str) -> String {
    remove_tags(text).trim().to_string()
}

/// A bounded context built from ranked chunks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledContext {
    pub text: String,
    /// The same chunks with provenance headers, for tracing.
    pub annotated: String,
    pub included: usize,
    pub skipped: usize,
}

/// Concatenates chunk texts in the given order while the total stays within
/// `max_chars`. A chunk that would overflow is skipped; later, shorter chunks
/// may still fit.
pub fn assemble<'a>(ranked: impl IntoIterator<Item = &'a Chunk>, max_chars: usize) -> AssembledContext {
    let delimiter_len = CHUNK_DELIMITER.chars().count();
    let mut ctx = AssembledContext::default();
    let mut used = 0usize;
    let mut parts: Vec<String> = Vec::new();
    let mut annotated: Vec<String> = Vec::new();
    for chunk in ranked {
        let clean = strip_provenance(&chunk.text);
        if clean.is_empty() {
            continue;
        }
        let len = clean.chars().count();
        let extra = if parts.is_empty() { len } else { len + delimiter_len };
        if used + extra > max_chars {
            ctx.skipped += 1;
            continue;
        }
        used += extra;
        annotated.push(annotate(parts.len() + 1, chunk));
        parts.push(clean);
    }
    ctx.included = parts.len();
    ctx.text = parts.join(CHUNK_DELIMITER);
    ctx.annotated = annotated.join(CHUNK_DELIMITER);
    ctx
}
