//! Multi-granularity chunking.
//!
//! One document yields three chunk families, unioned in this order:
//!
//! - **fine**: small character windows with heavy overlap
//! - **coarse**: larger character windows with lighter overlap
//! - **positional**: fixed line windows tagged with their line range
//!
//! The character families use [`RecursiveSplitter`], which prefers paragraph,
//! then line, then sentence, then word boundaries and only cuts between
//! characters when a single word exceeds the window.

use std::collections::VecDeque;
use tracing::{debug, info};

use crate::config::{ChunkingConfig, WindowConfig};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkSet, Granularity, LineSpan};

/// Boundary priority, highest first. The empty separator splits characters.
static SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunks `document` into the union of all three families.
    ///
    /// Fails with [`Error::EmptyDocument`] when nothing but whitespace remains.
    pub fn chunk(&self, document: &Document) -> Result<ChunkSet> {
        let source_id = document.id.as_str();
        let text = document.text.as_str();
        let mut chunks = Vec::new();

        let families = [
            (Granularity::Fine, self.config.fine),
            (Granularity::Coarse, self.config.coarse),
        ];
        let mut counts = Vec::with_capacity(3);
        for (granularity, window) in families {
            let pieces = RecursiveSplitter::new(window).split(text);
            counts.push((granularity, pieces.len()));
            chunks.extend(pieces.into_iter().map(|text| Chunk {
                id: 0,
                text,
                source_id: source_id.to_string(),
                granularity,
                position: None,
            }));
        }

        let windows = line_windows(text, self.config.line_window, self.config.line_stride);
        counts.push((Granularity::Positional, windows.len()));
        chunks.extend(windows.into_iter().map(|(span, text)| Chunk {
            id: 0,
            text,
            source_id: source_id.to_string(),
            granularity: Granularity::Positional,
            position: Some(span),
        }));

        if chunks.is_empty() {
            return Err(Error::EmptyDocument);
        }
        let set = ChunkSet::new(chunks);
        info!(source = source_id, total = set.len(), ?counts, "document chunked");
        for chunk in set.iter().take(3) {
            debug!(id = chunk.id, granularity = %chunk.granularity, preview = %preview(&chunk.text, 120), "chunk");
        }
        Ok(set)
    }
}

/// Splits text into overlapping windows of at most `size` characters,
/// respecting the boundary priority in [`SEPARATORS`].
#[derive(Debug, Clone, Copy)]
pub struct RecursiveSplitter {
    size: usize,
    overlap: usize,
}

impl RecursiveSplitter {
    pub fn new(window: WindowConfig) -> Self {
        Self { size: window.size.max(1), overlap: window.overlap }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.split_with(text, &SEPARATORS, &mut out);
        out
    }

    fn split_with(&self, text: &str, separators: &'static [&'static str], out: &mut Vec<String>) {
        let (separator, lower) = pick_separator(text, separators);
        let mut fitting: Vec<&str> = Vec::new();
        for piece in split_keeping(text, separator) {
            if char_len(piece) < self.size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                self.merge(&fitting, out);
                fitting.clear();
            }
            if lower.is_empty() {
                push_trimmed(out, piece);
            } else {
                self.split_with(piece, lower, out);
            }
        }
        if !fitting.is_empty() {
            self.merge(&fitting, out);
        }
    }

    /// Greedily packs pieces into windows; each new window starts with the
    /// trailing pieces of the previous one, up to `overlap` characters.
    fn merge(&self, pieces: &[&str], out: &mut Vec<String>) {
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;
        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.size && !window.is_empty() {
                push_trimmed(out, &concat(&window));
                while total > self.overlap || (total + len > self.size && total > 0) {
                    let Some((_, dropped)) = window.pop_front() else { break };
                    total -= dropped;
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        if !window.is_empty() {
            push_trimmed(out, &concat(&window));
        }
    }
}

/// Sliding windows of `window` raw lines advancing by `stride`.
///
/// Line numbers are 1-based and inclusive. Windows that are blank after
/// trimming are dropped.
pub fn line_windows(text: &str, window: usize, stride: usize) -> Vec<(LineSpan, String)> {
    let lines: Vec<&str> = text.split('\n').collect();
    let window = window.max(1);
    let mut out = Vec::new();
    for start in (0..lines.len()).step_by(stride.max(1)) {
        let end = (start + window).min(lines.len());
        let joined = lines[start..end].join("\n");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.push((LineSpan { start_line: start + 1, end_line: end }, trimmed.to_string()));
    }
    out
}

fn pick_separator(text: &str, separators: &'static [&'static str]) -> (&'static str, &'static [&'static str]) {
    for (i, &sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Splits on `separator`, keeping it at the end of the preceding piece.
fn split_keeping<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, sep) in text.match_indices(separator) {
        let end = idx + sep.len();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn concat(window: &VecDeque<(&str, usize)>) -> String {
    window.iter().map(|(piece, _)| *piece).collect()
}

fn push_trimmed(out: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First `max` characters of `text`, on one line.
pub fn preview(text: &str, max: usize) -> String {
    let flat: String = text.chars().take(max).map(|c| if c == '\n' { ' ' } else { c }).collect();
    if text.chars().count() > max { format!("{flat}...") } else { flat }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(WindowConfig { size, overlap })
    }

    #[test]
    fn short_text_is_single_window() {
        assert_eq!(splitter(300, 150).split("  Short text.  "), vec!["Short text."]);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = "alpha beta gamma.\n\ndelta epsilon zeta.";
        let parts = splitter(25, 0).split(text);
        assert_eq!(parts, vec!["alpha beta gamma.", "delta epsilon zeta."]);
    }

    #[test]
    fn falls_back_to_sentences_inside_long_paragraph() {
        let text = "One two three. Four five six. Seven eight nine.";
        let parts = splitter(20, 0).split(text);
        assert_eq!(parts, vec!["One two three.", "Four five six.", "Seven eight nine."]);
    }

    #[test]
    fn never_cuts_words_when_spaces_exist() {
        let text = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod";
        for part in splitter(16, 4).split(text) {
            assert!(part.chars().count() <= 16, "{part:?}");
            for word in part.split(' ') {
                assert!(text.split(' ').any(|w| w == word), "cut word {word:?}");
            }
        }
    }

    #[test]
    fn cuts_characters_only_for_oversized_words() {
        let parts = splitter(4, 0).split("abcdefghij");
        assert_eq!(parts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn consecutive_windows_overlap() {
        let text = "w1 w2 w3 w4 w5 w6 w7 w8 w9 w10 w11 w12";
        let parts = splitter(12, 6).split(text);
        assert!(parts.len() > 1);
        for pair in parts.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(pair[1].split(' ').any(|w| w == last_word), "{pair:?}");
        }
    }

    #[test]
    fn multibyte_text_is_measured_in_chars() {
        let text = "héllo wörld ünïcödé çhäräctérs";
        for part in splitter(12, 0).split(text) {
            assert!(part.chars().count() <= 12);
        }
    }

    #[test]
    fn line_windows_tag_inclusive_ranges() {
        let text = (1..=12).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let spans: Vec<_> = line_windows(&text, 10, 5).into_iter().map(|(s, _)| (s.start_line, s.end_line)).collect();
        assert_eq!(spans, vec![(1, 10), (6, 12), (11, 12)]);
    }

    #[test]
    fn blank_line_windows_are_dropped() {
        let text = "a\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n";
        let windows = line_windows(text, 5, 5);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].1, "a");
    }

    #[test]
    fn whitespace_document_is_empty() {
        let err = Chunker::default().chunk(&Document::new("blank", " \n\t \n")).unwrap_err();
        assert!(matches!(err, Error::EmptyDocument));
    }

    #[test]
    fn families_are_unioned_in_order() {
        let doc = Document::new("doc", "First paragraph.\n\nSecond paragraph.");
        let set = Chunker::default().chunk(&doc).unwrap();
        let kinds: Vec<_> = set.iter().map(|c| c.granularity).collect();
        assert_eq!(kinds, vec![Granularity::Fine, Granularity::Coarse, Granularity::Positional]);
        assert!(set.iter().all(|c| c.source_id == "doc"));
        assert_eq!(set[2].position, Some(LineSpan { start_line: 1, end_line: 3 }));
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\nb", 10), "a b");
        assert_eq!(preview("abcdef", 3), "abc...");
    }
}
