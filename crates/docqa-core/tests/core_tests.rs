use std::fs;
use tempfile::TempDir;

use docqa_core::chunker::Chunker;
use docqa_core::config::ChunkingConfig;
use docqa_core::document::{Document, DocumentSource, FileSource};
use docqa_core::error::Error;
use docqa_core::types::Granularity;

fn sample_text() -> String {
    let mut text = String::from("# Troubleshooting\n\n");
    for i in 1..=40 {
        text.push_str(&format!(
            "Item {i}: when the node reports error code E{i:03}, restart the worker and check the logs.\n"
        ));
        if i % 7 == 0 {
            text.push('\n');
        }
    }
    text
}

#[test]
fn chunking_is_deterministic() {
    let doc = Document::new("faq.md", sample_text());
    let chunker = Chunker::new(ChunkingConfig::default());
    let first = chunker.chunk(&doc).expect("chunk");
    let second = chunker.chunk(&doc).expect("chunk");
    assert_eq!(first, second);
}

#[test]
fn every_line_is_covered_by_a_positional_window() {
    let text = sample_text();
    let doc = Document::new("faq.md", text.clone());
    let set = Chunker::default().chunk(&doc).expect("chunk");

    for (i, line) in text.split('\n').enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let covered = set
            .of_granularity(Granularity::Positional)
            .any(|c| c.position.is_some_and(|p| p.contains(line_no)) && c.text.contains(line));
        assert!(covered, "line {line_no} not covered: {line:?}");
    }
}

#[test]
fn character_families_respect_window_sizes() {
    let doc = Document::new("faq.md", sample_text());
    let config = ChunkingConfig::default();
    let set = Chunker::new(config.clone()).chunk(&doc).expect("chunk");

    assert!(set.of_granularity(Granularity::Fine).count() > set.of_granularity(Granularity::Coarse).count());
    for c in set.of_granularity(Granularity::Fine) {
        assert!(c.text.chars().count() <= config.fine.size);
        assert!(c.position.is_none());
    }
    for c in set.of_granularity(Granularity::Coarse) {
        assert!(c.text.chars().count() <= config.coarse.size);
    }
    for c in &set {
        assert!(!c.text.trim().is_empty());
    }
}

#[test]
fn file_source_reads_documents() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("notes.txt"), "configuring multiple GPUs").unwrap();

    let doc = FileSource::with_root(tmp.path()).load("notes.txt").expect("load");
    assert_eq!(doc.text, "configuring multiple GPUs");
    assert!(doc.id.ends_with("notes.txt"));
}

#[test]
fn file_source_recovers_invalid_utf8() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("latin1.txt");
    fs::write(&path, b"caf\xe9 menu").unwrap();

    let doc = FileSource::new().load(path.to_str().unwrap()).expect("load");
    assert!(doc.text.starts_with("caf"));
    assert!(doc.text.ends_with(" menu"));
}

#[test]
fn file_source_reports_missing_documents() {
    let tmp = TempDir::new().unwrap();
    let err = FileSource::with_root(tmp.path()).load("absent.md").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
