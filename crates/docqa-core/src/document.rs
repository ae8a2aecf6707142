use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Error, Result};

/// The single source text questions are answered against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }
}

/// Provides raw document text for an identifier.
pub trait DocumentSource: Send + Sync {
    fn load(&self, id: &str) -> Result<Document>;
}

/// Reads documents from the filesystem; the identifier is a path.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    root: Option<PathBuf>,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative identifiers against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    fn resolve(&self, id: &str) -> PathBuf {
        let path = Path::new(id);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl DocumentSource for FileSource {
    fn load(&self, id: &str) -> Result<Document> {
        let path = self.resolve(id);
        if !path.is_file() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let text = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                warn!(path = %path.display(), "document is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(&fs::read(&path)?).to_string()
            }
        };
        Ok(Document::new(path.to_string_lossy(), text))
    }
}
