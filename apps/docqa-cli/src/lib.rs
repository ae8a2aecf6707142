//! Shared startup for the `docqa` binaries: logging, configuration, document
//! loading and agent initialization behind a spinner.

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docqa_core::config::{expand_path, Config, RetrievalSettings};
use docqa_core::document::{DocumentSource, FileSource};
use docqa_core::traits::Answerer;
use docqa_embed::get_default_embedder;
use docqa_hybrid::DocumentAgent;
use docqa_text::Analyzer;

pub const DEFAULT_DOCUMENT: &str = "docs/document.md";

/// Logs go to stderr so stdout stays clean for contexts and JSON.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

pub struct Startup {
    pub config: Config,
    pub settings: RetrievalSettings,
}

impl Startup {
    pub fn load(no_embeddings: bool) -> Result<Self> {
        let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
        let mut settings = config.retrieval()?;
        if no_embeddings {
            settings.use_embeddings = false;
        }
        Ok(Self { config, settings })
    }

    /// `--doc`, else `document.path` from config, else [`DEFAULT_DOCUMENT`].
    pub fn document_path(&self, flag: Option<&str>) -> PathBuf {
        let configured: Option<String> = self.config.get("document.path").ok();
        expand_path(flag.map(str::to_string).or(configured).unwrap_or_else(|| DEFAULT_DOCUMENT.to_string()))
    }

    /// Loads the document and indexes it, showing a spinner on stderr.
    pub fn agent(&self, doc_flag: Option<&str>, quiet: bool) -> Result<DocumentAgent> {
        let path = self.document_path(doc_flag);
        let document = FileSource::new().load(&path.to_string_lossy())?;
        info!(path = %path.display(), chars = document.text.chars().count(), lines = document.line_count(), "document loaded");

        let mut agent = DocumentAgent::new(self.settings.clone());
        if self.settings.use_embeddings {
            let model_dir: Option<String> = self.config.get("embedding.model_dir").ok();
            let model_dir = model_dir.map(expand_path);
            match get_default_embedder(model_dir.as_deref()) {
                Ok(embedder) => agent = agent.with_embedder(embedder),
                Err(e) if self.settings.tolerate_embedding_failure => tracing::warn!(error = %e, "no embedding model, continuing lexical-only"),
                Err(e) => return Err(e),
            }
        }

        let spinner = if quiet { ProgressBar::hidden() } else { ProgressBar::new_spinner() };
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
        spinner.set_message(format!("Indexing {}", path.display()));
        spinner.enable_steady_tick(Duration::from_millis(100));
        let result = agent.try_initialize(document);
        spinner.finish_and_clear();
        result.map_err(|e| anyhow!("Failed to initialize retrieval for {}: {}", path.display(), e))?;
        Ok(agent)
    }
}

/// Offline answerer: quotes the context lines that share the most terms with
/// the question, best first, keeping document order among equals.
pub struct ExtractiveAnswerer {
    analyzer: Analyzer,
    max_lines: usize,
}

impl ExtractiveAnswerer {
    pub fn new(max_lines: usize) -> Self { Self { analyzer: Analyzer::new(), max_lines: max_lines.max(1) } }
}

impl Default for ExtractiveAnswerer {
    fn default() -> Self { Self::new(3) }
}

impl Answerer for ExtractiveAnswerer {
    fn answer(&self, query: &str, context: &str) -> Result<String> {
        let wanted = self.analyzer.terms(query);
        let mut scored: Vec<(usize, usize, &str)> = context
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != "---")
            .enumerate()
            .filter_map(|(pos, line)| {
                let terms = self.analyzer.terms(line);
                let shared = wanted.iter().filter(|w| terms.contains(w)).count();
                (shared > 0).then_some((shared, pos, line))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(scored.iter().take(self.max_lines).map(|(_, _, line)| *line).collect::<Vec<_>>().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_best_matching_lines_first() {
        let context = "Billing runs monthly.\n\n---\n\nGPU drivers need a reboot.\nMultiple GPUs share one driver.";
        let answer = ExtractiveAnswerer::new(2).answer("which GPU driver", context).unwrap();
        assert_eq!(answer, "GPU drivers need a reboot.\nMultiple GPUs share one driver.");
    }

    #[test]
    fn nothing_shared_gives_empty_answer() {
        assert!(ExtractiveAnswerer::default().answer("kubernetes", "Billing runs monthly.").unwrap().is_empty());
    }
}
