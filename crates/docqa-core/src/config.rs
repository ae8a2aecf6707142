//! Configuration loader, retrieval settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_RETRIEVAL__MIN_CONTEXT_CHARS=200`).
//! The `[retrieval]` table maps onto [`RetrievalSettings`]; every field has a
//! default so partial tables are fine.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.retrieval()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Validated retrieval settings; defaults when the table is absent.
    pub fn retrieval(&self) -> Result<RetrievalSettings> {
        let settings = if self.figment.find_value("retrieval").is_ok() {
            self.figment
                .extract_inner::<RetrievalSettings>("retrieval")
                .map_err(|e| Error::InvalidConfig(e.to_string()))?
        } else {
            RetrievalSettings::default()
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// A character window with overlap, used by the fine and coarse families.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowConfig {
    pub size: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub fine: WindowConfig,
    pub coarse: WindowConfig,
    pub line_window: usize,
    pub line_stride: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            fine: WindowConfig { size: 300, overlap: 150 },
            coarse: WindowConfig { size: 800, overlap: 200 },
            line_window: 10,
            line_stride: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionConfig {
    pub semantic_weight: f32,
    pub lexical_weight: f32,
    /// Hits requested from each index before merging.
    pub candidates_per_index: usize,
    /// Overlap ratio at or above which two chunks are collapsed.
    pub dedup_threshold: f32,
    pub max_context_chars: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.7,
            lexical_weight: 0.3,
            candidates_per_index: 20,
            dedup_threshold: 0.9,
            max_context_chars: 4000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub chunking: ChunkingConfig,
    pub fusion: FusionConfig,
    /// Contexts shorter than this fall back to the full document.
    pub min_context_chars: usize,
    pub use_embeddings: bool,
    /// Degrade to lexical-only instead of failing when embeddings break.
    pub tolerate_embedding_failure: bool,
    pub embed_batch_size: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            fusion: FusionConfig::default(),
            min_context_chars: 100,
            use_embeddings: true,
            tolerate_embedding_failure: true,
            embed_batch_size: 32,
        }
    }
}

impl RetrievalSettings {
    pub fn lexical_only() -> Self {
        Self { use_embeddings: false, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));
        let c = &self.chunking;
        for (name, w) in [("fine", c.fine), ("coarse", c.coarse)] {
            if w.size == 0 {
                return invalid(format!("chunking.{name}.size must be positive"));
            }
            if w.overlap >= w.size {
                return invalid(format!("chunking.{name}.overlap ({}) must be below size ({})", w.overlap, w.size));
            }
        }
        if c.line_window == 0 || c.line_stride == 0 || c.line_stride > c.line_window {
            return invalid(format!(
                "line_stride ({}) must be in 1..=line_window ({})",
                c.line_stride, c.line_window
            ));
        }
        let f = &self.fusion;
        let weights_ok = [f.semantic_weight, f.lexical_weight].iter().all(|w| w.is_finite() && *w >= 0.0);
        if !weights_ok || f.semantic_weight + f.lexical_weight <= 0.0 {
            return invalid("fusion weights must be non-negative and not both zero".into());
        }
        if !(f.dedup_threshold > 0.0 && f.dedup_threshold <= 1.0) {
            return invalid(format!("fusion.dedup_threshold ({}) must be in (0, 1]", f.dedup_threshold));
        }
        if f.candidates_per_index == 0 || f.max_context_chars == 0 || self.embed_batch_size == 0 {
            return invalid("candidates_per_index, max_context_chars and embed_batch_size must be positive".into());
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> Config {
        Config::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    #[test]
    fn missing_table_yields_defaults() {
        let settings = config("[other]\nkey = 1").retrieval().unwrap();
        assert_eq!(settings, RetrievalSettings::default());
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let settings = config(
            "[retrieval]\nmin_context_chars = 250\n[retrieval.fusion]\nsemantic_weight = 0.5\n",
        )
        .retrieval()
        .unwrap();
        assert_eq!(settings.min_context_chars, 250);
        assert_eq!(settings.fusion.semantic_weight, 0.5);
        assert_eq!(settings.fusion.lexical_weight, 0.3);
        assert_eq!(settings.chunking, ChunkingConfig::default());
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        let err = config("[retrieval.chunking.fine]\nsize = 100\noverlap = 100\n").retrieval().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn rejects_stride_wider_than_window() {
        let mut settings = RetrievalSettings::default();
        settings.chunking.line_stride = 11;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_zero_weights() {
        let mut settings = RetrievalSettings::lexical_only();
        settings.fusion.semantic_weight = 0.0;
        settings.fusion.lexical_weight = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn expands_env_vars_in_paths() {
        std::env::set_var("DOCQA_TEST_HOME", "/srv/docs");
        assert_eq!(expand_path("$DOCQA_TEST_HOME/faq.md"), PathBuf::from("/srv/docs/faq.md"));
    }
}
