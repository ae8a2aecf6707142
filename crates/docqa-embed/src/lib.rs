use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use docqa_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

/// Directory name tried when no model directory is configured.
pub const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";

/// BERT sentence-embedding model (all-MiniLM-L6-v2 class) on candle.
///
/// Expects `config.json`, `tokenizer.json` and either `model.safetensors` or
/// `pytorch_model.bin` in the model directory. Outputs are mean pooled over
/// real tokens and L2-normalized.
pub struct EmbeddingModel { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize, id: String }

impl EmbeddingModel {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), "loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let meta: serde_json::Value = serde_json::from_str(&raw_config)?;
        let dim = meta["hidden_size"].as_u64().ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let positions = meta["max_position_embeddings"].as_u64().unwrap_or(512) as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;

        let name = model_dir.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_else(|| "bert".to_string());
        let id = format!("bert:{}:d{}", name, dim);
        info!(id = %id, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len: positions.min(256), id })
    }

    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_batch(&self.tokenizer, texts, self.max_len, 0, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(rows)
    }
}

impl Embedder for EmbeddingModel {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { self.embed_texts(texts) }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&pickle).with_context(|| format!("reading {}", pickle.display()))?;
    weights.into_iter().map(|(name, t)| -> Result<(String, Tensor)> { Ok((name, t.to_device(device)?)) }).collect()
}

/// Deterministic bag-of-words hashing embedder.
///
/// Texts sharing words get positive cosine similarity, which is enough for
/// tests and offline development without model weights.
pub struct FakeEmbedder { dim: usize, id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("fake:xxhash:d{}", dim) } }
}

impl Embedder for FakeEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let embed = |text: &str| {
            let mut v = vec![0f32; self.dim];
            for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
                let mut hasher = XxHash64::with_seed(0);
                token.to_lowercase().hash(&mut hasher);
                let h = hasher.finish();
                v[(h as usize) % self.dim] += 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            }
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
            for x in &mut v { *x /= norm; }
            v
        };
        Ok(texts.iter().map(|t| embed(t.as_str())).collect())
    }
}

/// The configured embedder: [`FakeEmbedder`] when `APP_USE_FAKE_EMBEDDINGS`
/// is set, otherwise the local model.
pub fn get_default_embedder(model_dir: Option<&Path>) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake { info!("using FakeEmbedder"); return Ok(Arc::new(FakeEmbedder::new(384))); }
    Ok(Arc::new(EmbeddingModel::load(&resolve_model_dir(model_dir)?)?))
}

/// First existing directory among `APP_MODEL_DIR`, `MODEL_DIR`, `configured`
/// and [`DEFAULT_MODEL_DIR`].
pub fn resolve_model_dir(configured: Option<&Path>) -> Result<PathBuf> {
    let candidates = ["APP_MODEL_DIR", "MODEL_DIR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok().map(PathBuf::from))
        .chain(configured.map(Path::to_path_buf))
        .chain(std::iter::once(PathBuf::from(DEFAULT_MODEL_DIR)));
    for dir in candidates {
        if dir.is_dir() { debug!(dir = %dir.display(), "model dir resolved"); return Ok(dir); }
    }
    Err(anyhow!("Could not locate an embedding model directory (set APP_MODEL_DIR)"))
}
