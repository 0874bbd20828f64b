//! Embedding backends.
//!
//! `SentenceEmbedder` runs a local XLM-RoBERTa sentence encoder through
//! candle; `HashEmbedder` is a deterministic token-hashing stand-in for
//! tests and offline runs. Both produce L2-normalized vectors so the
//! index can rank by inner product.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use candle_core::{pickle, DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XlmRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use docqa_core::config::EmbeddingConfig;
use docqa_core::error::Error;
use docqa_core::traits::Embedder;

mod device;
mod pool;
mod tokenize;

pub use device::select_device;

const PAD_TOKEN_ID: u32 = 1;

/// Candle-backed sentence embedder loaded from a local model directory
/// (tokenizer.json, config.json, pytorch_model.bin).
///
/// Loading is fatal-at-startup: any failure surfaces as
/// `Error::ModelUnavailable` and is never retried per query.
pub struct SentenceEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl SentenceEmbedder {
    pub fn load(cfg: &EmbeddingConfig) -> docqa_core::error::Result<Self> {
        Self::load_inner(cfg).map_err(|e| Error::ModelUnavailable(e.to_string()))
    }

    fn load_inner(cfg: &EmbeddingConfig) -> Result<Self> {
        let model_dir = resolve_model_dir(cfg)?;
        let device = select_device();

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let config_raw = std::fs::read_to_string(&config_path)?;
        let config: XlmRobertaConfig = serde_json::from_str(&config_raw)?;
        let dim = serde_json::from_str::<serde_json::Value>(&config_raw)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("model config missing hidden_size"))? as usize;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;

        tracing::info!(model_dir = %model_dir.display(), dim, "sentence embedder loaded");
        Ok(Self { model, tokenizer, device, dim, max_len: cfg.max_len })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(
            &self.tokenizer,
            text,
            self.max_len,
            PAD_TOKEN_ID,
            &self.device,
        )?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::I64, &self.device)?;
        let hidden =
            self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = pool::masked_mean_l2(&hidden, &attention_mask)?;
        let vector: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if vector.len() != self.dim {
            return Err(anyhow!("embedding dim {} != model dim {}", vector.len(), self.dim));
        }
        Ok(vector)
    }
}

impl Embedder for SentenceEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> docqa_core::error::Result<Vec<f32>> {
        self.embed_one(text).map_err(|e| Error::ModelUnavailable(e.to_string()))
    }
}

/// Token-bucket hashing embedder. Deterministic and model-free: each
/// whitespace token hashes to a bucket, the accumulated vector is
/// L2-normalized. Good enough for routing tests and offline smoke runs.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> docqa_core::error::Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let token = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 1.0 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

/// Pick the backend from configuration, once, at startup.
pub fn embedder_from_config(cfg: &EmbeddingConfig) -> docqa_core::error::Result<Box<dyn Embedder>> {
    match cfg.backend.as_str() {
        "hash" => {
            tracing::info!(dim = cfg.hash_dim, "using hashing embedder");
            Ok(Box::new(HashEmbedder::new(cfg.hash_dim)))
        }
        "model" => Ok(Box::new(SentenceEmbedder::load(cfg)?)),
        other => Err(Error::InvalidConfig(format!("unknown embedding backend '{other}'"))),
    }
}

fn resolve_model_dir(cfg: &EmbeddingConfig) -> Result<PathBuf> {
    if let Some(dir) = &cfg.model_dir {
        let p = docqa_core::config::expand_path(dir);
        if p.exists() {
            return Ok(p);
        }
        return Err(anyhow!("configured model_dir does not exist: {}", p.display()));
    }
    if let Ok(dir) = std::env::var("DOCQA_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    let default = PathBuf::from("models/embedding");
    if default.exists() {
        return Ok(default);
    }
    Err(anyhow!("could not locate the embedding model directory; set embedding.model_dir"))
}
