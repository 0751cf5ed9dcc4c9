#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! Embedder implementations behind [`docshelf_core::traits::Embedder`]:
//! a local transformer model (candle) and a deterministic hashing embedder
//! for tests and model-free runs.

use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XlmRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::info;

use docshelf_core::config::{EmbeddingBackend, Settings};
use docshelf_core::traits::Embedder;

mod device;
mod hashing;
mod pooling;

pub use device::select_device;
pub use hashing::HashEmbedder;
pub use pooling::masked_mean_l2;

/// Local sentence embedder: an XLM-RoBERTa-family encoder loaded from a
/// directory holding `tokenizer.json`, `config.json` and
/// `pytorch_model.bin`, pooled with a masked mean and L2-normalized.
pub struct LocalEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl LocalEmbedder {
    /// `dim` is the expected output dimensionality; the first produced
    /// vector is checked against it so a mismatched model fails loudly
    /// instead of writing vectors the index cannot hold.
    pub fn from_dir(model_dir: &Path, dim: usize, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;

        let config_path = model_dir.join("config.json");
        let config_text = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: XlmRobertaConfig = serde_json::from_str(&config_text)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)
            .with_context(|| format!("failed to read weights from {}", weights_path.display()))?;
        let weights_map: std::collections::HashMap<String, Tensor> =
            weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;

        info!("embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len })
    }

    fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) = self.tokenize(text)?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::I64, &self.device)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vector: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        ensure!(
            vector.len() == self.dim,
            "model produced {}-dim vectors but embedding.dim is {}",
            vector.len(),
            self.dim
        );
        Ok(vector)
    }

    /// Pads or truncates to `max_len`; pad token id 1 matches the
    /// XLM-RoBERTa vocabulary.
    fn tokenize(&self, text: &str) -> Result<(Tensor, Tensor)> {
        let enc = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > self.max_len {
            ids.truncate(self.max_len);
            mask.truncate(self.max_len);
        }
        if ids.len() < self.max_len {
            let pad = self.max_len - ids.len();
            ids.extend(std::iter::repeat(1).take(pad));
            mask.extend(std::iter::repeat(0).take(pad));
        }
        let input_ids = Tensor::from_iter(ids, &self.device)?.reshape((1, self.max_len))?;
        let attention_mask = Tensor::from_iter(mask, &self.device)?.reshape((1, self.max_len))?;
        Ok((input_ids, attention_mask))
    }
}

impl Embedder for LocalEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_single(t)).collect()
    }
}

/// Constructs the embedder selected by `[embedding] backend`.
pub fn embedder_from_settings(settings: &Settings) -> Result<Box<dyn Embedder>> {
    match settings.embedding.backend {
        EmbeddingBackend::Hash => {
            info!(dim = settings.embedding.dim, "using hashing embedder");
            Ok(Box::new(HashEmbedder::new(settings.embedding.dim)))
        }
        EmbeddingBackend::Local => Ok(Box::new(LocalEmbedder::from_dir(
            &settings.embedding_model_dir(),
            settings.embedding.dim,
            settings.embedding.max_len,
        )?)),
    }
}
