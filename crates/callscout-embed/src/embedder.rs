//! Multilingual MiniLM embedder using Candle.

use std::time::Instant;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::pooling::l2_normalize;
use crate::{EmbedError, Embedder, EmbeddingConfig, Result, EMBEDDING_DIM};

/// Sentence embedder for bilingual (English/Greek) call documents.
///
/// Loads the model from Hugging Face Hub and provides batched inference
/// for generating unit-normalized embeddings.
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    config: EmbeddingConfig,
}

impl SentenceEmbedder {
    /// Create a new embedder, downloading model files on first use.
    pub async fn new(config: EmbeddingConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Loading embedding model: {}", config.model_id);

        let device = Self::select_device(&config)?;
        debug!("Using device: {:?}", device);

        // Hub downloads use the sync API; run them off the async runtime.
        let model_id = config.model_id.clone();
        let (bert_config, tokenizer, weights_path) = tokio::task::spawn_blocking(move || {
            use hf_hub::{Repo, RepoType};

            let api = Api::new().map_err(|e| EmbedError::Download(format!("API init: {e}")))?;
            let api_repo = api.repo(Repo::new(model_id, RepoType::Model));

            let config_path = api_repo
                .get("config.json")
                .map_err(|e| EmbedError::Download(format!("config.json: {e}")))?;
            let content = std::fs::read_to_string(&config_path)?;
            let bert_config: Config = serde_json::from_str(&content)?;

            let tokenizer_path = api_repo
                .get("tokenizer.json")
                .map_err(|e| EmbedError::Download(format!("tokenizer.json: {e}")))?;
            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;

            let weights_path = api_repo
                .get("model.safetensors")
                .or_else(|_| api_repo.get("pytorch_model.bin"))
                .map_err(|e| EmbedError::Download(format!("model weights: {e}")))?;

            Ok::<_, EmbedError>((bert_config, tokenizer, weights_path))
        })
        .await
        .map_err(|e| EmbedError::Download(e.to_string()))??;

        let vb = if weights_path
            .extension()
            .map(|e| e == "safetensors")
            .unwrap_or(false)
        {
            unsafe { VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, &device)? }
        } else {
            VarBuilder::from_pth(&weights_path, DType::F32, &device)?
        };

        let model = BertModel::load(vb, &bert_config)?;
        info!("Model loaded in {:.2}s", start.elapsed().as_secs_f32());

        Ok(Self {
            model,
            tokenizer,
            device,
            config,
        })
    }

    /// Select the best available device.
    fn select_device(config: &EmbeddingConfig) -> Result<Device> {
        if !config.use_gpu {
            return Ok(Device::Cpu);
        }

        #[cfg(feature = "cuda")]
        {
            match Device::new_cuda(0) {
                Ok(device) => {
                    info!("CUDA device available");
                    return Ok(device);
                }
                Err(e) => {
                    debug!("CUDA not available: {}, falling back to CPU", e);
                }
            }
        }

        #[cfg(feature = "metal")]
        {
            match Device::new_metal(0) {
                Ok(device) => {
                    info!("Metal device available");
                    return Ok(device);
                }
                Err(e) => {
                    debug!("Metal not available: {}, falling back to CPU", e);
                }
            }
        }

        Ok(Device::Cpu)
    }

    /// Embed a single batch of texts.
    fn forward_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let text_refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();

        let encodings = self
            .tokenizer
            .encode_batch(text_refs, true)
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;

        let mut input_ids_vec = Vec::with_capacity(texts.len());
        let mut attention_mask_vec = Vec::with_capacity(texts.len());
        let mut token_type_ids_vec = Vec::with_capacity(texts.len());

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let type_ids = encoding.get_type_ids();

            let max_len = self.config.max_length.min(512);
            let len = ids.len().min(max_len);

            input_ids_vec.push(ids[..len].to_vec());
            attention_mask_vec.push(mask[..len].to_vec());
            token_type_ids_vec.push(type_ids[..len].to_vec());
        }

        let max_len = input_ids_vec.iter().map(|v| v.len()).max().unwrap_or(0);

        for ((ids, mask), type_ids) in input_ids_vec
            .iter_mut()
            .zip(attention_mask_vec.iter_mut())
            .zip(token_type_ids_vec.iter_mut())
        {
            let pad_len = max_len - ids.len();
            ids.extend(std::iter::repeat_n(0, pad_len));
            mask.extend(std::iter::repeat_n(0, pad_len));
            type_ids.extend(std::iter::repeat_n(0, pad_len));
        }

        // attention_mask must be F32 for the pooling arithmetic
        let batch_size = texts.len();
        let input_ids = Tensor::new(input_ids_vec, &self.device)?.reshape((batch_size, max_len))?;
        let attention_mask = Tensor::new(attention_mask_vec, &self.device)?
            .reshape((batch_size, max_len))?
            .to_dtype(DType::F32)?;
        let token_type_ids =
            Tensor::new(token_type_ids_vec, &self.device)?.reshape((batch_size, max_len))?;

        let embeddings = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = self.config.pooling.apply(&embeddings, &attention_mask)?;

        let normalized = if self.config.normalize {
            l2_normalize(&pooled)?
        } else {
            pooled
        };

        Ok(normalized.to_vec2::<f32>()?)
    }
}

#[async_trait]
impl Embedder for SentenceEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let mut all = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.config.batch_size.max(1)) {
            all.extend(self.forward_batch(batch)?);
        }

        debug!(
            "Embedded {} texts in {:.2}ms",
            texts.len(),
            start.elapsed().as_secs_f32() * 1000.0,
        );

        Ok(all)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}
