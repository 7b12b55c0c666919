//! Configuration for the embedding service.

use serde::{Deserialize, Serialize};

/// Output width of the default MiniLM encoder.
pub const EMBEDDING_DIM: usize = 384;

/// Configuration for the sentence embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Hugging Face model ID
    pub model_id: String,

    /// Maximum sequence length (default: 512)
    pub max_length: usize,

    /// Batch size for inference (default: 32)
    pub batch_size: usize,

    /// L2-normalize embeddings (default: true)
    pub normalize: bool,

    /// Pooling strategy (default: mean)
    pub pooling: super::PoolingStrategy,

    /// Use GPU if available (default: true)
    pub use_gpu: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            max_length: 512,
            batch_size: 32,
            normalize: true,
            pooling: super::PoolingStrategy::Mean,
            use_gpu: true,
        }
    }
}

impl EmbeddingConfig {
    /// Create config for CPU-only inference.
    pub fn cpu() -> Self {
        Self {
            use_gpu: false,
            ..Default::default()
        }
    }

    /// Use a custom model.
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Set batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_multilingual_minilm() {
        let cfg = EmbeddingConfig::default();
        assert!(cfg.model_id.contains("multilingual-MiniLM"));
        assert!(cfg.normalize);
    }
}
