//! CallScout Embedding Service
//!
//! Pure Rust multilingual sentence embeddings using Candle (Hugging Face).
//! No Python dependency - direct model loading from Hugging Face Hub.
//!
//! # Features
//! - 384-dim embeddings from sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2
//!   (covers both English and Greek call documents)
//! - GPU support (CUDA, Metal) with automatic fallback to CPU
//! - Batched inference for throughput
//! - L2-normalized embeddings so cosine similarity reduces to inner product

pub mod config;
pub mod embedder;
pub mod error;
pub mod pooling;

pub use config::{EmbeddingConfig, EMBEDDING_DIM};
pub use embedder::SentenceEmbedder;
pub use error::{EmbedError, Result};
pub use pooling::PoolingStrategy;

use async_trait::async_trait;

/// Text-to-vector backend consumed by the ingestion pipeline and the
/// serving layer. Kept as a trait so tests can substitute a deterministic
/// in-process encoder.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; returns one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vecs = self.embed_batch(&[text.to_string()]).await?;
        vecs.pop()
            .ok_or_else(|| EmbedError::InvalidInput("no embedding produced".to_string()))
    }

    /// Output vector width.
    fn dimension(&self) -> usize;
}
