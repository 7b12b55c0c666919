//! Pooling strategies for embedding extraction.

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// Pooling strategy for converting token embeddings to sentence embeddings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PoolingStrategy {
    /// Mean pooling over all tokens (excluding padding). This is what the
    /// sentence-transformers MiniLM family was trained with.
    #[default]
    Mean,

    /// Use [CLS] token embedding
    Cls,
}

impl PoolingStrategy {
    /// Apply pooling to token embeddings.
    ///
    /// `embeddings` has shape (batch, seq_len, hidden), `attention_mask`
    /// has shape (batch, seq_len). Returns (batch, hidden).
    pub fn apply(&self, embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            PoolingStrategy::Mean => mean_pool(embeddings, attention_mask),
            PoolingStrategy::Cls => cls_pool(embeddings),
        }
    }
}

/// Mean pooling over non-padding tokens, weighted by the attention mask.
fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask_expanded = attention_mask.unsqueeze(2)?.expand(embeddings.shape())?;

    let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;

    // Clamp the token count so all-padding rows cannot divide by zero
    let sum_mask = attention_mask
        .unsqueeze(2)?
        .sum(1)?
        .clamp(1e-9f32, f32::MAX)?;

    sum_embeddings.broadcast_div(&sum_mask)
}

/// Extract the [CLS] token embedding (first token).
fn cls_pool(embeddings: &Tensor) -> candle_core::Result<Tensor> {
    embeddings.narrow(1, 0, 1)?.squeeze(1)
}

/// L2 normalize embeddings so inner product equals cosine similarity.
pub fn l2_normalize(embeddings: &Tensor) -> candle_core::Result<Tensor> {
    let norms = embeddings.sqr()?.sum_keepdim(1)?.sqrt()?;
    let norms_clamped = norms.clamp(1e-9f32, f32::MAX)?;
    embeddings.broadcast_div(&norms_clamped)
}
