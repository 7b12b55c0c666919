//! Brute-force inner-product index over fixed-dimension vectors.

use crate::store::StoreError;

/// One search result: vector ordinal plus inner-product score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredOrdinal {
    pub ordinal: usize,
    pub score: f32,
}

/// Flat inner-product index. Vectors are stored row-major; a query is a
/// single pass over all rows. With unit-normalized vectors the inner
/// product is the cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIpIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append one vector. Fails if the width does not match the index.
    pub fn add(&mut self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Borrow the vector at `ordinal`.
    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        let start = ordinal.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// Raw row-major data, used by the store layer.
    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn from_raw(dim: usize, data: Vec<f32>) -> Self {
        Self { dim, data }
    }

    /// Top-k nearest neighbors by inner product. Results are sorted by
    /// descending score; equal scores fall back to ascending ordinal so
    /// the ordering is deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredOrdinal>, StoreError> {
        if query.len() != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }

        let mut scored: Vec<ScoredOrdinal> = (0..self.len())
            .map(|ordinal| {
                let row = &self.data[ordinal * self.dim..(ordinal + 1) * self.dim];
                let score = row.iter().zip(query).map(|(a, b)| a * b).sum();
                ScoredOrdinal { ordinal, score }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.ordinal.cmp(&b.ordinal))
        });
        scored.truncate(k);
        Ok(scored)
    }
}
