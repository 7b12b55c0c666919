//! Query-side view over the persisted index, built once at startup and
//! passed into handlers instead of living in module-level state. Rebuilds
//! go through [`SearchContext::reload`].

use std::path::{Path, PathBuf};

use tracing::info;

use crate::flat::FlatIpIndex;
use crate::store::{read_index, read_meta, StoreError};
use crate::ChunkMeta;

/// Top-k used by the chat layer.
pub const DEFAULT_TOP_K: usize = 5;
/// Inner-product floor below which a chunk is not worth quoting.
pub const MIN_SCORE: f32 = 0.25;

/// One retrieved chunk with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Immutable-after-load pairing of the similarity index and its metadata.
pub struct SearchContext {
    index: FlatIpIndex,
    meta: Vec<ChunkMeta>,
    index_path: PathBuf,
    meta_path: PathBuf,
}

impl SearchContext {
    /// Load both halves from disk, refusing a mismatched pair.
    pub fn load(index_path: &Path, meta_path: &Path) -> Result<Self, StoreError> {
        let index = read_index(index_path)?;
        let meta = read_meta(meta_path)?;

        if index.len() != meta.len() {
            return Err(StoreError::Corrupt(format!(
                "index has {} vectors but metadata has {} entries",
                index.len(),
                meta.len()
            )));
        }

        info!(chunks = index.len(), dim = index.dim(), "Search context loaded");
        Ok(Self {
            index,
            meta,
            index_path: index_path.to_path_buf(),
            meta_path: meta_path.to_path_buf(),
        })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.index.dim()
    }

    /// Nearest chunks to a unit-normalized query vector. Hits below
    /// `min_score` are dropped.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let hits = self.index.search(query, k)?;
        Ok(hits
            .into_iter()
            .filter(|h| h.score >= min_score)
            .map(|h| {
                let m = &self.meta[h.ordinal];
                SearchHit {
                    text: m.text.clone(),
                    source: m.source.clone(),
                    score: h.score,
                }
            })
            .collect())
    }

    /// Re-read both files, e.g. after an ingest run replaced them.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let fresh = Self::load(&self.index_path, &self.meta_path)?;
        self.index = fresh.index;
        self.meta = fresh.meta;
        Ok(())
    }
}
