//! callscout-index — Flat similarity index, binary persistence and the
//! JSON artifacts the serving layer consumes.
//!
//! The index is a brute-force inner-product store over unit-normalized
//! vectors; position `i` in the index always refers to `meta[i]`.

pub mod artifacts;
pub mod context;
pub mod flat;
pub mod store;

pub use artifacts::{load_merged, write_json_artifact, LoadedDeadline};
pub use context::{SearchContext, SearchHit, DEFAULT_TOP_K, MIN_SCORE};
pub use flat::{FlatIpIndex, ScoredOrdinal};
pub use store::{read_index, read_meta, write_index_and_meta, StoreError};

use serde::{Deserialize, Serialize};

/// Metadata record paired 1:1 with an index vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Chunk body text (trimmed, at most one chunk window long).
    pub text: String,
    /// Originating document file name, e.g. `HORIZON.pdf`.
    pub source: String,
}
