//! Binary persistence for the similarity index and its metadata list.
//!
//! Both files are staged to temp files in the target directory and
//! renamed into place, index first. A crash mid-write therefore leaves
//! either the previous consistent pair or the new one, never a mismatch.
//!
//! Index file layout (little-endian):
//!   magic `CSIX` | version u16 | dim u32 | count u64 | count*dim f32

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::flat::FlatIpIndex;
use crate::ChunkMeta;

const MAGIC: [u8; 4] = *b"CSIX";
const VERSION: u16 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata encoding error: {0}")]
    Meta(#[from] bincode::Error),

    #[error("Corrupt store: {0}")]
    Corrupt(String),

    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Temp file error: {0}")]
    Persist(#[from] tempfile::PersistError),
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn stage_index(index: &FlatIpIndex, dest: &Path) -> Result<NamedTempFile, StoreError> {
    let tmp = NamedTempFile::new_in(parent_dir(dest))?;
    {
        let mut w = BufWriter::new(tmp.as_file());
        w.write_all(&MAGIC)?;
        w.write_all(&VERSION.to_le_bytes())?;
        w.write_all(&(index.dim() as u32).to_le_bytes())?;
        w.write_all(&(index.len() as u64).to_le_bytes())?;
        for value in index.raw() {
            w.write_all(&value.to_le_bytes())?;
        }
        w.flush()?;
    }
    Ok(tmp)
}

fn stage_meta(meta: &[ChunkMeta], dest: &Path) -> Result<NamedTempFile, StoreError> {
    let tmp = NamedTempFile::new_in(parent_dir(dest))?;
    {
        let mut w = BufWriter::new(tmp.as_file());
        bincode::serialize_into(&mut w, meta)?;
        w.flush()?;
    }
    Ok(tmp)
}

/// Persist the index and metadata together. Callers must pass lists of
/// equal length; the pair is refused otherwise.
pub fn write_index_and_meta(
    index: &FlatIpIndex,
    meta: &[ChunkMeta],
    index_path: &Path,
    meta_path: &Path,
) -> Result<(), StoreError> {
    if index.len() != meta.len() {
        return Err(StoreError::Corrupt(format!(
            "index has {} vectors but metadata has {} entries",
            index.len(),
            meta.len()
        )));
    }

    // Stage both before swapping either, so a failure in the metadata
    // encode never leaves a fresh index next to stale metadata.
    let index_tmp = stage_index(index, index_path)?;
    let meta_tmp = stage_meta(meta, meta_path)?;

    index_tmp.persist(index_path)?;
    meta_tmp.persist(meta_path)?;

    info!(
        vectors = index.len(),
        dim = index.dim(),
        index = %index_path.display(),
        meta = %meta_path.display(),
        "Similarity index persisted"
    );
    Ok(())
}

/// Read the binary index file back.
pub fn read_index(path: &Path) -> Result<FlatIpIndex, StoreError> {
    let mut r = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(StoreError::Corrupt("bad magic".to_string()));
    }

    let mut version = [0u8; 2];
    r.read_exact(&mut version)?;
    let version = u16::from_le_bytes(version);
    if version != VERSION {
        return Err(StoreError::Corrupt(format!("unsupported version {version}")));
    }

    let mut dim = [0u8; 4];
    r.read_exact(&mut dim)?;
    let dim = u32::from_le_bytes(dim) as usize;

    let mut count = [0u8; 8];
    r.read_exact(&mut count)?;
    let count = u64::from_le_bytes(count) as usize;

    let total = count
        .checked_mul(dim)
        .ok_or_else(|| StoreError::Corrupt("vector count overflow".to_string()))?;

    let mut data = Vec::with_capacity(total);
    let mut buf = [0u8; 4];
    for _ in 0..total {
        r.read_exact(&mut buf)?;
        data.push(f32::from_le_bytes(buf));
    }

    Ok(FlatIpIndex::from_raw(dim, data))
}

/// Read the metadata list back.
pub fn read_meta(path: &Path) -> Result<Vec<ChunkMeta>, StoreError> {
    let r = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(r)?)
}
