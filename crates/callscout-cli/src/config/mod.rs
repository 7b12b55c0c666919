//! Configuration loading for CallScout.
//! Reads callscout.toml from the current directory or path in CALLSCOUT_CONFIG env var.


use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use callscout_ingestion::chunker::CHUNK_SIZE;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub ocr: OcrSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_stub_url")]
    pub stub_url: String,
    #[serde(default = "default_detail_base_url")]
    pub detail_base_url: String,
    #[serde(default = "default_stub_timeout_secs")]
    pub stub_timeout_secs: u64,
    #[serde(default = "default_detail_timeout_secs")]
    pub detail_timeout_secs: u64,
}

fn default_stub_url() -> String {
    "https://iris.research.org.cy/api/call/stub?owned=false".to_string()
}
fn default_detail_base_url() -> String {
    "https://iris.research.org.cy/api/call".to_string()
}
fn default_stub_timeout_secs() -> u64 { 20 }
fn default_detail_timeout_secs() -> u64 { 15 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            stub_url: default_stub_url(),
            detail_base_url: default_detail_base_url(),
            stub_timeout_secs: default_stub_timeout_secs(),
            detail_timeout_secs: default_detail_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_pdf_dir() -> PathBuf { PathBuf::from("pdfs") }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pdf_dir: default_pdf_dir(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize { CHUNK_SIZE }

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: default_chunk_size() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,
}

fn default_model_id() -> String {
    "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string()
}
fn default_batch_size() -> usize { 32 }
fn default_use_gpu() -> bool { true }

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            batch_size: default_batch_size(),
            use_gpu: default_use_gpu(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSettings {
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_languages")]
    pub languages: String,
}

fn default_dpi() -> u32 { 200 }
fn default_languages() -> String { "ell+eng".to_string() }

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            languages: default_languages(),
        }
    }
}

impl Config {
    /// Load configuration from callscout.toml.
    /// Checks CALLSCOUT_CONFIG env var first, then the current directory.
    /// A missing file yields the built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CALLSCOUT_CONFIG")
            .unwrap_or_else(|_| "callscout.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
