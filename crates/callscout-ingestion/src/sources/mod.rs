//! Remote sources for call records: the JSON stub list and the per-call
//! XML detail endpoint used to backfill budgets.

pub mod detail;
pub mod stub;

pub use detail::DetailClient;
pub use stub::StubClient;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Endpoint configuration shared by both fetchers.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Stub list endpoint, including its fixed query string.
    pub stub_url: String,
    /// Detail endpoint base; the numeric call id is appended per request.
    pub detail_base_url: String,
    /// Per-request timeout for the stub list fetch.
    pub stub_timeout: Duration,
    /// Per-request timeout for each detail fetch.
    pub detail_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            stub_url: "https://iris.research.org.cy/api/call/stub?owned=false".to_string(),
            detail_base_url: "https://iris.research.org.cy/api/call".to_string(),
            stub_timeout: Duration::from_secs(20),
            detail_timeout: Duration::from_secs(15),
        }
    }
}

/// Why a remote fetch produced no data. The pipeline handles these
/// explicitly instead of swallowing them into empty collections.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status: {0}")]
    Status(StatusCode),

    #[error("unexpected content type: {0}")]
    ContentType(String),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}
