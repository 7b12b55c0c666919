//! Stub-list API client.
//!
//! The stub endpoint returns abbreviated call records as JSON. Field
//! names vary between deployments, so aliases are resolved once here at
//! the ingestion boundary; downstream code only ever sees [`CallRecord`].

use chrono::{Datelike, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, REFERER, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use callscout_common::{normalize_code, parse_amount, parse_iso_date, CallRecord, CallStatus};

use super::detail::DetailClient;
use super::{FetchError, SourceConfig};

/// One raw list item as served by the stub endpoint, aliases included.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStubItem {
    #[serde(rename = "Code", alias = "callCode")]
    pub code: Option<String>,
    #[serde(rename = "deadline_date", alias = "EndDate")]
    pub deadline: Option<String>,
    #[serde(rename = "call_title", alias = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Budget")]
    pub budget: Option<serde_json::Value>,
    #[serde(rename = "Id")]
    pub id: Option<i64>,
}

/// A stub item that survived field resolution. The budget may still need
/// a detail-endpoint backfill.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStubCall {
    pub code: String,
    pub title: String,
    pub deadline: NaiveDate,
    pub budget: Option<f64>,
    pub detail_id: Option<i64>,
}

/// Resolve one raw item, discarding it when the code or deadline is
/// missing or the deadline predates the current year.
pub fn resolve_stub_item(item: RawStubItem, today: NaiveDate) -> Option<ResolvedStubCall> {
    let code = item.code.as_deref().map(str::trim).filter(|c| !c.is_empty())?;

    let deadline = item.deadline.as_deref().and_then(parse_iso_date)?;
    if deadline.year() < today.year() {
        return None;
    }

    Some(ResolvedStubCall {
        code: normalize_code(code),
        title: item.title.as_deref().unwrap_or("").trim().to_string(),
        deadline,
        budget: item.budget.as_ref().and_then(budget_from_value),
        detail_id: item.id,
    })
}

/// The stub budget field is sometimes a bare number, sometimes a
/// formatted string; zero and empty both mean "not published here".
fn budget_from_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| *v != 0.0),
        serde_json::Value::String(s) => parse_amount(s).filter(|v| *v != 0.0),
        _ => None,
    }
}

/// Client for the stub list endpoint.
pub struct StubClient {
    client: reqwest::Client,
    url: String,
    detail: DetailClient,
}

impl StubClient {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (CallScoutBot)"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(REFERER, HeaderValue::from_static("https://iris.research.org.cy/#!/calls"));

        let client = reqwest::Client::builder()
            .timeout(config.stub_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url: config.stub_url.clone(),
            detail: DetailClient::new(config)?,
        })
    }

    /// Fetch and resolve the current call list. Each call missing a
    /// budget gets one detail-endpoint lookup; detail failures only cost
    /// that call its budget.
    #[instrument(skip(self))]
    pub async fn fetch_calls(&self, today: NaiveDate) -> Result<Vec<CallRecord>, FetchError> {
        let resp = self.client.get(&self.url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("application/json") {
            return Err(FetchError::ContentType(content_type));
        }

        let body = resp.text().await?;
        let items: Vec<RawStubItem> = serde_json::from_str(&body)?;
        let total = items.len();

        let mut records = Vec::new();
        for item in items {
            let Some(mut call) = resolve_stub_item(item, today) else {
                continue;
            };

            if call.budget.is_none() {
                if let Some(id) = call.detail_id {
                    match self.detail.fetch_budget(id).await {
                        Ok(budget) => call.budget = budget,
                        Err(e) => {
                            debug!(call = %call.code, id, error = %e, "Budget detail fetch failed");
                        }
                    }
                }
            }

            records.push(CallRecord {
                status: CallStatus::from_deadline(call.deadline, today),
                code: call.code,
                title: call.title,
                deadline: call.deadline,
                budget: call.budget,
            });
        }

        if records.len() < total {
            warn!(discarded = total - records.len(), "Stub items discarded during resolution");
        }
        info!(calls = records.len(), year = today.year(), "Stub API fetch complete");
        Ok(records)
    }
}
