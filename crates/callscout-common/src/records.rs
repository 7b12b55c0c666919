//! Canonical funding-call records shared by the fetchers, the merge engine
//! and the artifact layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used in every JSON artifact, e.g. `01 Jun 2026`.
pub const ARTIFACT_DATE_FORMAT: &str = "%d %b %Y";

/// Whether a call is still accepting submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "CLOSED")]
    Closed,
}

impl CallStatus {
    /// A call counts as open up to and including its deadline day.
    pub fn from_deadline(deadline: NaiveDate, today: NaiveDate) -> Self {
        if deadline >= today {
            CallStatus::Open
        } else {
            CallStatus::Closed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Open => "OPEN",
            CallStatus::Closed => "CLOSED",
        }
    }
}

/// One funding call, identified by its normalized programme code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub code: String,
    pub title: String,
    #[serde(with = "artifact_date")]
    pub deadline: NaiveDate,
    pub status: CallStatus,
    pub budget: Option<f64>,
}

/// A deadline mined from a PDF, keyed by the document's programme code.
/// At most two of these exist per document (the two earliest distinct dates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfDeadlineCandidate {
    pub code: String,
    #[serde(with = "artifact_date")]
    pub deadline: NaiveDate,
}

/// Programme codes double as file stems, so path separators become `_`.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().replace(['/', '\\'], "_")
}

/// Parse a monetary amount, tolerating thousands separators and embedded
/// whitespace (`"12,500.00"` and `"12 500.00"` both yield `12500.0`).
/// Returns `None` for anything that does not parse to a finite number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace() && *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an ISO-8601 date or datetime string down to a calendar date.
/// The stub API mixes plain dates and full timestamps across fields.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|dt| dt.date())
        .ok()
}

/// Serde helper for the `%d %b %Y` artifact date format.
pub mod artifact_date {
    use super::ARTIFACT_DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(ARTIFACT_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&s, ARTIFACT_DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}
