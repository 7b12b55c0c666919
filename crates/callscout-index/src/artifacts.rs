//! JSON artifacts produced by the pipeline and read back by the serving
//! layer: fresh (stub API), pdf (mined candidates) and merged deadlines.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::warn;

use callscout_common::records::{CallStatus, ARTIFACT_DATE_FORMAT};

use crate::store::StoreError;

/// File names under the pipeline data directory.
pub const FRESH_DEADLINES_FILE: &str = "fresh_deadlines.json";
pub const PDF_DEADLINES_FILE: &str = "pdf_deadlines.json";
pub const MERGED_DEADLINES_FILE: &str = "merged_deadlines.json";

/// Write a human-diffable JSON artifact via a staged temp file, so readers
/// never observe a half-written array.
pub fn write_json_artifact<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(parent)?;
    serde_json::to_writer_pretty(tmp.as_file(), value)
        .map_err(|e| StoreError::Corrupt(format!("JSON encode: {e}")))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// A merged-deadlines entry as the serving layer sees it. The deadline is
/// kept as the raw artifact string so legacy rows still display.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDeadline {
    pub code: String,
    pub deadline: String,
    pub status: CallStatus,
    pub budget: Option<f64>,
}

/// Load `merged_deadlines.json`, tolerating legacy field names and rows
/// with a missing or invalid status.
///
/// - `code` falls back to the legacy `programme` field name
/// - rows missing a code or deadline are skipped
/// - an absent/invalid status is recomputed from the deadline against
///   `today`; an unparsable deadline defaults to OPEN
/// - a missing file yields an empty list (index not built yet)
pub fn load_merged(path: &Path, today: NaiveDate) -> Result<Vec<LoadedDeadline>, StoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let rows: Vec<serde_json::Value> = serde_json::from_str(&raw)
        .map_err(|e| StoreError::Corrupt(format!("merged artifact: {e}")))?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let code = row["code"]
            .as_str()
            .or_else(|| row["programme"].as_str())
            .map(str::to_string);
        let deadline = row["deadline"].as_str().map(str::to_string);

        let (Some(code), Some(deadline)) = (code, deadline) else {
            warn!(?row, "Skipping merged row without code or deadline");
            continue;
        };

        let status = match row["status"].as_str() {
            Some("OPEN") => CallStatus::Open,
            Some("CLOSED") => CallStatus::Closed,
            _ => NaiveDate::parse_from_str(&deadline, ARTIFACT_DATE_FORMAT)
                .map(|d| CallStatus::from_deadline(d, today))
                .unwrap_or(CallStatus::Open),
        };

        out.push(LoadedDeadline {
            code,
            deadline,
            status,
            budget: row["budget"].as_f64(),
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_missing_file_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows = load_merged(&dir.path().join("nope.json"), date(2026, 1, 1)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_legacy_programme_field_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged_deadlines.json");
        std::fs::write(
            &path,
            r#"[{"programme": "PRIMA", "deadline": "01 Jun 2026", "status": "OPEN"}]"#,
        )
        .unwrap();

        let rows = load_merged(&path, date(2026, 1, 1)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "PRIMA");
        assert_eq!(rows[0].budget, None);
    }

    #[test]
    fn test_invalid_status_recomputed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged_deadlines.json");
        std::fs::write(
            &path,
            r#"[
                {"code": "A", "deadline": "01 Jun 2026", "status": "maybe"},
                {"code": "B", "deadline": "01 Jan 2020"},
                {"code": "C", "deadline": "not a date"}
            ]"#,
        )
        .unwrap();

        let rows = load_merged(&path, date(2026, 1, 1)).unwrap();
        assert_eq!(rows[0].status, CallStatus::Open);
        assert_eq!(rows[1].status, CallStatus::Closed);
        // Unparsable deadline keeps the row visible as open
        assert_eq!(rows[2].status, CallStatus::Open);
    }

    #[test]
    fn test_rows_without_code_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged_deadlines.json");
        std::fs::write(&path, r#"[{"deadline": "01 Jun 2026"}, {"code": "X"}]"#).unwrap();

        let rows = load_merged(&path, date(2026, 1, 1)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_write_artifact_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh_deadlines.json");
        write_json_artifact(&path, &Vec::<u32>::new()).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body.trim(), "[]");
    }
}
