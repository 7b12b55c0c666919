//! Merge engine: reconciles PDF-mined deadlines with API records into
//! the canonical sorted dataset.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use callscout_common::{CallRecord, CallStatus, PdfDeadlineCandidate};

/// Merge PDF candidates and API records into one record per code.
///
/// PDF candidates seed the `code -> deadline` mapping; API records
/// override when their deadline is strictly later (or the code is new).
/// Budgets and titles only ever come from API records, last write wins.
/// Output is sorted ascending by deadline, ties broken by code, so two
/// runs over the same inputs serialize byte-identically.
pub fn merge_records(
    pdf_candidates: &[PdfDeadlineCandidate],
    api_records: &[CallRecord],
    today: NaiveDate,
) -> Vec<CallRecord> {
    let mut latest: BTreeMap<String, NaiveDate> = BTreeMap::new();
    let mut budgets: BTreeMap<String, f64> = BTreeMap::new();
    let mut titles: BTreeMap<String, String> = BTreeMap::new();

    for candidate in pdf_candidates {
        let entry = latest.entry(candidate.code.clone()).or_insert(candidate.deadline);
        if candidate.deadline > *entry {
            *entry = candidate.deadline;
        }
    }

    for record in api_records {
        match latest.get(&record.code) {
            Some(existing) if record.deadline <= *existing => {}
            _ => {
                latest.insert(record.code.clone(), record.deadline);
            }
        }
        if let Some(budget) = record.budget {
            budgets.insert(record.code.clone(), budget);
        }
        if !record.title.is_empty() {
            titles.insert(record.code.clone(), record.title.clone());
        }
    }

    let mut merged: Vec<CallRecord> = latest
        .into_iter()
        .map(|(code, deadline)| CallRecord {
            status: CallStatus::from_deadline(deadline, today),
            budget: budgets.get(&code).copied(),
            title: titles.get(&code).cloned().unwrap_or_default(),
            code,
            deadline,
        })
        .collect();

    merged.sort_by(|a, b| a.deadline.cmp(&b.deadline).then_with(|| a.code.cmp(&b.code)));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn candidate(code: &str, deadline: NaiveDate) -> PdfDeadlineCandidate {
        PdfDeadlineCandidate { code: code.to_string(), deadline }
    }

    fn api_record(code: &str, deadline: NaiveDate, budget: Option<f64>) -> CallRecord {
        CallRecord {
            code: code.to_string(),
            title: String::new(),
            deadline,
            status: CallStatus::from_deadline(deadline, date(2025, 1, 1)),
            budget,
        }
    }

    #[test]
    fn test_later_api_deadline_wins() {
        let pdf = vec![candidate("X", date(2025, 1, 10))];
        let api = vec![api_record("X", date(2025, 2, 1), None)];

        let merged = merge_records(&pdf, &api, date(2025, 1, 20));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].deadline, date(2025, 2, 1));
        assert_eq!(merged[0].status, CallStatus::Open);
    }

    #[test]
    fn test_earlier_api_deadline_does_not_override() {
        let pdf = vec![candidate("X", date(2025, 3, 1))];
        let api = vec![api_record("X", date(2025, 2, 1), Some(1000.0))];

        let merged = merge_records(&pdf, &api, date(2025, 1, 1));
        assert_eq!(merged[0].deadline, date(2025, 3, 1));
        // Budget still attaches even though the deadline came from the PDF
        assert_eq!(merged[0].budget, Some(1000.0));
    }

    #[test]
    fn test_pdf_only_record_survives_unfiltered() {
        // Pre-merge PDF candidates carry no year filter
        let pdf = vec![candidate("HORIZON", date(2025, 4, 3))];

        let merged = merge_records(&pdf, &[], date(2025, 5, 1));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].code, "HORIZON");
        assert_eq!(merged[0].status, CallStatus::Closed);
        assert_eq!(merged[0].budget, None);
    }

    #[test]
    fn test_sorted_by_deadline_then_code() {
        let pdf = vec![
            candidate("B", date(2025, 6, 1)),
            candidate("A", date(2025, 6, 1)),
            candidate("C", date(2025, 5, 1)),
        ];
        let merged = merge_records(&pdf, &[], date(2025, 1, 1));
        let codes: Vec<&str> = merged.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let pdf = vec![
            candidate("X", date(2025, 1, 10)),
            candidate("Y", date(2025, 3, 3)),
        ];
        let api = vec![
            api_record("X", date(2025, 2, 1), Some(50_000.0)),
            api_record("Z", date(2025, 4, 4), None),
        ];

        let first = merge_records(&pdf, &api, date(2025, 1, 1));
        let second = merge_records(&pdf, &api, date(2025, 1, 1));
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_two_pdf_candidates_latest_seeds() {
        // A document contributes up to two candidates; the mapping keeps
        // the later of the two as the known deadline
        let pdf = vec![
            candidate("X", date(2025, 1, 10)),
            candidate("X", date(2025, 2, 20)),
        ];
        let merged = merge_records(&pdf, &[], date(2025, 1, 1));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].deadline, date(2025, 2, 20));
    }

    #[test]
    fn test_last_api_budget_wins() {
        let api = vec![
            api_record("X", date(2025, 2, 1), Some(1000.0)),
            api_record("X", date(2025, 2, 1), Some(2000.0)),
        ];
        let merged = merge_records(&[], &api, date(2025, 1, 1));
        assert_eq!(merged[0].budget, Some(2000.0));
    }
}
