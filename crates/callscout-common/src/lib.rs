//! callscout-common — Shared record types used across all CallScout crates.

pub mod records;

pub use records::{
    normalize_code, parse_amount, parse_iso_date, CallRecord, CallStatus, PdfDeadlineCandidate,
};
