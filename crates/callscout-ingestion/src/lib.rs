//! callscout-ingestion — Funding-call ingestion pipeline.
//!
//! Single-pass, full-rebuild batch job:
//! - Stub API fetch with XML budget backfill
//! - PDF text extraction with bilingual OCR fallback
//! - Deadline mining around keyword context windows
//! - Fixed-size chunking + embedding into the flat similarity index
//! - Merge of PDF and API deadlines into the canonical sorted dataset

pub mod chunker;
pub mod dates;
pub mod merge;
pub mod pdf;
pub mod pipeline;
pub mod sources;
