//! Full-rebuild ingestion pipeline.
//!
//! One run fetches the stub API, extracts every PDF under the document
//! directory, mines deadlines, rebuilds the similarity index from
//! scratch and writes the three JSON artifacts plus the index pair.
//! Non-fatal failures (a down API, one broken PDF) are recorded in the
//! report; only artifact writes are fatal.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use callscout_common::{CallRecord, PdfDeadlineCandidate};
use callscout_embed::Embedder;
use callscout_index::artifacts::{
    write_json_artifact, FRESH_DEADLINES_FILE, MERGED_DEADLINES_FILE, PDF_DEADLINES_FILE,
};
use callscout_index::{write_index_and_meta, ChunkMeta, FlatIpIndex};

use crate::chunker::{chunk_text, CHUNK_SIZE};
use crate::dates::mine_deadlines;
use crate::merge::merge_records;
use crate::pdf::{OcrConfig, PdfExtractor};
use crate::sources::stub::StubClient;

/// One pipeline invocation's inputs.
#[derive(Debug, Clone)]
pub struct IngestJob {
    /// Directory scanned (non-recursively) for `*.pdf` documents.
    pub pdf_dir: PathBuf,
    /// Directory receiving the three JSON artifacts.
    pub data_dir: PathBuf,
    pub index_path: PathBuf,
    pub meta_path: PathBuf,
    pub chunk_size: usize,
    pub ocr: OcrConfig,
}

impl IngestJob {
    pub fn new(pdf_dir: PathBuf, data_dir: PathBuf) -> Self {
        let index_path = data_dir.join("index.bin");
        let meta_path = data_dir.join("meta.bin");
        Self {
            pdf_dir,
            data_dir,
            index_path,
            meta_path,
            chunk_size: CHUNK_SIZE,
            ocr: OcrConfig::default(),
        }
    }
}

/// Pipeline stage identifiers carried on progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    FetchingApi,
    ExtractingPdfs,
    Indexing,
    Merging,
    Done,
}

/// Progress event broadcast while a job runs. Receivers that lag are
/// allowed to miss events; the final report is authoritative.
#[derive(Debug, Clone)]
pub struct IngestProgress {
    pub job_id: Uuid,
    pub stage: IngestStage,
    pub message: String,
    pub current: usize,
    pub total: usize,
}

/// Counters summarizing one completed run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub job_id: Uuid,
    pub fresh_calls: usize,
    pub pdf_documents: usize,
    pub pdf_candidates: usize,
    pub total_pages: usize,
    pub ocr_pages: usize,
    pub chunks_indexed: usize,
    pub merged_calls: usize,
    /// Non-fatal failures, one message each.
    pub errors: Vec<String>,
    pub duration_ms: u128,
}

fn emit(
    progress: &Option<broadcast::Sender<IngestProgress>>,
    job_id: Uuid,
    stage: IngestStage,
    message: impl Into<String>,
    current: usize,
    total: usize,
) {
    if let Some(tx) = progress {
        // Send only fails with no receivers, which is fine for a batch run
        let _ = tx.send(IngestProgress {
            job_id,
            stage,
            message: message.into(),
            current,
            total,
        });
    }
}

/// Run the full pipeline once, as of today's date.
pub async fn run_ingest(
    job: &IngestJob,
    stub: &StubClient,
    embedder: &dyn Embedder,
    progress: Option<broadcast::Sender<IngestProgress>>,
) -> Result<IngestReport> {
    run_ingest_as_of(job, stub, embedder, progress, Utc::now().date_naive()).await
}

/// Run the pipeline with an explicit reference date. Statuses and the
/// stub year filter are computed against `today`.
pub async fn run_ingest_as_of(
    job: &IngestJob,
    stub: &StubClient,
    embedder: &dyn Embedder,
    progress: Option<broadcast::Sender<IngestProgress>>,
    today: NaiveDate,
) -> Result<IngestReport> {
    let started = Instant::now();
    let job_id = Uuid::new_v4();
    let mut report = IngestReport { job_id, ..Default::default() };

    info!(%job_id, pdf_dir = %job.pdf_dir.display(), "Ingestion started");
    std::fs::create_dir_all(&job.data_dir)
        .with_context(|| format!("creating data dir {}", job.data_dir.display()))?;

    // Stage 1: stub API. A down API degrades to an empty fresh list so
    // PDF-sourced data still refreshes.
    emit(&progress, job_id, IngestStage::FetchingApi, "Fetching call list", 0, 1);
    let api_records: Vec<CallRecord> = match stub.fetch_calls(today).await {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "Stub API fetch failed, continuing with PDFs only");
            report.errors.push(format!("stub API: {e}"));
            Vec::new()
        }
    };
    report.fresh_calls = api_records.len();

    write_json_artifact(&job.data_dir.join(FRESH_DEADLINES_FILE), &api_records)
        .context("writing fresh deadlines artifact")?;

    // Stage 2: PDFs. Extraction is CPU/subprocess bound and runs off the
    // async runtime; documents are processed in stable name order.
    let pdf_paths = list_pdfs(&job.pdf_dir, &mut report.errors);
    let extractor = PdfExtractor::new(job.ocr.clone());

    let mut candidates: Vec<PdfDeadlineCandidate> = Vec::new();
    let mut index = FlatIpIndex::new(embedder.dimension());
    let mut meta: Vec<ChunkMeta> = Vec::new();

    for (i, path) in pdf_paths.iter().enumerate() {
        emit(
            &progress,
            job_id,
            IngestStage::ExtractingPdfs,
            path.display().to_string(),
            i,
            pdf_paths.len(),
        );

        let extractor = extractor.clone();
        let task_path = path.clone();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&task_path))
            .await
            .context("PDF extraction task panicked")?;

        let doc = match extracted {
            Ok(doc) => doc,
            Err(e) => {
                error!(path = %path.display(), error = %e, "PDF extraction failed");
                report.errors.push(format!("{}: {e}", path.display()));
                continue;
            }
        };
        report.pdf_documents += 1;
        report.total_pages += doc.total_pages;
        report.ocr_pages += doc.ocr_pages;

        for deadline in mine_deadlines(&doc.text) {
            candidates.push(PdfDeadlineCandidate { code: doc.code.clone(), deadline });
        }

        // Stage 3 interleaved: chunk and embed this document's text.
        let chunks = chunk_text(&doc.text, job.chunk_size);
        if chunks.is_empty() {
            continue;
        }
        emit(
            &progress,
            job_id,
            IngestStage::Indexing,
            format!("{} ({} chunks)", doc.file_name, chunks.len()),
            i,
            pdf_paths.len(),
        );
        let vectors = embedder
            .embed_batch(&chunks)
            .await
            .with_context(|| format!("embedding {}", doc.file_name))?;
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            index.add(&vector)?;
            meta.push(ChunkMeta { text: chunk, source: doc.file_name.clone() });
        }
    }
    report.pdf_candidates = candidates.len();
    report.chunks_indexed = index.len();

    write_json_artifact(&job.data_dir.join(PDF_DEADLINES_FILE), &candidates)
        .context("writing pdf deadlines artifact")?;
    write_index_and_meta(&index, &meta, &job.index_path, &job.meta_path)
        .context("writing similarity index")?;

    // Stage 4: merge into the canonical dataset.
    emit(&progress, job_id, IngestStage::Merging, "Merging deadlines", 0, 1);
    let merged = merge_records(&candidates, &api_records, today);
    report.merged_calls = merged.len();
    write_json_artifact(&job.data_dir.join(MERGED_DEADLINES_FILE), &merged)
        .context("writing merged deadlines artifact")?;

    report.duration_ms = started.elapsed().as_millis();
    emit(&progress, job_id, IngestStage::Done, "Ingestion complete", 1, 1);
    info!(
        %job_id,
        fresh = report.fresh_calls,
        pdfs = report.pdf_documents,
        pages = report.total_pages,
        ocr_pages = report.ocr_pages,
        chunks = report.chunks_indexed,
        merged = report.merged_calls,
        errors = report.errors.len(),
        duration_ms = report.duration_ms,
        "Ingestion finished"
    );
    Ok(report)
}

/// List `*.pdf` files directly under `dir`, sorted by file name so runs
/// are reproducible. A missing directory is not fatal.
fn list_pdfs(dir: &std::path::Path, errors: &mut Vec<String>) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "PDF directory missing, skipping extraction");
            return Vec::new();
        }
        Err(e) => {
            errors.push(format!("{}: {e}", dir.display()));
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    paths.sort();
    paths
}
