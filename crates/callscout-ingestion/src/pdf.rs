//! PDF text extraction with OCR fallback.
//!
//! Each page first goes through lopdf's text-layer extraction. Scanned
//! pages have no text layer, so an empty page falls back to OCR: render
//! with `pdftoppm` at a fixed resolution, then run `tesseract` with the
//! bilingual Greek+English model. OCR is by far the most expensive step,
//! so per-document page counts are tracked for operational visibility.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use callscout_common::normalize_code;

/// OCR settings; rendering resolution and tesseract language pack.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub dpi: u32,
    pub languages: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            languages: "ell+eng".to_string(),
        }
    }
}

/// One fully extracted PDF document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Programme code derived from the file stem.
    pub code: String,
    /// Original file name, recorded as chunk provenance.
    pub file_name: String,
    /// All pages' text joined with newlines.
    pub text: String,
    pub total_pages: usize,
    pub ocr_pages: usize,
}

/// Synchronous PDF extractor; callers run it on a blocking thread.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    pub ocr: OcrConfig,
}

impl PdfExtractor {
    pub fn new(ocr: OcrConfig) -> Self {
        Self { ocr }
    }

    /// Extract one document's full text, page by page.
    pub fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .with_context(|| format!("bad PDF file name: {}", path.display()))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("bad PDF file stem: {}", path.display()))?;

        let doc = lopdf::Document::load(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let mut pages_text = Vec::with_capacity(page_numbers.len());
        let mut ocr_pages = 0;

        for page_no in &page_numbers {
            let layer = doc.extract_text(&[*page_no]).unwrap_or_default();
            let layer = layer.trim();

            if !layer.is_empty() {
                pages_text.push(layer.to_string());
                continue;
            }

            // No text layer on this page; fall back to OCR.
            ocr_pages += 1;
            match self.ocr_page(path, *page_no) {
                Ok(text) => pages_text.push(text),
                Err(e) => {
                    // An unreadable page costs its text, not the document
                    warn!(file = %file_name, page = page_no, error = %e, "OCR failed");
                    pages_text.push(String::new());
                }
            }
        }

        debug!(
            file = %file_name,
            pages = page_numbers.len(),
            ocr_pages,
            "PDF extracted"
        );

        Ok(ExtractedDocument {
            code: normalize_code(stem),
            file_name,
            text: pages_text.join("\n"),
            total_pages: page_numbers.len(),
            ocr_pages,
        })
    }

    /// Render a single page to an image and OCR it.
    fn ocr_page(&self, pdf_path: &Path, page_no: u32) -> Result<String> {
        let dir = tempfile::tempdir().context("creating OCR scratch dir")?;
        let prefix = dir.path().join("page");

        let render = Command::new("pdftoppm")
            .arg("-png")
            .arg("-singlefile")
            .args(["-r", &self.ocr.dpi.to_string()])
            .args(["-f", &page_no.to_string()])
            .args(["-l", &page_no.to_string()])
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .context("spawning pdftoppm (is poppler-utils installed?)")?;
        if !render.status.success() {
            bail!(
                "pdftoppm failed on page {page_no}: {}",
                String::from_utf8_lossy(&render.stderr).trim()
            );
        }

        let image = prefix.with_extension("png");
        let ocr = Command::new("tesseract")
            .arg(&image)
            .arg("stdout")
            .args(["-l", &self.ocr.languages])
            .output()
            .context("spawning tesseract (is it installed with ell+eng data?)")?;
        if !ocr.status.success() {
            bail!(
                "tesseract failed on page {page_no}: {}",
                String::from_utf8_lossy(&ocr.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&ocr.stdout).trim().to_string())
    }
}
