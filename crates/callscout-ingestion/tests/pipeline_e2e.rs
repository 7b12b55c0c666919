//! Pipeline run with an unreachable API and no documents: every artifact
//! must still be written, empty but well-formed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use callscout_embed::{Embedder, Result as EmbedResult};
use callscout_index::artifacts::{
    FRESH_DEADLINES_FILE, MERGED_DEADLINES_FILE, PDF_DEADLINES_FILE,
};
use callscout_index::{load_merged, read_index, read_meta};
use callscout_ingestion::pipeline::{run_ingest_as_of, IngestJob};
use callscout_ingestion::sources::stub::StubClient;
use callscout_ingestion::sources::{FetchError, SourceConfig};

/// Deterministic stand-in encoder: hashes characters into a fixed-width
/// vector. Good enough to exercise index plumbing without model weights.
struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 8];
                for (i, c) in t.chars().enumerate() {
                    v[i % 8] += (c as u32 % 97) as f32;
                }
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-9);
                v.iter().map(|x| x / norm).collect()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        8
    }
}

/// Author a one-page PDF with a real text layer.
fn write_text_pdf(path: &std::path::Path, text: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Serve one canned JSON response on a loopback port, then stop.
async fn serve_stub_once(body: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}/api/call/stub?owned=false")
}

fn unreachable_stub() -> StubClient {
    let config = SourceConfig {
        stub_url: "http://127.0.0.1:9/api/call/stub?owned=false".to_string(),
        detail_base_url: "http://127.0.0.1:9/api/call".to_string(),
        stub_timeout: Duration::from_millis(300),
        detail_timeout: Duration::from_millis(300),
    };
    StubClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_empty_run_writes_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let pdf_dir = dir.path().join("pdfs");
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&pdf_dir).unwrap();

    let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
    let job = IngestJob::new(pdf_dir, data_dir.clone());
    let report = run_ingest_as_of(&job, &unreachable_stub(), &FakeEmbedder, None, today)
        .await
        .unwrap();

    // The API failure is recorded, not fatal
    assert_eq!(report.fresh_calls, 0);
    assert_eq!(report.pdf_documents, 0);
    assert_eq!(report.chunks_indexed, 0);
    assert_eq!(report.merged_calls, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("stub API"));

    for file in [FRESH_DEADLINES_FILE, PDF_DEADLINES_FILE, MERGED_DEADLINES_FILE] {
        let body = std::fs::read_to_string(data_dir.join(file)).unwrap();
        assert_eq!(body.trim(), "[]", "{file} should be an empty array");
    }

    let index = read_index(&job.index_path).unwrap();
    assert_eq!(index.dim(), 8);
    assert_eq!(index.len(), 0);
    assert!(read_meta(&job.meta_path).unwrap().is_empty());

    let merged = load_merged(&data_dir.join(MERGED_DEADLINES_FILE), today).unwrap();
    assert!(merged.is_empty());
}

#[tokio::test]
async fn test_api_only_run_produces_merged_record() {
    let stub_url = serve_stub_once(
        r#"[{"Code": "PRIMA", "deadline_date": "2026-06-01", "call_title": "PRIMA 2026", "Budget": 50000, "Id": 1}]"#,
    )
    .await;
    let config = SourceConfig {
        stub_url,
        detail_base_url: "http://127.0.0.1:9/api/call".to_string(),
        stub_timeout: Duration::from_secs(5),
        detail_timeout: Duration::from_millis(300),
    };
    let stub = StubClient::new(&config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let pdf_dir = dir.path().join("pdfs");
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&pdf_dir).unwrap();

    let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
    let job = IngestJob::new(pdf_dir, data_dir.clone());
    let report = run_ingest_as_of(&job, &stub, &FakeEmbedder, None, today)
        .await
        .unwrap();

    assert_eq!(report.fresh_calls, 1);
    assert_eq!(report.merged_calls, 1);
    assert_eq!(report.chunks_indexed, 0);
    assert!(report.errors.is_empty());

    let fresh: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(data_dir.join(FRESH_DEADLINES_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(fresh[0]["code"], "PRIMA");

    let pdf_body = std::fs::read_to_string(data_dir.join(PDF_DEADLINES_FILE)).unwrap();
    assert_eq!(pdf_body.trim(), "[]");

    let merged: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(data_dir.join(MERGED_DEADLINES_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(merged[0]["code"], "PRIMA");
    assert_eq!(merged[0]["deadline"], "01 Jun 2026");
    assert_eq!(merged[0]["status"], "OPEN");
    assert_eq!(merged[0]["budget"], 50000.0);

    assert_eq!(read_index(&job.index_path).unwrap().len(), 0);
}

#[tokio::test]
async fn test_pdf_only_run_mines_and_indexes() {
    let dir = tempfile::tempdir().unwrap();
    let pdf_dir = dir.path().join("pdfs");
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&pdf_dir).unwrap();
    write_text_pdf(
        &pdf_dir.join("HORIZON.pdf"),
        "submission deadline 03/04/2025 for all consortium partners",
    );

    // Run date after the mined deadline, so the merged record is closed
    let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
    let job = IngestJob::new(pdf_dir, data_dir.clone());
    let report = run_ingest_as_of(&job, &unreachable_stub(), &FakeEmbedder, None, today)
        .await
        .unwrap();

    assert_eq!(report.fresh_calls, 0);
    assert_eq!(report.pdf_documents, 1);
    assert_eq!(report.pdf_candidates, 1);
    assert_eq!(report.total_pages, 1);
    assert_eq!(report.ocr_pages, 0, "text-layer page must not hit OCR");
    assert!(report.chunks_indexed > 0);
    assert_eq!(report.merged_calls, 1);

    let pdf: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(data_dir.join(PDF_DEADLINES_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(pdf[0]["code"], "HORIZON");
    assert_eq!(pdf[0]["deadline"], "03 Apr 2025");

    let merged: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(data_dir.join(MERGED_DEADLINES_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(merged[0]["code"], "HORIZON");
    assert_eq!(merged[0]["deadline"], "03 Apr 2025");
    assert_eq!(merged[0]["status"], "CLOSED");
    assert!(merged[0]["budget"].is_null());

    let index = read_index(&job.index_path).unwrap();
    let meta = read_meta(&job.meta_path).unwrap();
    assert_eq!(index.len(), meta.len());
    assert_eq!(index.len(), report.chunks_indexed);
    assert_eq!(meta[0].source, "HORIZON.pdf");
}

#[tokio::test]
async fn test_malformed_stub_payload_is_an_error() {
    let stub_url = serve_stub_once("deadline table coming soon").await;
    let config = SourceConfig {
        stub_url,
        detail_base_url: "http://127.0.0.1:9/api/call".to_string(),
        stub_timeout: Duration::from_secs(5),
        detail_timeout: Duration::from_millis(300),
    };
    let stub = StubClient::new(&config).unwrap();

    let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
    let err = stub.fetch_calls(today).await.unwrap_err();
    assert!(matches!(err, FetchError::Payload(_)));
}

#[tokio::test]
async fn test_missing_pdf_dir_still_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let job = IngestJob::new(dir.path().join("no-such-dir"), dir.path().join("data"));

    let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
    let report = run_ingest_as_of(&job, &unreachable_stub(), &FakeEmbedder, None, today)
        .await
        .unwrap();
    assert_eq!(report.pdf_documents, 0);
    assert!(job.index_path.exists());
    assert!(job.meta_path.exists());
}
