//! CallScout — funding-call ingestion and retrieval.
//! Entry point for the command-line binary.

mod config;

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use callscout_embed::{Embedder, EmbeddingConfig, SentenceEmbedder};
use callscout_index::artifacts::MERGED_DEADLINES_FILE;
use callscout_index::{load_merged, SearchContext, DEFAULT_TOP_K, MIN_SCORE};
use callscout_ingestion::pdf::OcrConfig;
use callscout_ingestion::pipeline::{run_ingest, IngestJob};
use callscout_ingestion::sources::{SourceConfig, StubClient};

#[derive(Parser)]
#[command(name = "callscout", version, about = "Funding-call deadline tracker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild all artifacts: fetch the API, extract PDFs, reindex, merge
    Ingest {
        /// Directory of call PDFs, overrides the config file
        #[arg(long)]
        pdf_dir: Option<std::path::PathBuf>,
        /// Output directory for artifacts, overrides the config file
        #[arg(long)]
        data_dir: Option<std::path::PathBuf>,
    },
    /// Query the similarity index over extracted call documents
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        #[arg(long, default_value_t = MIN_SCORE)]
        min_score: f32,
    },
    /// Print the merged deadline table
    Deadlines,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("callscout=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;

    match cli.command {
        Command::Ingest { pdf_dir, data_dir } => {
            let mut job = IngestJob::new(
                pdf_dir.unwrap_or_else(|| config.paths.pdf_dir.clone()),
                data_dir.unwrap_or_else(|| config.paths.data_dir.clone()),
            );
            job.chunk_size = config.chunking.chunk_size;
            job.ocr = OcrConfig {
                dpi: config.ocr.dpi,
                languages: config.ocr.languages.clone(),
            };

            let sources = SourceConfig {
                stub_url: config.api.stub_url.clone(),
                detail_base_url: config.api.detail_base_url.clone(),
                stub_timeout: Duration::from_secs(config.api.stub_timeout_secs),
                detail_timeout: Duration::from_secs(config.api.detail_timeout_secs),
            };
            let stub = StubClient::new(&sources)?;
            let embedder = build_embedder(&config).await?;

            let report = run_ingest(&job, &stub, &embedder, None).await?;
            info!(
                fresh = report.fresh_calls,
                pdfs = report.pdf_documents,
                chunks = report.chunks_indexed,
                merged = report.merged_calls,
                "Ingestion run complete"
            );
            for error in &report.errors {
                eprintln!("warning: {error}");
            }
            println!(
                "{} calls merged, {} chunks indexed ({} of {} pages via OCR) in {} ms",
                report.merged_calls,
                report.chunks_indexed,
                report.ocr_pages,
                report.total_pages,
                report.duration_ms
            );
        }

        Command::Search { query, top_k, min_score } => {
            let job = IngestJob::new(config.paths.pdf_dir.clone(), config.paths.data_dir.clone());
            let ctx = SearchContext::load(&job.index_path, &job.meta_path)
                .context("loading the similarity index (run `callscout ingest` first)")?;

            let embedder = build_embedder(&config).await?;
            let vector = embedder.embed_one(&query).await?;
            let hits = ctx.search(&vector, top_k, min_score)?;

            if hits.is_empty() {
                println!("No matching call documents.");
            }
            for hit in hits {
                println!("[{:.3}] {}\n{}\n", hit.score, hit.source, hit.text);
            }
        }

        Command::Deadlines => {
            let path = config.paths.data_dir.join(MERGED_DEADLINES_FILE);
            let today = chrono::Utc::now().date_naive();
            let rows = load_merged(&path, today)?;
            if rows.is_empty() {
                println!("No merged deadlines yet (run `callscout ingest` first).");
            }
            for row in rows {
                let budget = row
                    .budget
                    .map(|b| format!("{b:.2} EUR"))
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<30} {:<12} {:<7} {}", row.code, row.deadline, row.status.as_str(), budget);
            }
        }
    }

    Ok(())
}

async fn build_embedder(config: &config::Config) -> anyhow::Result<SentenceEmbedder> {
    let embed_config = if config.embedding.use_gpu {
        EmbeddingConfig::default()
    } else {
        EmbeddingConfig::cpu()
    }
    .with_model(config.embedding.model_id.clone())
    .with_batch_size(config.embedding.batch_size);

    Ok(SentenceEmbedder::new(embed_config).await?)
}
