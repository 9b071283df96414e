//! `wistia-ingest` entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wistia_ingest::api::{retry::DEFAULT_MAX_RETRIES, WistiaApiClient, DEFAULT_PER_PAGE};
use wistia_ingest::ingest::{run_ingestion, IngestConfig, IngestReport, DEFAULT_RAW_PREFIX};
use wistia_ingest::network::DEFAULT_API_URL;
use wistia_ingest::storage::{BlobStore, LocalDirStore, MemoryStore};

/// Land Wistia stats as raw JSON in a date-partitioned layout.
#[derive(Debug, Parser)]
#[command(name = "wistia-ingest", version, about)]
struct Cli {
    /// Wistia API token
    #[arg(long, env = "WISTIA_API_TOKEN", hide_env_values = true)]
    api_token: String,

    /// Stats API base URL
    #[arg(long, env = "WISTIA_BASE_URL", default_value = DEFAULT_API_URL)]
    base_url: String,

    /// Directory objects are written under
    #[arg(long, env = "WISTIA_OUTPUT_DIR", default_value = "./data")]
    output_dir: PathBuf,

    /// Leading key segments
    #[arg(long, env = "WISTIA_RAW_PREFIX", default_value = DEFAULT_RAW_PREFIX)]
    prefix: String,

    /// Media ids to fetch per-media stats for (repeatable or comma separated)
    #[arg(long = "media-id", env = "WISTIA_MEDIA_IDS", value_delimiter = ',')]
    media_ids: Vec<String>,

    /// Partition date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    run_date: Option<NaiveDate>,

    /// Page size for events and visitors
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page: u32,

    /// Attempts per request
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Fetch everything but keep it in memory instead of writing files
    #[arg(long)]
    dry_run: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Where a run's payloads end up.
enum Sink {
    Memory(MemoryStore),
    Local(LocalDirStore),
}

impl Sink {
    fn open(dry_run: bool, output_dir: PathBuf) -> Self {
        if dry_run {
            Sink::Memory(MemoryStore::new())
        } else {
            Sink::Local(LocalDirStore::new(output_dir))
        }
    }

    fn as_store(&self) -> &dyn BlobStore {
        match self {
            Sink::Memory(store) => store,
            Sink::Local(store) => store,
        }
    }
}

async fn run(cli: Cli) -> wistia_ingest::error::Result<IngestReport> {
    let client = WistiaApiClient::builder(cli.api_token)
        .base_url(cli.base_url)
        .timeout_secs(cli.timeout_secs)
        .max_retries(cli.max_retries)
        .build()?;

    let mut config = IngestConfig::new(cli.media_ids)
        .with_raw_prefix(cli.prefix)
        .with_per_page(cli.per_page);
    if let Some(date) = cli.run_date {
        config = config.with_run_date(date);
    }

    let sink = Sink::open(cli.dry_run, cli.output_dir);
    match &sink {
        Sink::Memory(_) => tracing::info!("Dry run, payloads are kept in memory"),
        Sink::Local(store) => {
            tracing::info!(output_dir = %store.root().display(), "Writing payloads to disk")
        }
    }

    run_ingestion(&client, sink.as_store(), &config).await
}

/// A missing `.env` is normal; anything else is worth reporting.
fn dotenv_failure(result: &dotenvy::Result<PathBuf>) -> Option<&dotenvy::Error> {
    match result {
        Err(err) if !err.not_found() => Some(err),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Some(err) = dotenv_failure(&dotenv) {
        tracing::warn!(error = %err, "Failed to load .env file");
    }

    match run(cli).await {
        Ok(report) => {
            println!("Wistia raw ingestion completed: {} objects", report.total());
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Ingestion failed");
            ExitCode::FAILURE
        }
    }
}
