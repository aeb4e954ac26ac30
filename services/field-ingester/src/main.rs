//! Field scene ingester.
//!
//! Periodic batch job that fetches the latest satellite indices for every
//! field and persists scene + reading rows. Runs once with `--once` or
//! polls on an interval. Individual field failures are recorded and never
//! abort the batch.

mod batch;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use batch::{BatchProcessor, CatalogSink, PipelineSceneSource};
use pipeline::FieldIndexService;
use providers::ProviderSettings;
use storage::Catalog;

#[derive(Parser, Debug)]
#[command(name = "field-ingester")]
#[command(about = "Batch processor for satellite field indices")]
struct Args {
    /// Run one batch and exit (vs continuous polling)
    #[arg(long)]
    once: bool,

    /// Batch date, YYYY-MM-DD (default: today UTC)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Days back from the batch date to search for scenes
    #[arg(long, default_value = "30")]
    lookback_days: i64,

    /// Polling interval in seconds
    #[arg(long, env = "INGEST_INTERVAL_SECS", default_value = "86400")]
    interval_secs: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting field ingester");

    let catalog = Catalog::connect(&args.database_url)
        .await
        .context("Database connection failed")?;
    catalog.migrate().await.context("Migration failed")?;

    let settings = ProviderSettings::from_env();
    let service = FieldIndexService::new(&settings);

    let processor = BatchProcessor::new(
        PipelineSceneSource::new(service, args.lookback_days),
        CatalogSink::new(catalog.clone()),
    );

    if args.once {
        run_batch(&catalog, &processor, args.date).await?;
        return Ok(());
    }

    info!(interval_secs = args.interval_secs, "Starting continuous polling");
    loop {
        if let Err(e) = run_batch(&catalog, &processor, args.date).await {
            tracing::error!(error = %e, "Batch run failed");
        }

        tokio::time::sleep(std::time::Duration::from_secs(args.interval_secs)).await;
    }
}

async fn run_batch(
    catalog: &Catalog,
    processor: &BatchProcessor<PipelineSceneSource, CatalogSink>,
    date: Option<NaiveDate>,
) -> Result<()> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());

    let fields = catalog
        .list_fields()
        .await
        .context("Listing fields failed")?;
    info!(count = fields.len(), date = %date, "Loaded fields for batch");

    let summary = processor.process_fields(&fields, date).await;

    info!(
        processed = summary.processed,
        inserted = summary.inserted,
        skipped = summary.skipped,
        failed = summary.failed,
        "Ingestion batch finished"
    );

    Ok(())
}
