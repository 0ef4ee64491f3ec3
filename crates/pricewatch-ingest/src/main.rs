//! Pricewatch ingest - batch ingestion tool

use anyhow::Result;
use clap::Parser;
use pricewatch_common::logging::{init_logging, LogConfig, LogLevel};
use pricewatch_ingest::{load_batch, Config, IngestionPipeline};
use pricewatch_store::{
    create_pool, run_migrations, EventLog, FileStore, PgEventLog, PgFileStore, PgRecordStore,
    RecordStore,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pricewatch-ingest")]
#[command(author, version, about = "Pricewatch batch ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Ingest one extraction batch
    Run {
        /// Path to the batch manifest JSON
        #[arg(short, long)]
        batch: PathBuf,
    },

    /// Apply database migrations and exit
    Migrate,

    /// Print store and event-log statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::from_env()
        .unwrap_or_default()
        .with_level(log_level)
        .with_file_prefix("pricewatch-ingest");
    init_logging(&log_config)?;

    let config = Config::load()?;
    let pool = create_pool(&config.db).await?;

    match cli.command {
        Command::Run { batch } => {
            run_migrations(&pool).await?;

            let extraction = load_batch(&batch, &config.downloads_dir)?;
            let pipeline = IngestionPipeline::new(
                PgRecordStore::new(pool.clone()),
                PgFileStore::new(pool.clone()),
                PgEventLog::new(pool.clone()),
            );

            let report = pipeline.run(&extraction).await?;
            info!(
                run_id = %report.run_id,
                affected = report.stats.affected(),
                failed = report.stats.failed(),
                success_rate = format!("{:.1}%", report.stats.success_rate()),
                "Batch ingested"
            );
        }
        Command::Migrate => {
            run_migrations(&pool).await?;
        }
        Command::Stats => {
            let records = PgRecordStore::new(pool.clone());
            let files = PgFileStore::new(pool.clone());
            let events = PgEventLog::new(pool.clone());

            let record_stats = records.aggregate_stats().await?;
            let file_stats = files.aggregate_stats().await?;
            let event_summary = events.summary_last_24h().await?;

            println!(
                "Records: {} active, {} inactive, {} categories",
                record_stats.active_count,
                record_stats.inactive_count,
                record_stats.distinct_category_count
            );
            match record_stats.average_price {
                Some(avg) => println!("Average active price: {avg}"),
                None => println!("Average active price: n/a"),
            }
            println!(
                "Files: {} stored, {} bytes, {} mime types",
                file_stats.total_count,
                file_stats.total_size_bytes,
                file_stats.distinct_mime_type_count
            );
            println!(
                "Runs in last 24h: {} total ({} ok, {} failed)",
                event_summary.total, event_summary.successful, event_summary.failed
            );
        }
    }

    Ok(())
}
