//! Binary entry point: tracing setup, configuration, and job dispatch.
//!
//! ## Usage
//!
//! ```sh
//! hn_digest ingest      # fetch + extract + persist new stories
//! hn_digest summarize   # summarize stored stories missing a summary
//! hn_digest run         # both, in order
//! ```
//!
//! Periodic invocation is left to an external scheduler (cron, a systemd
//! timer); every subcommand is a single run that exits when its batch
//! reaches a terminal state.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use hn_digest::cli::{Cli, Command};
use hn_digest::extract::ContentExtractor;
use hn_digest::hn::HnClient;
use hn_digest::ingest::IngestionPipeline;
use hn_digest::llm::OllamaClient;
use hn_digest::rules::RuleSet;
use hn_digest::store::Store;
use hn_digest::summarize::SummarizationPipeline;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    info!(db = %args.db_path, command = ?args.command, "hn_digest starting up");

    // Rule sets and the store are built once and shared by reference;
    // a restart is required to pick up rule edits.
    let blacklist = Arc::new(RuleSet::load(&args.blacklist_files));
    let priority_rules = Arc::new(RuleSet::load(std::slice::from_ref(&args.priority_rules)));
    let store = Store::open(&args.db_path)?;

    match args.command {
        Command::Ingest => run_ingest(&args, &store, &blacklist, &priority_rules).await?,
        Command::Summarize => run_summarize(&args, &store).await?,
        Command::Run => {
            run_ingest(&args, &store, &blacklist, &priority_rules).await?;
            run_summarize(&args, &store).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "execution complete"
    );
    Ok(())
}

async fn run_ingest(
    args: &Cli,
    store: &Store,
    blacklist: &Arc<RuleSet>,
    priority_rules: &Arc<RuleSet>,
) -> Result<(), Box<dyn Error>> {
    let timeout = Duration::from_secs(args.http_timeout_secs);
    let source = HnClient::new(&args.source_url, timeout)?;
    let extractor = ContentExtractor::new(Arc::clone(blacklist), timeout)?;

    let pipeline = IngestionPipeline::new(
        source,
        extractor,
        Arc::clone(blacklist),
        Arc::clone(priority_rules),
        store.clone(),
        args.workers,
    );
    let report = pipeline.run().await?;
    info!(
        discovered = report.discovered,
        skipped_existing = report.skipped_existing,
        blacklisted = report.blacklisted,
        persisted = report.persisted,
        duplicates = report.duplicates,
        failed = report.failed,
        "ingestion finished"
    );
    Ok(())
}

async fn run_summarize(args: &Cli, store: &Store) -> Result<(), Box<dyn Error>> {
    let generator = OllamaClient::new(
        &args.llm_url,
        &args.llm_model,
        Duration::from_secs(args.llm_timeout_secs),
    )?;

    let pipeline = SummarizationPipeline::new(generator, store.clone(), args.workers);
    let report = pipeline.run().await?;
    info!(
        candidates = report.candidates,
        summarized = report.summarized,
        failed = report.failed,
        "summarization finished"
    );
    Ok(())
}
