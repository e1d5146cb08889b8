//! puckstat-ingest - NHL statistics scraper
//!
//! Runs one scrape pass over every enabled source and exits. The exit code is non-zero
//! only when the pass ends Failed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use puckstat_common::config::load_or_default;
use puckstat_common::db::init_database;
use puckstat_ingest::config::{CliOverrides, IngestConfig};
use puckstat_ingest::db::Repository;
use puckstat_ingest::models::{FailureStage, PassReport};
use puckstat_ingest::services::Orchestrator;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for puckstat-ingest
#[derive(Parser, Debug)]
#[command(name = "puckstat-ingest")]
#[command(about = "Scrape NHL statistics sources into SQLite")]
#[command(version)]
struct Args {
    /// Path to puckstat.toml
    #[arg(short, long, env = "PUCKSTAT_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "PUCKSTAT_DATABASE")]
    database: Option<PathBuf>,

    /// Season to scrape (e.g. 20242025)
    #[arg(short, long)]
    season: Option<String>,

    /// Only scrape these sources (repeatable)
    #[arg(long = "source")]
    sources: Vec<String>,

    /// Stop collecting after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Print row counts per table and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_or_default(args.config.as_deref()).context("Failed to load config")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting puckstat-ingest {} ({}, {} build, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    let cli = CliOverrides {
        database: args.database,
        season: args.season,
        sources: args.sources,
        deadline_secs: args.deadline_secs,
    };
    let config = IngestConfig::resolve(&toml_config, &cli).context("Invalid configuration")?;

    info!("Database: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let repository = Repository::new(pool);

    if args.stats {
        let counts = repository.counts().await.context("Failed to count rows")?;
        for (kind, count) in counts {
            println!("{:<16} {}", kind.table_name(), count);
        }
        return Ok(());
    }

    info!(
        season = %config.season,
        sources = ?config.enabled_sources().map(|(id, _)| id).collect::<Vec<_>>(),
        "Configuration resolved"
    );

    let orchestrator =
        Orchestrator::from_config(&config, repository).context("Failed to set up sources")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, stopping pass");
            on_interrupt.cancel();
        }
    });

    let report = orchestrator.run(cancel).await;
    print_summary(&report);

    std::process::exit(report.exit_code());
}

fn print_summary(report: &PassReport) {
    println!(
        "Pass {} {:?}{}",
        report.pass_id,
        report.state,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    for source in &report.sources {
        println!(
            "  {:<12} targets ok={} failed={}  records={} rejected={}  inserted={} updated={} unchanged={} persist_failed={}",
            source.source,
            source.targets_succeeded,
            source.targets_failed,
            source.records_produced,
            source.records_rejected,
            source.inserted,
            source.updated,
            source.unchanged,
            source.persist_failed,
        );
    }
    for stage in [FailureStage::Fetch, FailureStage::Parse, FailureStage::Persist] {
        let count = report.failures_at(stage).count();
        if count > 0 {
            println!("  {} failures: {}", stage, count);
        }
    }
    if !report.failures.is_empty() {
        println!("Failures:");
        for failure in &report.failures {
            println!("  {}", failure);
        }
    }
    let fully_failed = report.sources_fully_failed();
    if !fully_failed.is_empty() {
        println!("Sources that produced nothing: {}", fully_failed.join(", "));
    }
}
