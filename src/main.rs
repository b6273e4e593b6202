mod config;
mod error;
mod filter;
mod models;
mod notify;
mod pipeline;
mod scrapers;
mod store;

use anyhow::Context;
use clap::Parser;
use config::{Config, FetcherKind};
use filter::AvailabilityFilter;
use notify::{Notifier, TwilioNotifier};
use pipeline::Scout;
use scrapers::{BrowserFetcher, DocumentFetcher, HttpFetcher, SearchOrchestrator};
use std::path::PathBuf;
use store::SheetStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Finds new rental listings that free up far enough ahead")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "scout.json")]
    config: PathBuf,

    /// Write to this ledger instead of the configured one
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Override the configured lead time, in weeks
    #[arg(short, long)]
    lead_time_weeks: Option<u32>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("🏠 Rental Scout");

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(store) = args.store {
        config.store_path = store;
    }
    if let Some(weeks) = args.lead_time_weeks {
        config.lead_time_weeks = Some(weeks);
    }

    let fetcher: Box<dyn DocumentFetcher> = match config.fetcher {
        FetcherKind::Http => Box::new(HttpFetcher::new(config.timeout)?),
        FetcherKind::Browser => Box::new(BrowserFetcher::new()?),
    };

    let orchestrator = SearchOrchestrator::new(
        fetcher,
        config.base_url.clone(),
        config.search_path.clone(),
        config.filters.clone(),
    )?
    .with_request_delay(config.request_delay);

    let store = SheetStore::open(&config.store_path)
        .await
        .with_context(|| format!("Failed to open {}", config.store_path.display()))?;
    info!("Ledger {} holds {} listings", config.store_path.display(), store.len());

    let notifier = match config.notification.clone() {
        Some(options) => {
            Some(Box::new(TwilioNotifier::new(options, config.timeout)?) as Box<dyn Notifier>)
        }
        None => None,
    };

    let mut scout = Scout::new(
        orchestrator,
        AvailabilityFilter::new(config.lead_time_weeks),
        Box::new(store),
        notifier,
    );

    let today = chrono::Local::now().date_naive();
    let summary = scout
        .run(&config.locations, today)
        .await
        .context("Run aborted")?;

    println!("\n{summary}");
    Ok(())
}
