//! market-feed CLI
//!
//! Runs one configured feed, or every feed when no id is given.

use std::env;

use clap::Parser;
use market_feed::{
    error::Result,
    models::Config,
    pipeline,
    services::{CatalogScraper, RssFileSink},
    storage::LocalStorage,
};

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "MARKET_FEED_CONFIG";
const DEFAULT_CONFIG: &str = "feeds.toml";

/// market-feed - Marketplace search results as RSS
#[derive(Parser, Debug)]
#[command(
    name = "market-feed",
    version,
    about = "Tracks marketplace search results and republishes them as RSS feeds"
)]
struct Cli {
    /// Feed id to run (runs every configured feed when omitted)
    feed: Option<String>,
}

/// Initialize logging, honouring RUST_LOG.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config_path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = Config::load_or_default(&config_path);
    config.validate()?;

    log::info!("Loaded {} feeds from {}", config.feeds.len(), config_path);

    let storage = LocalStorage::new(".");
    let sink = RssFileSink::new(storage.clone());
    let scraper = CatalogScraper::new(&config.scraper)?;

    match cli.feed {
        Some(id) => {
            let feed = config.feed(&id)?.clone();
            if let Err(e) = pipeline::run_feed(&config, feed, &scraper, &storage, &sink).await {
                log::error!("Feed {} failed: {}", id, e);
            }
        }
        None => {
            let summary = pipeline::run_all(&config, &scraper, &storage, &sink).await;
            for report in &summary.reports {
                log::debug!("{:?}", report);
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
