//! CLI entry point for the abstract harvester.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use paper_harvester::browser::{BrowserDriver, BrowserDriverConfig};
use paper_harvester::extract::ExtractorRegistry;
use paper_harvester::fetch::HttpFetcher;
use paper_harvester::pipeline::{FallbackChain, Orchestrator};
use paper_harvester::proxy::{ProxyPool, ProxyPoolConfig};
use paper_harvester::source::default_source_chain;

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Abstract harvester starting");

    let data_dir = args.resolved_data_dir();
    if !data_dir.is_dir() {
        anyhow::bail!("data directory does not exist: {}", data_dir.display());
    }
    info!(data_dir = %data_dir.display(), "processing batches");

    // Shared proxy pool; drops to direct egress when no endpoint is
    // configured in the environment.
    let proxy_pool = Arc::new(
        ProxyPool::new(ProxyPoolConfig::from_env(usize::from(args.proxy_pool_size))).await,
    );

    let fetcher = Arc::new(
        HttpFetcher::new(usize::from(args.concurrency), Arc::clone(&proxy_pool))
            .context("failed to construct HTTP fetcher")?,
    );

    // Browser startup failure degrades to HTTP-only rather than aborting:
    // most records resolve through the metadata APIs anyway.
    let browser = if args.no_browser {
        info!("browser fetching disabled by flag");
        None
    } else {
        let config = BrowserDriverConfig {
            headless: !args.headed,
            max_concurrent: usize::from(args.browser_concurrency),
            ..BrowserDriverConfig::default()
        };
        match BrowserDriver::launch(config, Arc::clone(&proxy_pool)).await {
            Ok(driver) => Some(Arc::new(driver)),
            Err(e) => {
                warn!(error = %e, "browser unavailable, continuing with HTTP only");
                None
            }
        }
    };

    let chain = FallbackChain::new(
        default_source_chain(Arc::clone(&fetcher)),
        ExtractorRegistry::new(),
        fetcher,
        browser.clone(),
    );

    let orchestrator = Orchestrator::new(Arc::new(chain), !args.quiet);
    let totals = orchestrator
        .process_dir(&data_dir)
        .await
        .context("batch run failed")?;

    // The chain holds the other browser handle; drop it so the driver can
    // be reclaimed and shut down cleanly.
    drop(orchestrator);
    if let Some(driver) = browser {
        if let Ok(driver) = Arc::try_unwrap(driver) {
            driver.close().await;
        }
    }

    info!(
        total = totals.total_records,
        fetched = totals.fetched,
        failed = totals.failed,
        already_had = totals.already_had_abstract,
        missing_identifiers = totals.missing_identifiers,
        "Harvest complete"
    );

    Ok(())
}
