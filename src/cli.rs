//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use paper_harvester::browser::DEFAULT_BROWSER_CONCURRENCY;
use paper_harvester::fetch::DEFAULT_HTTP_CONCURRENCY;
use paper_harvester::proxy::DEFAULT_POOL_SIZE;

/// Harvest paper abstracts for venue batch files.
///
/// Reads every batch file in the selected data directory, fetches missing
/// abstracts from metadata APIs and publisher pages, and writes updated
/// batches back in place.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// CCF tier of the venue set to process (a, b, c)
    #[arg(long, default_value = "b")]
    pub ccf: String,

    /// Publication classification (conf or journal)
    #[arg(long, default_value = "conf")]
    pub classification: String,

    /// Override the derived data directory (data/paper/{classification}_{ccf})
    #[arg(short = 'd', long)]
    pub data_dir: Option<PathBuf>,

    /// Maximum concurrent HTTP requests (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_HTTP_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Maximum concurrent browser sessions (1-20)
    #[arg(short = 'b', long, default_value_t = DEFAULT_BROWSER_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=20))]
    pub browser_concurrency: u8,

    /// Target proxy pool size (1-50)
    #[arg(short = 'p', long, default_value_t = DEFAULT_POOL_SIZE as u8, value_parser = clap::value_parser!(u8).range(1..=50))]
    pub proxy_pool_size: u8,

    /// Disable browser-based fetching entirely (API and plain HTTP only)
    #[arg(long)]
    pub no_browser: bool,

    /// Run the browser with a visible window (debugging)
    #[arg(long)]
    pub headed: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// The batch directory to process: the explicit override, or the
    /// conventional layout `data/paper/{classification}_{ccf}`.
    #[must_use]
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            PathBuf::from("data")
                .join("paper")
                .join(format!("{}_{}", self.classification, self.ccf))
        })
    }
}
