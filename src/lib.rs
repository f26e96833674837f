//! Paper Abstract Harvester Library
//!
//! This library fetches missing abstracts for batches of academic paper
//! records, combining structured metadata APIs with publisher page scraping
//! behind rotating proxies and headless-browser rendering.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`proxy`] - Rotating proxy pool with TTL leases
//! - [`fetch`] - Async HTTP fetching with fixed retry schedules
//! - [`browser`] - Headless-browser rendering for anti-bot protected sites
//! - [`extract`] - URL-dispatched abstract extraction from page HTML
//! - [`source`] - DOI-based metadata API sources
//! - [`batch`] - Batch file loading, statistics, and persistence
//! - [`pipeline`] - Per-record fallback chain and batch orchestration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod browser;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod proxy;
pub mod source;

// Re-export commonly used types
pub use batch::{BatchError, BatchFile, BatchStats, PaperRecord, StatsSnapshot};
pub use browser::{BrowserDriver, BrowserDriverConfig, BrowserError};
pub use extract::{ExtractorRegistry, FetchStrategy, normalize_abstract};
pub use fetch::{FetchError, FetchOutcome, HttpFetcher, RetrySchedule};
pub use pipeline::{FallbackChain, Orchestrator, OrchestratorError};
pub use proxy::{ProxyLease, ProxyPool, ProxyPoolConfig};
pub use source::{AbstractSource, default_source_chain};
