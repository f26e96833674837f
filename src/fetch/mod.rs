//! HTTP fetching with bounded concurrency, fixed retry schedules, and
//! per-attempt proxy rotation.
//!
//! This module provides the building blocks every network-facing component
//! shares:
//!
//! - [`FetchOutcome`] - explicit three-way result separating "legitimately
//!   missing" from "retry-worthy failure"
//! - [`FetchError`] - error taxonomy for a single exhausted fetch
//! - [`RetrySchedule`] - a fixed, ordered list of retry delays
//! - [`HttpFetcher`] - semaphore-gated client with proxy injection

mod error;
mod http;
mod outcome;
mod schedule;

pub use error::FetchError;
pub use http::HttpFetcher;
pub(crate) use http::USER_AGENT;
pub use outcome::FetchOutcome;
pub use schedule::RetrySchedule;

/// Default cap on concurrent HTTP requests.
pub const DEFAULT_HTTP_CONCURRENCY: usize = 20;

/// Per-attempt request timeout for structured metadata API calls.
pub const API_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(3600);

/// Per-attempt request timeout for publisher page fetches.
pub const PAGE_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(12);
