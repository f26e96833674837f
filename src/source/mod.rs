//! Identifier-based abstract sources.
//!
//! Each source answers one question: given a DOI, does this metadata service
//! hold an abstract for it? Sources are tried in order by the fallback chain
//! and the first non-empty answer wins, so each implementation keeps its
//! retry budget short ([`RetrySchedule::probe`]) - the next source is usually
//! a better bet than hammering the current one.

mod crossref;
mod openalex;
mod semantic_scholar;

use std::sync::Arc;

use async_trait::async_trait;

pub use crossref::Crossref;
pub use openalex::OpenAlex;
pub use semantic_scholar::SemanticScholar;

use crate::fetch::{FetchOutcome, HttpFetcher, RetrySchedule};

/// A metadata service that can be queried for an abstract by DOI.
#[async_trait]
pub trait AbstractSource: Send + Sync {
    /// Short stable name used in logs and summaries.
    fn name(&self) -> &'static str;

    /// Looks up the abstract for `doi`.
    ///
    /// Returns `Absent` both for a 404 and for a well-formed record with no
    /// abstract field; either way this source has nothing and the chain
    /// should move on.
    async fn fetch_abstract(&self, doi: &str) -> FetchOutcome<String>;
}

/// The default lookup order: OpenAlex first (best abstract coverage for CS
/// venues), then Crossref. Semantic Scholar is available but kept out of the
/// default chain; its unauthenticated rate limits stall batches.
#[must_use]
pub fn default_source_chain(fetcher: Arc<HttpFetcher>) -> Vec<Box<dyn AbstractSource>> {
    vec![
        Box::new(OpenAlex::new(Arc::clone(&fetcher))),
        Box::new(Crossref::new(fetcher)),
    ]
}

/// Retry schedule shared by all chain sources.
pub(crate) fn source_schedule() -> RetrySchedule {
    RetrySchedule::probe()
}
