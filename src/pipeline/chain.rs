//! Per-record fallback chain.
//!
//! Two independent lookups per record: structured metadata sources tried in
//! priority order by DOI, then the publisher page named by the record's URL.
//! First non-empty abstract wins; everything downstream of a win receives
//! zero calls.

use std::sync::Arc;

use tracing::debug;

use crate::browser::{BrowserDriver, DEFAULT_MAX_RETRIES};
use crate::extract::{ExtractorRegistry, FetchStrategy, ResolvedExtractor, normalize_abstract};
use crate::fetch::{FetchOutcome, HttpFetcher, PAGE_REQUEST_TIMEOUT, RetrySchedule};
use crate::source::AbstractSource;

/// Ordered lookup over identifier sources and URL extractors.
pub struct FallbackChain {
    sources: Vec<Box<dyn AbstractSource>>,
    registry: ExtractorRegistry,
    fetcher: Arc<HttpFetcher>,
    browser: Option<Arc<BrowserDriver>>,
}

impl FallbackChain {
    /// Assembles a chain. A `None` browser disables browser-strategy
    /// extractors (their pages simply resolve to nothing).
    #[must_use]
    pub fn new(
        sources: Vec<Box<dyn AbstractSource>>,
        registry: ExtractorRegistry,
        fetcher: Arc<HttpFetcher>,
        browser: Option<Arc<BrowserDriver>>,
    ) -> Self {
        Self {
            sources,
            registry,
            fetcher,
            browser,
        }
    }

    /// Tries each identifier source in order; the first non-empty abstract
    /// wins and later sources are never invoked.
    ///
    /// A source failure (exhausted retries) is treated as absence for that
    /// source only - the chain moves on rather than aborting the record.
    pub async fn by_identifier(&self, doi: &str) -> Option<String> {
        for source in &self.sources {
            match source.fetch_abstract(doi).await {
                FetchOutcome::Value(text) => {
                    debug!(doi, source = source.name(), "abstract found via identifier");
                    return Some(text);
                }
                FetchOutcome::Absent => {
                    debug!(doi, source = source.name(), "source has no abstract");
                }
                FetchOutcome::Failed(e) => {
                    debug!(doi, source = source.name(), error = %e, "source lookup failed");
                }
            }
        }
        None
    }

    /// Resolves the URL to an extractor via the registry, fetches the page
    /// per the extractor's strategy, and extracts.
    ///
    /// Returns `None` both for unresolved URLs (no matching rule) and for
    /// pages where the extractor finds nothing.
    pub async fn by_url(&self, url: &str, venue_tag: &str) -> Option<String> {
        let Some(resolved) = self.registry.resolve(url, venue_tag) else {
            debug!(url, venue_tag, "no extractor for url, leaving unresolved");
            return None;
        };

        let abstract_text = match &resolved.strategy {
            FetchStrategy::Http => self.extract_via_http(url, &resolved).await,
            FetchStrategy::Browser { ready_selectors } => {
                self.extract_via_browser(url, ready_selectors, &resolved).await
            }
            FetchStrategy::HttpThenBrowser => {
                // Static response first; escalate to a full render only when
                // the markup is missing from it.
                match self.extract_via_http(url, &resolved).await {
                    Some(text) => Some(text),
                    None => self.extract_via_browser(url, &[], &resolved).await,
                }
            }
        };

        if let Some(text) = &abstract_text {
            debug!(
                url,
                extractor = resolved.extractor.name(),
                chars = text.len(),
                "abstract found via url"
            );
        }
        abstract_text
    }

    async fn extract_via_http(&self, url: &str, resolved: &ResolvedExtractor) -> Option<String> {
        let html = self
            .fetcher
            .fetch_text(url, PAGE_REQUEST_TIMEOUT, &RetrySchedule::page())
            .await
            .into_option()?;
        resolved
            .extractor
            .extract(&html)
            .map(|text| normalize_abstract(&text))
    }

    async fn extract_via_browser(
        &self,
        url: &str,
        ready_selectors: &[&str],
        resolved: &ResolvedExtractor,
    ) -> Option<String> {
        let browser = self.browser.as_ref()?;
        let html = browser
            .render_page(url, ready_selectors, DEFAULT_MAX_RETRIES)
            .await?;
        resolved
            .extractor
            .extract(&html)
            .map(|text| normalize_abstract(&text))
    }
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackChain")
            .field("sources", &self.sources.len())
            .field("browser", &self.browser.is_some())
            .finish_non_exhaustive()
    }
}
