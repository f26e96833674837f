//! Semantic Scholar paper lookup.
//!
//! Not part of the default chain: the unauthenticated API rate-limits
//! aggressively enough to stall whole batches. Kept available for runs with
//! small record counts or partner API keys.

use std::sync::Arc;

use async_trait::async_trait;

use crate::extract::normalize_abstract;
use crate::fetch::{API_REQUEST_TIMEOUT, FetchOutcome, HttpFetcher};

use super::{AbstractSource, source_schedule};

const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org";

/// Abstract source backed by the Semantic Scholar paper API.
#[derive(Debug)]
pub struct SemanticScholar {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
}

impl SemanticScholar {
    /// Creates a source against the public Semantic Scholar API.
    #[must_use]
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self::with_base_url(fetcher, DEFAULT_BASE_URL)
    }

    /// Creates a source against a custom base URL (used by tests).
    #[must_use]
    pub fn with_base_url(fetcher: Arc<HttpFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AbstractSource for SemanticScholar {
    fn name(&self) -> &'static str {
        "semantic_scholar"
    }

    async fn fetch_abstract(&self, doi: &str) -> FetchOutcome<String> {
        let url = format!("{}/v1/paper/{doi}", self.base_url);
        self.fetcher
            .fetch_json(&url, API_REQUEST_TIMEOUT, &source_schedule())
            .await
            .map(|body| {
                body.get("abstract")
                    .and_then(serde_json::Value::as_str)
                    .map(normalize_abstract)
                    .unwrap_or_default()
            })
            .filter_non_empty()
    }
}
