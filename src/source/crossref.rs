//! Crossref works lookup.

use std::sync::Arc;

use async_trait::async_trait;

use crate::extract::normalize_abstract;
use crate::fetch::{API_REQUEST_TIMEOUT, FetchOutcome, HttpFetcher};

use super::{AbstractSource, source_schedule};

const DEFAULT_BASE_URL: &str = "https://api.crossref.org";

/// Abstract source backed by the Crossref REST API.
///
/// Crossref abstracts arrive as JATS XML fragments
/// (`<jats:p>...</jats:p>`); normalization strips the markup.
#[derive(Debug)]
pub struct Crossref {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
}

impl Crossref {
    /// Creates a source against the public Crossref API.
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
impl AbstractSource for Crossref {
    fn name(&self) -> &'static str {
        "crossref"
    }

    async fn fetch_abstract(&self, doi: &str) -> FetchOutcome<String> {
        let url = format!("{}/works/{doi}", self.base_url);
        self.fetcher
            .fetch_json(&url, API_REQUEST_TIMEOUT, &source_schedule())
            .await
            .map(|body| {
                body.pointer("/message/abstract")
                    .and_then(serde_json::Value::as_str)
                    .map(normalize_abstract)
                    .unwrap_or_default()
            })
            .filter_non_empty()
    }
}
