//! OpenAlex works lookup.
//!
//! OpenAlex does not return abstracts as plain text; copyright constraints
//! mean works carry an *inverted index* mapping each word to the positions it
//! occupies. Reassembly is a sort by position.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::extract::normalize_abstract;
use crate::fetch::{API_REQUEST_TIMEOUT, FetchOutcome, HttpFetcher};

use super::{AbstractSource, source_schedule};

const DEFAULT_BASE_URL: &str = "https://api.openalex.org";

/// Abstract source backed by the OpenAlex works API.
#[derive(Debug)]
pub struct OpenAlex {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
}

impl OpenAlex {
    /// Creates a source against the public OpenAlex API.
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
impl AbstractSource for OpenAlex {
    fn name(&self) -> &'static str {
        "openalex"
    }

    async fn fetch_abstract(&self, doi: &str) -> FetchOutcome<String> {
        let url = format!("{}/works/doi:{doi}", self.base_url);
        let outcome = self
            .fetcher
            .fetch_json(&url, API_REQUEST_TIMEOUT, &source_schedule())
            .await;

        outcome
            .map(|body| {
                body.get("abstract_inverted_index")
                    .map(reassemble_inverted_index)
                    .unwrap_or_default()
            })
            .map(|text| {
                debug!(doi, chars = text.len(), "openalex lookup complete");
                normalize_abstract(&text)
            })
            .filter_non_empty()
    }
}

/// Rebuilds plain text from `{word: [positions...]}`.
///
/// Positions are globally unique across words; collecting `(position, word)`
/// pairs and sorting restores the original order. A malformed index (missing
/// or non-numeric positions) contributes nothing rather than erroring.
fn reassemble_inverted_index(index: &serde_json::Value) -> String {
    let Some(map) = index.as_object() else {
        return String::new();
    };

    let mut positioned: Vec<(u64, &str)> = Vec::new();
    for (word, positions) in map {
        let Some(positions) = positions.as_array() else {
            continue;
        };
        for position in positions {
            if let Some(position) = position.as_u64() {
                positioned.push((position, word.as_str()));
            }
        }
    }
    positioned.sort_unstable_by_key(|(position, _)| *position);

    let mut text = String::new();
    for (i, (_, word)) in positioned.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        text.push_str(word);
    }
    text
}
