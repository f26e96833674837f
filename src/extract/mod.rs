//! Abstract extraction from publisher pages.
//!
//! # Overview
//!
//! Publisher sites embed abstracts in wildly different markup. This module
//! keeps the site-specific knowledge as *data* (CSS selectors, heading
//! markers) behind a small pure-function contract, and centralizes the part
//! that actually matters to the pipeline: which extractor handles which URL,
//! and how the page should be fetched in the first place.
//!
//! An [`Extractor`] is a pure function over already-fetched HTML. The
//! [`ExtractorRegistry`] maps a URL (or, for DOI-resolver links, a venue
//! tag) to an extractor plus a [`FetchStrategy`] describing how to obtain
//! the HTML.

mod registry;
mod site;

use std::sync::LazyLock;

use regex::Regex;

pub use registry::{ExtractorRegistry, FetchStrategy, ResolvedExtractor};
pub use site::{HeadingSiblingExtractor, SelectorExtractor};

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]+>").expect("tag-strip regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static WHITESPACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("whitespace regex is valid") // Static pattern, safe to panic
});

/// A pure function from raw page HTML to an abstract, or absence when the
/// expected markup is not present.
///
/// Implementations must not perform network access; fetching is the
/// registry's concern via [`FetchStrategy`].
pub trait Extractor: Send + Sync {
    /// Short stable name used in logs.
    fn name(&self) -> &'static str;

    /// Extracts and cleans the abstract from `html`.
    fn extract(&self, html: &str) -> Option<String>;
}

/// Strips residual markup, collapses whitespace runs to single spaces, and
/// trims. Applied to every abstract regardless of origin, so API sources
/// returning JATS fragments and scraped pages converge on the same shape.
#[must_use]
pub fn normalize_abstract(text: &str) -> String {
    let stripped = TAG_PATTERN.replace_all(text, "");
    WHITESPACE_PATTERN.replace_all(&stripped, " ").trim().to_string()
}
