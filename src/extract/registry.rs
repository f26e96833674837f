//! URL-pattern dispatch table.
//!
//! Dispatch is an ordered list of `(substring patterns, strategy, extractor)`
//! rules evaluated first-match-wins. A handful of DOI-resolver URLs give no
//! hint of the publisher behind the redirect; for those, a venue-tag override
//! table picks the extractor instead. Anything unmatched is *unresolved*,
//! which is an answer, not an error.

use std::sync::Arc;

use tracing::trace;

use super::{Extractor, HeadingSiblingExtractor, SelectorExtractor};

/// How a page's HTML should be obtained before extraction.
#[derive(Debug, Clone)]
pub enum FetchStrategy {
    /// Plain HTTP GET.
    Http,
    /// Full browser render, optionally waiting for any of the given
    /// selectors to appear.
    Browser {
        /// Selectors that signal the content has rendered. Empty means wait
        /// for basic page load only.
        ready_selectors: Vec<&'static str>,
    },
    /// Try plain HTTP first; if the extractor finds nothing in the static
    /// response, escalate to a browser render of the same URL.
    HttpThenBrowser,
}

/// The registry's answer for a URL: how to fetch it and what to run on the
/// result.
#[derive(Clone)]
pub struct ResolvedExtractor {
    /// Fetch strategy for the page.
    pub strategy: FetchStrategy,
    /// Extractor to run over the fetched HTML.
    pub extractor: Arc<dyn Extractor>,
}

impl std::fmt::Debug for ResolvedExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedExtractor")
            .field("strategy", &self.strategy)
            .field("extractor", &self.extractor.name())
            .finish()
    }
}

struct Rule {
    patterns: &'static [&'static str],
    resolved: ResolvedExtractor,
}

struct VenueOverride {
    venues: &'static [&'static str],
    resolved: ResolvedExtractor,
}

/// Ordered mapping from URL patterns (and DOI-resolver venue tags) to
/// extractors.
pub struct ExtractorRegistry {
    rules: Vec<Rule>,
    venue_overrides: Vec<VenueOverride>,
}

impl ExtractorRegistry {
    /// Builds the registry with the built-in publisher rules.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn new() -> Self {
        let acl: Arc<dyn Extractor> =
            Arc::new(SelectorExtractor::new("acl", &["div.acl-abstract span"]));
        let acm: Arc<dyn Extractor> = Arc::new(SelectorExtractor::new(
            "acm",
            &[
                "section#abstract div[role=\"paragraph\"]",
                "div.abstractSection p",
            ],
        ));
        let springer: Arc<dyn Extractor> =
            Arc::new(SelectorExtractor::new("springer", &["div#Abs1-content p"]));
        let ieee: Arc<dyn Extractor> = Arc::new(SelectorExtractor::new(
            "ieee",
            &["div.u-mb-1 div[xplmathjax]"],
        ));
        let aaai: Arc<dyn Extractor> = Arc::new(SelectorExtractor::new(
            "aaai",
            &[
                "section.item.abstract p",
                "div.paper-section-wrap div.attribute-output p",
            ],
        ));

        let http = |extractor: Arc<dyn Extractor>| ResolvedExtractor {
            strategy: FetchStrategy::Http,
            extractor,
        };
        let browser = |selectors: &'static [&'static str], extractor: Arc<dyn Extractor>| {
            ResolvedExtractor {
                strategy: FetchStrategy::Browser {
                    ready_selectors: selectors.to_vec(),
                },
                extractor,
            }
        };
        let escalating = |extractor: Arc<dyn Extractor>| ResolvedExtractor {
            strategy: FetchStrategy::HttpThenBrowser,
            extractor,
        };

        let acm_resolved = browser(&["#abstract", ".abstractSection"], Arc::clone(&acm));
        let acl_resolved = escalating(Arc::clone(&acl));
        let springer_resolved = http(Arc::clone(&springer));
        let ieee_resolved = browser(&[], Arc::clone(&ieee));
        let aaai_resolved = browser(&[], Arc::clone(&aaai));

        let rules = vec![
            Rule {
                patterns: &["aclanthology", "findings-acl", "acl"],
                resolved: acl_resolved.clone(),
            },
            Rule {
                patterns: &["dl.acm.org"],
                resolved: acm_resolved.clone(),
            },
            Rule {
                patterns: &["openaccess"],
                resolved: http(Arc::new(SelectorExtractor::new(
                    "openaccess",
                    &["div#abstract"],
                ))),
            },
            Rule {
                patterns: &["ijcai"],
                resolved: http(Arc::new(
                    SelectorExtractor::new(
                        "ijcai",
                        &[
                            "div.proceedings-detail div.col-md-12",
                            "div.region-content div.content p",
                        ],
                    )
                    .truncate_at("Keywords:"),
                )),
            },
            Rule {
                patterns: &["usenix"],
                resolved: http(Arc::new(
                    SelectorExtractor::new(
                        "usenix",
                        &["div.field-name-field-paper-description div.field-item"],
                    )
                    .strip_prefix("Abstract:"),
                )),
            },
            Rule {
                patterns: &["ndss"],
                resolved: http(Arc::new(SelectorExtractor::new(
                    "ndss",
                    &["div.entry-content div.paper-data p", "section.new-wrapper p"],
                ))),
            },
            Rule {
                patterns: &["nips", "neurips"],
                resolved: http(Arc::new(HeadingSiblingExtractor::new(
                    "nips", "h4", "Abstract",
                ))),
            },
            Rule {
                patterns: &["arxiv"],
                resolved: http(Arc::new(
                    SelectorExtractor::new("arxiv", &["blockquote.abstract"])
                        .strip_prefix("Abstract:"),
                )),
            },
            Rule {
                patterns: &["openreview"],
                resolved: http(Arc::new(SelectorExtractor::new(
                    "openreview",
                    &["div.note-content-value", "span.note-content-value"],
                ))),
            },
            Rule {
                patterns: &["proceedings.mlr"],
                resolved: http(Arc::new(SelectorExtractor::new("mlr", &["div#abstract"]))),
            },
            Rule {
                patterns: &["springer"],
                resolved: springer_resolved.clone(),
            },
            Rule {
                patterns: &["ieee"],
                resolved: ieee_resolved.clone(),
            },
            Rule {
                patterns: &["aaai"],
                resolved: aaai_resolved.clone(),
            },
        ];

        // DOI-resolver URLs hide the publisher; these venues are known to
        // resolve to a specific site.
        let venue_overrides = vec![
            VenueOverride {
                venues: &["crypto", "eurocrypt", "fm", "cav", "wine", "eccv"],
                resolved: springer_resolved,
            },
            VenueOverride {
                venues: &["mm", "icmr"],
                resolved: acm_resolved,
            },
            VenueOverride {
                venues: &["emnlp", "naacl", "acl"],
                resolved: acl_resolved,
            },
            VenueOverride {
                venues: &["icaps"],
                resolved: aaai_resolved,
            },
            VenueOverride {
                venues: &["icassp", "icme"],
                resolved: ieee_resolved,
            },
        ];

        Self {
            rules,
            venue_overrides,
        }
    }

    /// Resolves a URL (plus the record's venue tag, for DOI-resolver links)
    /// to a fetch strategy and extractor.
    ///
    /// Returns `None` - unresolved - for PDF links, unrecognized domains,
    /// and DOI links whose venue has no override.
    #[must_use]
    pub fn resolve(&self, url: &str, venue_tag: &str) -> Option<ResolvedExtractor> {
        // A PDF link never carries extractable markup.
        if url.contains("pdf") {
            trace!(url, "pdf link, no extractor");
            return None;
        }

        for rule in &self.rules {
            if rule.patterns.iter().any(|pattern| url.contains(pattern)) {
                trace!(url, extractor = rule.resolved.extractor.name(), "matched url rule");
                return Some(rule.resolved.clone());
            }
        }

        if url.contains("doi.org") {
            for over in &self.venue_overrides {
                if over.venues.contains(&venue_tag) {
                    trace!(
                        url,
                        venue_tag,
                        extractor = over.resolved.extractor.name(),
                        "matched venue override"
                    );
                    return Some(over.resolved.clone());
                }
            }
        }

        trace!(url, "no extractor rule matched");
        None
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("rules", &self.rules.len())
            .field("venue_overrides", &self.venue_overrides.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registry() -> ExtractorRegistry {
        ExtractorRegistry::new()
    }

    #[test]
    fn test_pdf_links_are_unresolved() {
        assert!(registry()
            .resolve("https://www.usenix.org/paper.pdf", "uss")
            .is_none());
    }

    #[test]
    fn test_url_patterns_dispatch_first_match() {
        let resolved = registry()
            .resolve("https://aclanthology.org/2023.acl-long.1/", "acl")
            .unwrap();
        assert_eq!(resolved.extractor.name(), "acl");
        assert!(matches!(resolved.strategy, FetchStrategy::HttpThenBrowser));
    }

    #[test]
    fn test_acm_uses_browser_with_ready_selectors() {
        let resolved = registry()
            .resolve("https://dl.acm.org/doi/10.1145/1", "kdd")
            .unwrap();
        assert_eq!(resolved.extractor.name(), "acm");
        match resolved.strategy {
            FetchStrategy::Browser { ready_selectors } => {
                assert_eq!(ready_selectors, vec!["#abstract", ".abstractSection"]);
            }
            other => panic!("expected browser strategy, got {other:?}"),
        }
    }

    #[test]
    fn test_arxiv_uses_plain_http() {
        let resolved = registry()
            .resolve("https://arxiv.org/abs/2301.00001", "corr")
            .unwrap();
        assert_eq!(resolved.extractor.name(), "arxiv");
        assert!(matches!(resolved.strategy, FetchStrategy::Http));
    }

    #[test]
    fn test_doi_url_with_venue_override_dispatches_by_venue() {
        let resolved = registry()
            .resolve("https://doi.org/10.1007/978-3", "eurocrypt")
            .unwrap();
        assert_eq!(resolved.extractor.name(), "springer");

        let resolved = registry().resolve("https://doi.org/10.1145/3", "mm").unwrap();
        assert_eq!(resolved.extractor.name(), "acm");

        let resolved = registry()
            .resolve("https://doi.org/10.1109/4", "icassp")
            .unwrap();
        assert_eq!(resolved.extractor.name(), "ieee");
    }

    #[test]
    fn test_doi_url_without_override_is_unresolved() {
        assert!(registry()
            .resolve("https://doi.org/10.1016/j.is", "vldb")
            .is_none());
    }

    #[test]
    fn test_unknown_domain_is_unresolved() {
        assert!(registry()
            .resolve("https://example.com/paper/1", "misc")
            .is_none());
    }
}
