//! Generic extractor implementations driven by per-site configuration.
//!
//! Two shapes cover the publisher pages this pipeline meets: content sitting
//! under a stable CSS selector, and content following a heading whose text
//! (not its markup) identifies it ("Abstract"). Site-specific knowledge is
//! the configuration, not the code.

use scraper::{ElementRef, Html, Selector};

use super::{Extractor, normalize_abstract};

/// Extractor that tries an ordered list of CSS selectors and returns the
/// text under the first selector that matches anything.
///
/// All matches for the winning selector are joined with spaces, covering
/// multi-paragraph abstracts split across sibling elements.
pub struct SelectorExtractor {
    name: &'static str,
    selectors: Vec<Selector>,
    strip_prefix: Option<&'static str>,
    truncate_at: Option<&'static str>,
}

impl SelectorExtractor {
    /// Builds an extractor from static CSS selector strings.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(name: &'static str, selectors: &[&'static str]) -> Self {
        Self {
            name,
            selectors: selectors
                .iter()
                .map(|s| Selector::parse(s).expect("site selector is valid CSS")) // Static pattern, safe to panic
                .collect(),
            strip_prefix: None,
            truncate_at: None,
        }
    }

    /// Strips a literal prefix (e.g. `"Abstract:"`) from the cleaned text.
    #[must_use]
    pub fn strip_prefix(mut self, prefix: &'static str) -> Self {
        self.strip_prefix = Some(prefix);
        self
    }

    /// Truncates the cleaned text at a literal marker (e.g. `"Keywords:"`)
    /// for pages that run the abstract and its keyword list together.
    #[must_use]
    pub fn truncate_at(mut self, marker: &'static str) -> Self {
        self.truncate_at = Some(marker);
        self
    }

    fn clean(&self, text: &str) -> Option<String> {
        let mut cleaned = normalize_abstract(text);
        if let Some(prefix) = self.strip_prefix {
            if let Some(rest) = cleaned.strip_prefix(prefix) {
                cleaned = rest.trim_start().to_string();
            }
        }
        if let Some(marker) = self.truncate_at {
            if let Some(index) = cleaned.find(marker) {
                cleaned.truncate(index);
                cleaned = cleaned.trim_end().to_string();
            }
        }
        if cleaned.is_empty() { None } else { Some(cleaned) }
    }
}

impl Extractor for SelectorExtractor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        for selector in &self.selectors {
            let joined = document
                .select(selector)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if let Some(cleaned) = self.clean(&joined) {
                return Some(cleaned);
            }
        }
        None
    }
}

impl std::fmt::Debug for SelectorExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorExtractor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Extractor for pages where the abstract has no stable selector but always
/// follows a heading containing a known marker (e.g. an `<h4>Abstract</h4>`
/// followed by paragraphs).
pub struct HeadingSiblingExtractor {
    name: &'static str,
    heading: Selector,
    marker: &'static str,
}

impl HeadingSiblingExtractor {
    /// Builds an extractor that finds `heading_selector` elements whose text
    /// contains `marker` and returns the first non-empty following sibling.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(name: &'static str, heading_selector: &'static str, marker: &'static str) -> Self {
        Self {
            name,
            heading: Selector::parse(heading_selector)
                .expect("heading selector is valid CSS"), // Static pattern, safe to panic
            marker,
        }
    }
}

impl Extractor for HeadingSiblingExtractor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        for heading in document.select(&self.heading) {
            if !element_text(heading).contains(self.marker) {
                continue;
            }
            for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
                let text = normalize_abstract(&element_text(sibling));
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for HeadingSiblingExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadingSiblingExtractor")
            .field("name", &self.name)
            .field("marker", &self.marker)
            .finish_non_exhaustive()
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").trim().to_string()
}
