//! Paper record access over schemaless batch JSON.
//!
//! Batch files come from an upstream producer whose schema drifts (extra
//! fields per venue, `ee` as string or list). Records are kept as ordered
//! JSON maps rather than a fixed struct so that saving a batch reproduces
//! every field, in its original order, untouched - the pipeline's only write
//! is the `abstract` key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record type marking editorial front matter, which never has an abstract
/// worth fetching.
const EDITORSHIP_TYPE: &str = "Editorship";

/// One paper entry in a batch file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperRecord(Map<String, Value>);

impl PaperRecord {
    /// The record's DOI, if present and non-empty.
    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.0
            .get("doi")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// The primary electronic-edition URL: the `ee` field itself when it is
    /// a string, or its first element when it is a list.
    #[must_use]
    pub fn primary_url(&self) -> Option<&str> {
        let ee = self.0.get("ee")?;
        let url = match ee {
            Value::String(s) => s.as_str(),
            Value::Array(items) => items.first().and_then(Value::as_str)?,
            _ => return None,
        };
        if url.trim().is_empty() { None } else { Some(url) }
    }

    /// The stored abstract, if present and non-empty.
    #[must_use]
    pub fn abstract_text(&self) -> Option<&str> {
        self.0
            .get("abstract")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// True when the record already carries a usable abstract.
    #[must_use]
    pub fn has_abstract(&self) -> bool {
        self.abstract_text().is_some()
    }

    /// True for editorial/front-matter entries, which are skipped outright.
    #[must_use]
    pub fn is_editorial(&self) -> bool {
        self.0
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t == EDITORSHIP_TYPE)
    }

    /// Sets (or overwrites) the abstract. The only mutation the pipeline
    /// ever performs on a record.
    pub fn set_abstract(&mut self, text: impl Into<String>) {
        self.0
            .insert("abstract".to_string(), Value::String(text.into()));
    }

    #[cfg(test)]
    pub(crate) fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self(Map::new()),
        }
    }
}
