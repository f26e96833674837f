//! Batch file loading, mutation, and persistence.
//!
//! A batch is one venue-year's worth of paper records in a single JSON file
//! shaped `{"papers": [...], ...}`. The venue tag is encoded in the filename
//! as the prefix before the first underscore (`icml_2023.json` → `icml`).
//!
//! Persistence is all-or-nothing per file: a batch is rewritten only when at
//! least one record gained an abstract, and a rewrite reproduces every field
//! and record in the original order.

mod record;
mod stats;

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

pub use record::PaperRecord;
pub use stats::{BatchStats, StatsSnapshot};

/// Errors touching a batch file. Any of these aborts that file only; other
/// batches continue.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The file could not be read.
    #[error("failed to read batch file {path}: {source}")]
    Read {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid batch JSON.
    #[error("failed to parse batch file {path}: {source}")]
    Parse {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The updated batch could not be written back.
    #[error("failed to write batch file {path}: {source}")]
    Write {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// One loaded batch file.
#[derive(Debug)]
pub struct BatchFile {
    path: PathBuf,
    venue_tag: String,
    /// Top-level document with the `papers` entry left in place; rewritten
    /// from `records` on save so surrounding keys keep their order.
    document: Map<String, Value>,
    records: Vec<PaperRecord>,
}

impl BatchFile {
    /// Loads and parses a batch file.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Read`] or [`BatchError::Parse`].
    pub fn load(path: &Path) -> Result<Self, BatchError> {
        let raw = std::fs::read_to_string(path).map_err(|source| BatchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let document: Map<String, Value> =
            serde_json::from_str(&raw).map_err(|source| BatchError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let records = match document.get("papers") {
            Some(papers) => serde_json::from_value(papers.clone()).map_err(|source| {
                BatchError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?,
            None => Vec::new(),
        };

        debug!(path = %path.display(), records = records.len(), "loaded batch file");

        Ok(Self {
            path: path.to_path_buf(),
            venue_tag: venue_tag_from_path(path),
            document,
            records,
        })
    }

    /// Path this batch was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Venue tag derived from the filename.
    #[must_use]
    pub fn venue_tag(&self) -> &str {
        &self.venue_tag
    }

    /// The batch's records.
    #[must_use]
    pub fn records(&self) -> &[PaperRecord] {
        &self.records
    }

    /// Mutable access for writing fetched abstracts back.
    pub fn records_mut(&mut self) -> &mut [PaperRecord] {
        &mut self.records
    }

    /// Serializes the batch back to its file, pretty-printed with 2-space
    /// indentation to match the upstream producer.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Write`] on serialization or I/O failure.
    pub fn save(&mut self) -> Result<(), BatchError> {
        let papers = serde_json::to_value(&self.records).map_err(|source| BatchError::Parse {
            path: self.path.clone(),
            source,
        })?;
        // Inserting over an existing key keeps its position in the document.
        self.document.insert("papers".to_string(), papers);

        let rendered =
            serde_json::to_string_pretty(&self.document).map_err(|source| BatchError::Parse {
                path: self.path.clone(),
                source,
            })?;
        std::fs::write(&self.path, rendered).map_err(|source| BatchError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Derives the venue tag from a batch filename: the portion before the first
/// underscore (or the whole stem when there is none).
#[must_use]
pub fn venue_tag_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    stem.split('_').next().unwrap_or_default().to_string()
}
