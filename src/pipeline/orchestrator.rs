//! Batch orchestration: fan-out per record, aggregate, persist.

use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::batch::{BatchError, BatchFile, BatchStats, StatsSnapshot};

use super::FallbackChain;

/// Venues whose DOIs are not yet indexed by the metadata APIs; the
/// identifier chain is skipped and only the URL path is tried.
const URL_ONLY_VENUES: &[&str] = &["icme", "icassp"];

/// Errors that abort a whole run (as opposed to one batch).
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The input directory could not be listed.
    #[error("failed to read batch directory {dir}: {source}")]
    ReadDir {
        /// The directory that was requested.
        dir: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The input directory holds no batch files at all.
    #[error("no batch files (*.json) found in {dir}")]
    NoBatches {
        /// The directory that was requested.
        dir: String,
    },
}

/// Drives the fallback chain over every record of every batch file.
#[derive(Debug)]
pub struct Orchestrator {
    chain: Arc<FallbackChain>,
    show_progress: bool,
}

impl Orchestrator {
    /// Creates an orchestrator over an assembled chain.
    #[must_use]
    pub fn new(chain: Arc<FallbackChain>, show_progress: bool) -> Self {
        Self {
            chain,
            show_progress,
        }
    }

    /// Processes every `*.json` batch in `dir`, sorted by filename, one file
    /// at a time (records within a file run concurrently).
    ///
    /// Per-file failures are logged and skipped; only an unusable input
    /// directory is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when `dir` cannot be read or holds no
    /// batch files.
    pub async fn process_dir(&self, dir: &Path) -> Result<StatsSnapshot, OrchestratorError> {
        let mut batch_paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|source| OrchestratorError::ReadDir {
                dir: dir.display().to_string(),
                source,
            })?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        batch_paths.sort();

        if batch_paths.is_empty() {
            return Err(OrchestratorError::NoBatches {
                dir: dir.display().to_string(),
            });
        }

        info!(dir = %dir.display(), files = batch_paths.len(), "processing batch directory");

        let mut totals = StatsSnapshot::default();
        for path in &batch_paths {
            match self.process_file(path).await {
                Ok(snapshot) => totals.accumulate(snapshot),
                Err(e) => {
                    // Aborts this batch only; the rest of the run continues.
                    error!(file = %path.display(), error = %e, "batch failed");
                }
            }
        }

        Ok(totals)
    }

    /// Processes one batch file: filter, fan out, write back, persist if
    /// anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError`] when the file cannot be read, parsed, or
    /// written back.
    pub async fn process_file(&self, path: &Path) -> Result<StatsSnapshot, BatchError> {
        let mut batch = BatchFile::load(path)?;
        let stats = Arc::new(BatchStats::new());
        stats.add_total(batch.records().len());

        let venue_tag = batch.venue_tag().to_string();
        let pending = pending_records(&batch, &stats);

        if pending.is_empty() {
            info!(file = %path.display(), "nothing to fetch");
            return Ok(stats.snapshot());
        }

        let progress = self.progress_bar(path, pending.len() as u64);

        let mut tasks: JoinSet<(usize, Option<String>)> = JoinSet::new();
        for (index, doi, url) in pending {
            let chain = Arc::clone(&self.chain);
            let stats = Arc::clone(&stats);
            let venue_tag = venue_tag.clone();
            tasks.spawn(async move {
                let found = fetch_for_record(&chain, &venue_tag, doi.as_deref(), url.as_deref())
                    .await;
                if found.is_some() {
                    stats.record_fetched();
                } else {
                    stats.record_failed();
                }
                (index, found)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(file = %path.display(), error = %e, "record task panicked"),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let mut updated = false;
        for (index, found) in results {
            if let Some(text) = found {
                if let Some(record) = batch.records_mut().get_mut(index) {
                    record.set_abstract(text);
                    updated = true;
                }
            }
        }

        // All-or-nothing persistence: an untouched batch stays byte-identical.
        if updated {
            batch.save()?;
        }

        let snapshot = stats.snapshot();
        info!(
            file = %path.display(),
            fetched = snapshot.fetched,
            failed = snapshot.failed,
            already_had = snapshot.already_had_abstract,
            total = snapshot.total_records,
            persisted = updated,
            "batch complete"
        );
        Ok(snapshot)
    }

    fn progress_bar(&self, path: &Path, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        bar
    }
}

/// Applies the skip rules and returns `(index, doi, url)` for every record
/// that still needs a fetch.
fn pending_records(
    batch: &BatchFile,
    stats: &BatchStats,
) -> Vec<(usize, Option<String>, Option<String>)> {
    let mut pending = Vec::new();
    for (index, record) in batch.records().iter().enumerate() {
        if record.has_abstract() {
            stats.record_already_had();
            continue;
        }
        if record.is_editorial() {
            continue;
        }
        let doi = record.doi().map(str::to_string);
        let url = record.primary_url().map(str::to_string);
        if doi.is_none() && url.is_none() {
            stats.record_missing_identifiers();
            continue;
        }
        pending.push((index, doi, url));
    }
    pending
}

/// The per-record lookup order: identifier chain first (unless the venue is
/// URL-only), then the publisher page.
async fn fetch_for_record(
    chain: &FallbackChain,
    venue_tag: &str,
    doi: Option<&str>,
    url: Option<&str>,
) -> Option<String> {
    let url_only = URL_ONLY_VENUES.contains(&venue_tag);

    if let Some(doi) = doi {
        if !url_only {
            if let Some(text) = chain.by_identifier(doi).await {
                return Some(text);
            }
        }
    }
    if let Some(url) = url {
        if let Some(text) = chain.by_url(url, venue_tag).await {
            return Some(text);
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::extract::ExtractorRegistry;
    use crate::fetch::HttpFetcher;
    use crate::proxy::ProxyPool;
    use crate::source::{AbstractSource, OpenAlex};

    use super::*;

    fn orchestrator_with_source(source_base: String) -> Orchestrator {
        let fetcher = Arc::new(HttpFetcher::new(4, Arc::new(ProxyPool::disabled())).unwrap());
        let sources: Vec<Box<dyn AbstractSource>> =
            vec![Box::new(OpenAlex::with_base_url(Arc::clone(&fetcher), source_base))];
        let chain = FallbackChain::new(sources, ExtractorRegistry::new(), fetcher, None);
        Orchestrator::new(Arc::new(chain), false)
    }

    fn write_batch(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_fetched_abstract_is_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "abstract_inverted_index": {"Fetched": [0], "fine.": [1]}
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_batch(
            dir.path(),
            "icml_2023.json",
            r#"{"papers": [{"title": "P", "doi": "10.1/x"}]}"#,
        );

        let orchestrator = orchestrator_with_source(server.uri());
        let snapshot = orchestrator.process_file(&path).await.unwrap();

        assert_eq!(snapshot.fetched, 1);
        assert_eq!(snapshot.failed, 0);

        let reread: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reread["papers"][0]["abstract"], "Fetched fine.");
    }

    #[tokio::test]
    async fn test_failed_record_leaves_file_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let original = r#"{"papers": [{"title": "P", "doi": "10.1/x"}]}"#;
        let path = write_batch(dir.path(), "icml_2023.json", original);

        let orchestrator = orchestrator_with_source(server.uri());
        let snapshot = orchestrator.process_file(&path).await.unwrap();

        assert_eq!(snapshot.fetched, 0);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_complete_batch_makes_zero_network_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let original = r#"{"papers": [{"doi": "10.1/x", "abstract": "Done already."}]}"#;
        let path = write_batch(dir.path(), "icml_2023.json", original);

        let orchestrator = orchestrator_with_source(server.uri());
        let snapshot = orchestrator.process_file(&path).await.unwrap();

        assert_eq!(snapshot.already_had_abstract, 1);
        assert_eq!(snapshot.fetched, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_editorial_and_unidentified_records_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_batch(
            dir.path(),
            "icml_2023.json",
            r#"{"papers": [
                {"title": "Front matter", "type": "Editorship", "doi": "10.1/e"},
                {"title": "No links at all"}
            ]}"#,
        );

        let orchestrator = orchestrator_with_source(server.uri());
        let snapshot = orchestrator.process_file(&path).await.unwrap();

        assert_eq!(snapshot.total_records, 2);
        assert_eq!(snapshot.missing_identifiers, 1);
        assert_eq!(snapshot.fetched, 0);
        assert_eq!(snapshot.failed, 0);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_url_only_venue_skips_identifier_chain() {
        let server = MockServer::start().await;
        // Any call here would be the identifier chain; icassp must not use it.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_batch(
            dir.path(),
            "icassp_2023.json",
            r#"{"papers": [{"doi": "10.1109/x"}]}"#,
        );

        let orchestrator = orchestrator_with_source(server.uri());
        let snapshot = orchestrator.process_file(&path).await.unwrap();

        assert_eq!(snapshot.failed, 1);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_process_dir_empty_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with_source("http://127.0.0.1:1".to_string());
        let err = orchestrator.process_dir(dir.path()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NoBatches { .. }));
    }

    #[tokio::test]
    async fn test_process_dir_continues_past_broken_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "abstract_inverted_index": {"ok": [0]}
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        write_batch(dir.path(), "aaa_1.json", "{broken");
        write_batch(
            dir.path(),
            "icml_2023.json",
            r#"{"papers": [{"doi": "10.1/x"}]}"#,
        );

        let orchestrator = orchestrator_with_source(server.uri());
        let totals = orchestrator.process_dir(dir.path()).await.unwrap();
        assert_eq!(totals.fetched, 1);
    }
}
