//! Integration tests for the full harvest pipeline.
//!
//! These tests drive Orchestrator end-to-end over real batch files on disk
//! and mock metadata/publisher servers, verifying persistence semantics and
//! the fallback order between sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use paper_harvester::extract::ExtractorRegistry;
use paper_harvester::fetch::HttpFetcher;
use paper_harvester::pipeline::{FallbackChain, Orchestrator};
use paper_harvester::proxy::ProxyPool;
use paper_harvester::source::{AbstractSource, Crossref, OpenAlex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ==================== Helper Functions ====================

/// Helper to build an HTTP fetcher with the proxy layer disabled.
fn test_fetcher() -> Arc<HttpFetcher> {
    Arc::new(
        HttpFetcher::new(8, Arc::new(ProxyPool::disabled())).expect("fetcher construction"),
    )
}

/// Helper to build an orchestrator whose identifier chain is OpenAlex (at
/// `primary`) then Crossref (at `secondary`), with no browser.
fn test_orchestrator(primary: &MockServer, secondary: &MockServer) -> Orchestrator {
    let fetcher = test_fetcher();
    let sources: Vec<Box<dyn AbstractSource>> = vec![
        Box::new(OpenAlex::with_base_url(Arc::clone(&fetcher), primary.uri())),
        Box::new(Crossref::with_base_url(Arc::clone(&fetcher), secondary.uri())),
    ];
    let chain = FallbackChain::new(sources, ExtractorRegistry::new(), fetcher, None);
    Orchestrator::new(Arc::new(chain), false)
}

fn write_batch(dir: &Path, name: &str, content: &str) -> PathBuf {
    let file = dir.join(name);
    std::fs::write(&file, content).expect("write batch fixture");
    file
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).expect("read batch"))
        .expect("parse batch")
}

// ==================== Identifier Chain ====================

#[tokio::test]
async fn test_inverted_index_abstract_is_reassembled_and_persisted() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works/doi:10.1/x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "abstract_inverted_index": {
                "models": [1],
                "Large": [0],
                "memorize.": [2]
            }
        })))
        .mount(&primary)
        .await;
    // The second source must see zero traffic once the first one answers.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&secondary)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let batch = write_batch(
        dir.path(),
        "icml_2023.json",
        r#"{"venue": "ICML", "papers": [{"title": "P1", "doi": "10.1/x"}]}"#,
    );

    let totals = test_orchestrator(&primary, &secondary)
        .process_dir(dir.path())
        .await
        .expect("run succeeds");

    assert_eq!(totals.fetched, 1);
    assert_eq!(totals.failed, 0);

    let persisted = read_json(&batch);
    assert_eq!(persisted["papers"][0]["abstract"], "Large models memorize.");
    // Surrounding fields survive untouched.
    assert_eq!(persisted["venue"], "ICML");
    assert_eq!(persisted["papers"][0]["title"], "P1");
    secondary.verify().await;
}

#[tokio::test]
async fn test_chain_advances_past_exhausted_source() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    // Persistent transient failure: the short per-source schedule exhausts
    // and the chain moves on instead of giving up on the record.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path("/works/10.1/y"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": {"abstract": "<jats:p>Recovered downstream.</jats:p>"}
        })))
        .mount(&secondary)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let batch = write_batch(
        dir.path(),
        "vldb_2023.json",
        r#"{"papers": [{"doi": "10.1/y"}]}"#,
    );

    let totals = test_orchestrator(&primary, &secondary)
        .process_dir(dir.path())
        .await
        .expect("run succeeds");

    assert_eq!(totals.fetched, 1);
    assert_eq!(
        read_json(&batch)["papers"][0]["abstract"],
        "Recovered downstream."
    );
}

// ==================== URL Chain ====================

#[tokio::test]
async fn test_url_only_record_with_extractor_miss_leaves_file_untouched() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    let publisher = MockServer::start().await;

    // Page exists but carries none of the expected abstract markup.
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>paywall</body></html>"),
        )
        .mount(&publisher)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let original = format!(
        r#"{{"papers": [{{"title": "U", "ee": "{}/abs/1111?site=arxiv"}}]}}"#,
        publisher.uri()
    );
    let batch = write_batch(dir.path(), "corr_2023.json", &original);

    let totals = test_orchestrator(&primary, &secondary)
        .process_dir(dir.path())
        .await
        .expect("run succeeds");

    assert_eq!(totals.fetched, 0);
    assert_eq!(totals.failed, 1);
    // No update means no rewrite: byte-identical file.
    assert_eq!(std::fs::read_to_string(&batch).expect("read batch"), original);
}

// ==================== Idempotence ====================

#[tokio::test]
async fn test_second_run_over_complete_batch_is_a_no_op() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/works/doi:10.1/z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "abstract_inverted_index": {"Once.": [0]}
        })))
        .expect(1)
        .mount(&primary)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let batch = write_batch(
        dir.path(),
        "sosp_2023.json",
        r#"{"papers": [{"doi": "10.1/z"}]}"#,
    );

    let orchestrator = test_orchestrator(&primary, &secondary);

    let first = orchestrator.process_dir(dir.path()).await.expect("first run");
    assert_eq!(first.fetched, 1);
    let after_first = std::fs::read_to_string(&batch).expect("read batch");

    // Second run: every record already has an abstract, so zero network
    // calls (the expect(1) above enforces it) and zero writes.
    let second = orchestrator.process_dir(dir.path()).await.expect("second run");
    assert_eq!(second.fetched, 0);
    assert_eq!(second.already_had_abstract, 1);
    assert_eq!(
        std::fs::read_to_string(&batch).expect("read batch"),
        after_first
    );
    primary.verify().await;
}

// ==================== Multi-file Runs ====================

#[tokio::test]
async fn test_run_aggregates_across_files_and_survives_bad_ones() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "abstract_inverted_index": {"Found.": [0]}
        })))
        .mount(&primary)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    write_batch(dir.path(), "aaa_broken.json", "{not json at all");
    write_batch(
        dir.path(),
        "icml_2023.json",
        r#"{"papers": [{"doi": "10.1/a"}, {"doi": "10.1/b"}]}"#,
    );
    write_batch(
        dir.path(),
        "kdd_2023.json",
        r#"{"papers": [{"doi": "10.1/c", "abstract": "Kept."}]}"#,
    );

    let totals = test_orchestrator(&primary, &secondary)
        .process_dir(dir.path())
        .await
        .expect("run succeeds despite broken file");

    assert_eq!(totals.total_records, 3);
    assert_eq!(totals.fetched, 2);
    assert_eq!(totals.already_had_abstract, 1);
}
