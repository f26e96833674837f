//! Semaphore-gated HTTP fetcher with per-attempt proxy rotation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Proxy, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::proxy::ProxyPool;

use super::{FetchError, FetchOutcome, RetrySchedule};

/// Shared browser-like user agent for plain HTTP fetches.
///
/// Publisher pages and metadata APIs both see the same string so traffic is
/// not trivially fingerprintable per component.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Async HTTP client with a shared concurrency cap.
///
/// Every call suspends on the fetcher's semaphore until a slot frees up; the
/// permit is held across the whole retry loop so a flapping endpoint cannot
/// multiply its own concurrency. A fresh proxy lease is drawn from the pool
/// per attempt - a lease that failed one attempt is not sticky for the next.
///
/// A `404` response short-circuits to [`FetchOutcome::Absent`] without
/// retrying: the resource legitimately does not exist at that URL, and
/// retrying would only add load.
pub struct HttpFetcher {
    client: Client,
    semaphore: Arc<Semaphore>,
    proxy_pool: Arc<ProxyPool>,
}

impl HttpFetcher {
    /// Creates a fetcher capped at `max_concurrent` in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the shared direct-egress client
    /// cannot be constructed.
    pub fn new(max_concurrent: usize, proxy_pool: Arc<ProxyPool>) -> Result<Self, FetchError> {
        let client = base_client_builder()
            .build()
            .map_err(FetchError::ClientBuild)?;

        debug!(max_concurrent, "creating http fetcher");

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            proxy_pool,
        })
    }

    /// Fetches a URL and decodes the body as JSON.
    ///
    /// Walks the retry schedule on transient failure; `404` returns `Absent`
    /// immediately.
    pub async fn fetch_json(
        &self,
        url: &str,
        timeout: Duration,
        schedule: &RetrySchedule,
    ) -> FetchOutcome<serde_json::Value> {
        match self.fetch_with_retry(url, timeout, schedule).await {
            FetchOutcome::Value(body) => match serde_json::from_str(&body) {
                Ok(value) => FetchOutcome::Value(value),
                Err(e) => FetchOutcome::Failed(FetchError::malformed_body(url, e.to_string())),
            },
            FetchOutcome::Absent => FetchOutcome::Absent,
            FetchOutcome::Failed(e) => FetchOutcome::Failed(e),
        }
    }

    /// Fetches a URL and returns the body as text.
    pub async fn fetch_text(
        &self,
        url: &str,
        timeout: Duration,
        schedule: &RetrySchedule,
    ) -> FetchOutcome<String> {
        self.fetch_with_retry(url, timeout, schedule).await
    }

    /// Core retry loop. Holds one semaphore permit for the whole call.
    async fn fetch_with_retry(
        &self,
        url: &str,
        timeout: Duration,
        schedule: &RetrySchedule,
    ) -> FetchOutcome<String> {
        let Ok(_permit) = self.semaphore.acquire().await else {
            return FetchOutcome::Failed(FetchError::Concurrency);
        };

        let mut attempt = 0usize;
        loop {
            match self.attempt(url, timeout).await {
                AttemptResult::Body(body) => return FetchOutcome::Value(body),
                AttemptResult::NotFound => {
                    debug!(url, "404 - treating as definitive absence");
                    return FetchOutcome::Absent;
                }
                AttemptResult::Error(e) => match schedule.delay_after(attempt) {
                    Some(delay) => {
                        debug!(
                            url,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "fetch attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        error!(
                            url,
                            attempts = attempt + 1,
                            error = %e,
                            "fetch failed after exhausting retry schedule"
                        );
                        return FetchOutcome::Failed(e);
                    }
                },
            }
        }
    }

    /// One attempt: draw a proxy, issue the request, classify the response.
    async fn attempt(&self, url: &str, timeout: Duration) -> AttemptResult {
        let client = match self.proxy_pool.proxy_url().await {
            Some(proxy_url) => match proxied_client(&proxy_url) {
                Ok(client) => client,
                Err(e) => {
                    // Bad lease URL; fall back to direct egress for this attempt.
                    warn!(error = %e, "could not build proxied client, using direct egress");
                    self.client.clone()
                }
            },
            None => self.client.clone(),
        };

        let response = match client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return AttemptResult::Error(FetchError::timeout(url)),
            Err(e) => {
                return AttemptResult::Error(FetchError::Network {
                    url: url.to_string(),
                    source: e,
                });
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return AttemptResult::NotFound;
        }
        if !status.is_success() {
            return AttemptResult::Error(FetchError::http_status(url, status.as_u16()));
        }

        match response.text().await {
            Ok(body) => AttemptResult::Body(body),
            Err(e) if e.is_timeout() => AttemptResult::Error(FetchError::timeout(url)),
            Err(e) => AttemptResult::Error(FetchError::Network {
                url: url.to_string(),
                source: e,
            }),
        }
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("available_permits", &self.semaphore.available_permits())
            .finish_non_exhaustive()
    }
}

/// Result of a single request attempt, before retry classification.
enum AttemptResult {
    Body(String),
    NotFound,
    Error(FetchError),
}

/// Builder with the shared project HTTP policy.
///
/// Certificate verification is relaxed deliberately: several publisher
/// mirrors (notably arXiv mirrors behind rotating proxies) present
/// certificates that fail strict validation, and the payloads here are
/// public metadata.
fn base_client_builder() -> reqwest::ClientBuilder {
    Client::builder()
        .user_agent(USER_AGENT)
        .gzip(true)
        .danger_accept_invalid_certs(true)
        .connect_timeout(Duration::from_secs(10))
}

/// Builds a one-shot client routed through the given proxy URL.
fn proxied_client(proxy_url: &str) -> Result<Client, FetchError> {
    let proxy = Proxy::all(proxy_url).map_err(FetchError::ClientBuild)?;
    base_client_builder()
        .proxy(proxy)
        .build()
        .map_err(FetchError::ClientBuild)
}
