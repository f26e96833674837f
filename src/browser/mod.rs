//! Headless-browser page rendering for sites that defeat plain HTTP.
//!
//! # Overview
//!
//! A handful of publishers serve their abstracts only after client-side
//! rendering, or sit behind anti-bot frontends that plain HTTP cannot pass.
//! This driver keeps one long-lived headless Chromium instance and, per
//! fetch attempt, opens an isolated browser context (so proxy settings and
//! cookies never leak between attempts), navigates, and races three
//! outcomes: a known anti-bot challenge marker appearing, one of the
//! caller's "content ready" selectors appearing, or a timeout.
//!
//! A challenge is not a page failure - it is a burned proxy. The lease used
//! for that attempt is evicted from the pool and the next attempt runs with
//! a fresh one.
//!
//! The retry/eviction loop lives in [`BrowserDriver`] and is written against
//! the [`RenderBackend`] seam; [`ChromiumBackend`] is the production
//! implementation. Every attempt closes its page and disposes its context on
//! all exit paths before the next attempt starts; sessions are never reused
//! across attempts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::fetch::{
    AuthChallengeResponse, AuthChallengeResponseResponse, ContinueRequestParams,
    ContinueWithAuthParams, EnableParams as FetchEnableParams, EventAuthRequired,
    EventRequestPaused,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::proxy::{BrowserProxy, ProxyCredentials, ProxyPool};

/// Default cap on simultaneously open browser sessions. Sized well below the
/// HTTP concurrency cap; each session is a full renderer process.
pub const DEFAULT_BROWSER_CONCURRENCY: usize = 5;

/// Default attempts per page before giving up.
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Default per-attempt budget for navigation plus the readiness race.
/// Anti-bot frontends can hold a page for well over a minute before letting
/// the real content through.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Textual markers that identify an anti-bot interstitial.
pub const CHALLENGE_MARKERS: &[&str] = &["cloudflare", "Cloudflare", "Checking your browser"];

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Errors from browser lifecycle management.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// Chromium could not be configured or launched.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// A CDP command failed mid-session.
    #[error("browser session error: {0}")]
    Session(#[from] chromiumoxide::error::CdpError),
}

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct BrowserDriverConfig {
    /// Run Chromium without a visible window.
    pub headless: bool,
    /// Cap on simultaneously open sessions.
    pub max_concurrent: usize,
    /// Per-attempt budget for navigation plus the readiness race.
    pub navigation_timeout: Duration,
}

impl Default for BrowserDriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            max_concurrent: DEFAULT_BROWSER_CONCURRENCY,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }
}

/// Outcome of one rendering attempt.
#[derive(Debug)]
pub enum RenderOutcome {
    /// The page rendered and (if selectors were supplied) one appeared.
    Content(String),
    /// An anti-bot challenge marker won the race.
    Challenge,
    /// Neither challenge nor readiness resolved before the timeout.
    NotReady,
    /// The session itself broke before the race could resolve.
    Failed(BrowserError),
}

/// One isolated rendering attempt: open a context, navigate, resolve the
/// readiness race, tear everything down.
///
/// [`BrowserDriver`] owns the retry loop, proxy rotation and eviction, and
/// the concurrency bound; implementations of this trait own a single
/// attempt.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Renders `url` once, through `proxy` when one is leased.
    async fn render(
        &self,
        url: &str,
        proxy: Option<&BrowserProxy>,
        ready_selectors: &[&str],
        timeout: Duration,
    ) -> RenderOutcome;
}

/// Semaphore-bounded page renderer with per-attempt proxy rotation.
pub struct BrowserDriver<B: RenderBackend = ChromiumBackend> {
    backend: B,
    semaphore: Arc<Semaphore>,
    proxy_pool: Arc<ProxyPool>,
    navigation_timeout: Duration,
}

impl BrowserDriver {
    /// Launches Chromium and starts its event handler task.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Launch`] when Chromium cannot be started.
    pub async fn launch(
        config: BrowserDriverConfig,
        proxy_pool: Arc<ProxyPool>,
    ) -> Result<Self, BrowserError> {
        let backend = ChromiumBackend::launch(&config).await?;
        info!(
            max_concurrent = config.max_concurrent,
            headless = config.headless,
            "browser driver started"
        );
        Ok(Self::with_backend(backend, proxy_pool, &config))
    }

    /// Shuts the browser down. Pending sessions are abandoned.
    pub async fn close(self) {
        self.backend.close().await;
    }
}

impl<B: RenderBackend> BrowserDriver<B> {
    fn with_backend(backend: B, proxy_pool: Arc<ProxyPool>, config: &BrowserDriverConfig) -> Self {
        Self {
            backend,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            proxy_pool,
            navigation_timeout: config.navigation_timeout,
        }
    }

    /// Navigates to `url` and returns the rendered HTML, or `None` once
    /// `max_retries` attempts are exhausted.
    ///
    /// With `ready_selectors` supplied, content is returned as soon as any
    /// selector matches; with none, the attempt waits for page load and
    /// inspects the content for challenge markers post hoc. The semaphore
    /// permit is held across the whole retry loop.
    pub async fn render_page(
        &self,
        url: &str,
        ready_selectors: &[&str],
        max_retries: usize,
    ) -> Option<String> {
        let Ok(_permit) = self.semaphore.acquire().await else {
            return None;
        };

        for attempt in 0..max_retries.max(1) {
            let proxy = self.proxy_pool.browser_proxy().await;

            match self
                .backend
                .render(url, proxy.as_ref(), ready_selectors, self.navigation_timeout)
                .await
            {
                RenderOutcome::Content(html) => return Some(html),
                RenderOutcome::Challenge => {
                    if let Some(proxy) = &proxy {
                        self.proxy_pool.evict(&proxy.server).await;
                    }
                    warn!(
                        url,
                        attempt = attempt + 1,
                        max_retries,
                        proxied = proxy.is_some(),
                        "anti-bot challenge detected, rotating egress"
                    );
                }
                RenderOutcome::NotReady => {
                    warn!(
                        url,
                        attempt = attempt + 1,
                        max_retries,
                        "no ready selector appeared before timeout"
                    );
                }
                RenderOutcome::Failed(e) => {
                    warn!(
                        url,
                        attempt = attempt + 1,
                        max_retries,
                        error = %e,
                        "browser attempt failed"
                    );
                }
            }

            if attempt + 1 < max_retries {
                tokio::time::sleep(attempt_pause()).await;
            }
        }

        None
    }
}

impl<B: RenderBackend> std::fmt::Debug for BrowserDriver<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserDriver")
            .field("available_permits", &self.semaphore.available_permits())
            .finish_non_exhaustive()
    }
}

/// Production backend: one long-lived Chromium, one fresh browser context
/// per attempt.
pub struct ChromiumBackend {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl ChromiumBackend {
    async fn launch(config: &BrowserDriverConfig) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder().args(browser_args());
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler stream must be drained for the browser to make
        // progress at all.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!(error = %e, "browser close reported an error");
        }
        self.handler_task.abort();
    }

    /// One attempt in an isolated context. The page and context are torn
    /// down on every path out of this function.
    async fn attempt(
        &self,
        url: &str,
        proxy: Option<&BrowserProxy>,
        ready_selectors: &[&str],
        timeout: Duration,
    ) -> Result<RenderOutcome, BrowserError> {
        let (page, context_id) = self.open_isolated_page(proxy).await?;

        let outcome = navigate_and_race(&page, url, ready_selectors, timeout).await;

        if let Err(e) = page.close().await {
            debug!(error = %e, "page close failed");
        }
        if let Err(e) = self
            .browser
            .execute(DisposeBrowserContextParams::new(context_id))
            .await
        {
            debug!(error = %e, "context disposal failed");
        }

        outcome
    }

    /// Creates a fresh browser context (with the proxy applied, when one is
    /// leased) and a blank page inside it.
    ///
    /// Chromium rejects userinfo in its proxy-server setting, so the context
    /// gets the bare server and any credentials are answered through the CDP
    /// Fetch domain on the page.
    async fn open_isolated_page(
        &self,
        proxy: Option<&BrowserProxy>,
    ) -> Result<(Page, chromiumoxide::cdp::browser_protocol::browser::BrowserContextId), BrowserError>
    {
        let mut context_params = CreateBrowserContextParams::default();
        if let Some(proxy) = proxy {
            context_params.proxy_server = Some(format!("http://{}", proxy.server));
        }

        let context_id = self
            .browser
            .execute(context_params)
            .await?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(BrowserError::Launch)?;

        let page = self.browser.new_page(target).await?;
        page.set_user_agent(crate::fetch::USER_AGENT).await?;

        if let Some(credentials) = proxy.and_then(|p| p.credentials.as_ref()) {
            install_proxy_auth_responder(&page, credentials.clone()).await?;
        }

        Ok((page, context_id))
    }
}

#[async_trait]
impl RenderBackend for ChromiumBackend {
    async fn render(
        &self,
        url: &str,
        proxy: Option<&BrowserProxy>,
        ready_selectors: &[&str],
        timeout: Duration,
    ) -> RenderOutcome {
        match self.attempt(url, proxy, ready_selectors, timeout).await {
            Ok(outcome) => outcome,
            Err(e) => RenderOutcome::Failed(e),
        }
    }
}

impl std::fmt::Debug for ChromiumBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumBackend").finish_non_exhaustive()
    }
}

/// Enables CDP request interception on the page and spawns a responder that
/// continues every paused request and answers proxy auth challenges with the
/// pool's credentials. The responder ends with the page.
async fn install_proxy_auth_responder(
    page: &Page,
    credentials: ProxyCredentials,
) -> Result<(), BrowserError> {
    let mut enable = FetchEnableParams::default();
    enable.handle_auth_requests = Some(true);
    page.execute(enable).await?;

    let mut auth_events = page.event_listener::<EventAuthRequired>().await?;
    let mut paused_events = page.event_listener::<EventRequestPaused>().await?;
    let page = page.clone();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = auth_events.next() => {
                    let Some(event) = event else { break };
                    let response = AuthChallengeResponse {
                        response: AuthChallengeResponseResponse::ProvideCredentials,
                        username: Some(credentials.username.clone()),
                        password: Some(credentials.password.clone()),
                    };
                    let params = ContinueWithAuthParams::new(event.request_id.clone(), response);
                    if page.execute(params).await.is_err() {
                        break;
                    }
                }
                event = paused_events.next() => {
                    let Some(event) = event else { break };
                    let params = ContinueRequestParams::new(event.request_id.clone());
                    if page.execute(params).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    Ok(())
}

/// Navigates and races challenge detection against content readiness, under
/// the navigation timeout. The losing waiter is dropped (and thereby
/// cancelled) as soon as a winner resolves.
async fn navigate_and_race(
    page: &Page,
    url: &str,
    ready_selectors: &[&str],
    timeout: Duration,
) -> Result<RenderOutcome, BrowserError> {
    page.goto(url).await?;

    let outcome = tokio::select! {
        outcome = watch_for_challenge(page) => outcome,
        outcome = watch_for_ready(page, ready_selectors) => outcome,
        () = tokio::time::sleep(timeout) => RenderOutcome::NotReady,
    };
    Ok(outcome)
}

/// Resolves when a challenge marker appears in the page content.
async fn watch_for_challenge(page: &Page) -> RenderOutcome {
    loop {
        if let Ok(content) = page.content().await {
            if contains_challenge(&content) {
                return RenderOutcome::Challenge;
            }
        }
        tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
    }
}

/// Resolves when readiness is reached: any supplied selector matches, or -
/// with no selectors - as soon as content is retrievable (with a post hoc
/// challenge check, since the challenge watcher may not have polled yet).
async fn watch_for_ready(page: &Page, ready_selectors: &[&str]) -> RenderOutcome {
    loop {
        if ready_selectors.is_empty() {
            if let Ok(content) = page.content().await {
                if contains_challenge(&content) {
                    return RenderOutcome::Challenge;
                }
                return RenderOutcome::Content(content);
            }
        } else {
            for selector in ready_selectors {
                if page.find_element(*selector).await.is_ok() {
                    if let Ok(content) = page.content().await {
                        return RenderOutcome::Content(content);
                    }
                }
            }
        }
        tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
    }
}

/// Checks page content for known anti-bot interstitial markers.
#[must_use]
fn contains_challenge(content: &str) -> bool {
    CHALLENGE_MARKERS.iter().any(|marker| content.contains(marker))
}

/// Random 1-3 s pause between attempts so retries from many tasks do not
/// align into bursts.
fn attempt_pause() -> Duration {
    let millis = rand::thread_rng().gen_range(1000..3000);
    Duration::from_millis(millis)
}

/// Launch arguments tuned for scraping: no images (bandwidth), no GPU, no
/// sandbox (container compatibility). Script execution stays enabled -
/// several target sites only attach the abstract markup from script, and the
/// ready-selector wait depends on it.
fn browser_args() -> Vec<&'static str> {
    vec![
        "--disable-blink-features=AutomationControlled",
        "--disable-dev-shm-usage",
        "--no-sandbox",
        "--disable-gpu",
        "--blink-settings=imagesEnabled=false",
        "--disable-extensions",
        "--disable-plugins",
        "--disable-web-security",
        "--disable-features=TranslateUI",
        "--no-first-run",
        "--no-default-browser-check",
        "--disable-default-apps",
        "--disable-logging",
        "--log-level=3",
        "--silent",
    ]
}
