//! Fetch-based browser: one HTTP GET per navigation, documents parsed with `scraper`.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{BrowserError, BrowserResult};
use crate::traits::browser::{Browser, BrowserSession, Capture, CaptureFormat, Page};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_MAX_REFETCHES: u32 = 2;

/// Browser backed by a plain HTTP client.
///
/// Each launch builds a fresh `reqwest::Client` that lives for one cycle.
pub struct HttpBrowser {
    user_agent: String,
    poll_interval: Duration,
    max_refetches: u32,
}

impl Default for HttpBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpBrowser {
    /// Create a browser with a desktop user agent. Readiness waits re-fetch
    /// at most twice, 2 s then 4 s after the previous fetch.
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_refetches: DEFAULT_MAX_REFETCHES,
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the delay before the first `wait_for_selector` re-fetch. Each
    /// later re-fetch waits twice as long as the one before.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set how many times `wait_for_selector` may re-fetch a page before
    /// giving up. Zero only inspects the document `goto` loaded.
    pub fn with_max_refetches(mut self, max_refetches: u32) -> Self {
        self.max_refetches = max_refetches;
        self
    }

    fn build_client(&self) -> BrowserResult<reqwest::Client> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| BrowserError::Launch(Box::new(e)))
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let client = self.build_client()?;
        debug!("HTTP browser session started");
        Ok(Box::new(HttpSession {
            client,
            poll_interval: self.poll_interval,
            max_refetches: self.max_refetches,
        }))
    }
}

struct HttpSession {
    client: reqwest::Client,
    poll_interval: Duration,
    max_refetches: u32,
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn new_page(&mut self) -> BrowserResult<Box<dyn Page>> {
        Ok(Box::new(
            HttpPage::new(self.client.clone())
                .with_poll_interval(self.poll_interval)
                .with_max_refetches(self.max_refetches),
        ))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        debug!("HTTP browser session closed");
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Loaded {
    requested: String,
    final_url: String,
    html: String,
}

/// A "tab" holding the last fetched document.
pub struct HttpPage {
    client: reqwest::Client,
    poll_interval: Duration,
    max_refetches: u32,
    loaded: Option<Loaded>,
}

impl HttpPage {
    /// Create an empty page on `client` with the default readiness backoff.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_refetches: DEFAULT_MAX_REFETCHES,
            loaded: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_refetches(mut self, max_refetches: u32) -> Self {
        self.max_refetches = max_refetches;
        self
    }

    fn loaded(&self) -> BrowserResult<&Loaded> {
        self.loaded.as_ref().ok_or(BrowserError::NoPageLoaded)
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> BrowserResult<Loaded> {
        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| navigation_error(url, timeout, e))?;

            let final_url = response.url().to_string();
            let html = response
                .text()
                .await
                .map_err(|e| navigation_error(url, timeout, e))?;

            Ok(Loaded {
                requested: url.to_string(),
                final_url,
                html,
            })
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }
}

fn navigation_error(url: &str, timeout: Duration, e: reqwest::Error) -> BrowserError {
    if e.is_timeout() {
        BrowserError::NavigationTimeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        BrowserError::Navigation {
            url: url.to_string(),
            source: Box::new(e),
        }
    }
}

/// Whether `html` contains an element matching `css`.
pub(crate) fn document_matches(html: &str, css: &str) -> BrowserResult<bool> {
    let selector =
        Selector::parse(css).map_err(|e| BrowserError::InvalidSelector(format!("{css}: {e}")))?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

#[async_trait]
impl Page for HttpPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> BrowserResult<()> {
        debug!(url = %url, "Navigating");
        let loaded = self.fetch(url, timeout).await?;
        if loaded.final_url != loaded.requested {
            debug!(url = %url, final_url = %loaded.final_url, "Navigation was redirected");
        }
        self.loaded = Some(loaded);
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.loaded()?.final_url.clone())
    }

    /// Re-fetches with a doubling delay, at most `max_refetches` times and
    /// never past `timeout`. Gives up early with `LoadTimeout` once the
    /// budget is spent or the next delay would not fit before the deadline.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let deadline = Instant::now() + timeout;
        let mut delay = self.poll_interval;
        let mut refetches = 0;

        loop {
            let loaded = self.loaded()?;
            if document_matches(&loaded.html, selector)? {
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if refetches >= self.max_refetches || remaining <= delay {
                return Err(BrowserError::LoadTimeout {
                    url: loaded.final_url.clone(),
                    selector: selector.to_string(),
                    timeout,
                });
            }

            let requested = loaded.requested.clone();
            tokio::time::sleep(delay).await;
            refetches += 1;
            delay = delay.saturating_mul(2);
            debug!(url = %requested, attempt = refetches, "Re-fetching while waiting for content");

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.fetch(&requested, remaining).await {
                Ok(refreshed) => self.loaded = Some(refreshed),
                // Stale document stays; the deadline check ends the loop
                Err(e) if e.is_timeout() => {}
                Err(e) => {
                    warn!(url = %requested, error = %e, "Re-fetch while waiting for content failed");
                    return Err(e);
                }
            }
        }
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.loaded()?.html.clone())
    }

    async fn screenshot(&self) -> BrowserResult<Capture> {
        let loaded = self.loaded()?;
        Ok(Capture::new(CaptureFormat::Html, loaded.html.as_bytes()))
    }
}
