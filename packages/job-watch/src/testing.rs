//! Testing utilities including mock implementations.
//!
//! These are useful for driving the run driver and scheduler without a real
//! browser or network access.

use async_trait::async_trait;
use scraper::Html;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use url::Url;

use crate::browser::document_matches;
use crate::error::{BrowserError, BrowserResult, ScrapeError, ScrapeResult};
use crate::sites::{link_href, selector};
use crate::traits::browser::{Browser, BrowserSession, Capture, CaptureFormat, Page};
use crate::traits::sink::{JobLog, Notifier, StatusObserver};
use crate::traits::site::SiteScraper;
use crate::types::job::{JobRecord, StoredJob, UnseenJob};
use crate::types::status::StatusSnapshot;

/// What the mock browser serves for one URL.
#[derive(Debug, Clone)]
enum MockResponse {
    Page { final_url: String, html: String },
    NavigationTimeout,
    NavigationError(String),
}

/// Record of a call made to the mock browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBrowserCall {
    Launch,
    NewPage,
    Goto { url: String },
    WaitForSelector { selector: String },
    Content,
    Screenshot,
    Close,
}

/// A mock browser serving canned HTML per URL.
///
/// Unknown URLs fail navigation. `wait_for_selector` checks the canned HTML
/// once and reports a load timeout straight away if the selector is absent.
#[derive(Default, Clone)]
pub struct MockBrowser {
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    fail_launch: bool,
    fail_close: bool,
    fail_screenshots: bool,
    calls: Arc<RwLock<Vec<MockBrowserCall>>>,
}

impl MockBrowser {
    /// Create a mock browser with no pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `url`.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        self.insert(
            url.clone(),
            MockResponse::Page {
                final_url: url,
                html: html.into(),
            },
        )
    }

    /// Serve `html` for `url`, but report the page as having landed on
    /// `final_url`.
    pub fn with_redirect(
        self,
        url: impl Into<String>,
        final_url: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        self.insert(
            url.into(),
            MockResponse::Page {
                final_url: final_url.into(),
                html: html.into(),
            },
        )
    }

    /// Navigation to `url` times out.
    pub fn with_navigation_timeout(self, url: impl Into<String>) -> Self {
        self.insert(url.into(), MockResponse::NavigationTimeout)
    }

    /// Navigation to `url` fails with `message`.
    pub fn with_navigation_error(self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.insert(url.into(), MockResponse::NavigationError(message.into()))
    }

    /// Launching the browser fails.
    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    /// Closing the browser fails.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Every screenshot fails.
    pub fn failing_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockBrowserCall> {
        self.calls.read().unwrap().clone()
    }

    /// URLs passed to `goto`, in order.
    pub fn visited(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockBrowserCall::Goto { url } => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn insert(self, url: String, response: MockResponse) -> Self {
        self.responses.write().unwrap().insert(url, response);
        self
    }

    fn record(&self, call: MockBrowserCall) {
        self.calls.write().unwrap().push(call);
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        self.record(MockBrowserCall::Launch);
        if self.fail_launch {
            return Err(BrowserError::Launch("mock launch failure".into()));
        }
        Ok(Box::new(MockSession {
            browser: self.clone(),
        }))
    }
}

struct MockSession {
    browser: MockBrowser,
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn new_page(&mut self) -> BrowserResult<Box<dyn Page>> {
        self.browser.record(MockBrowserCall::NewPage);
        Ok(Box::new(MockPage {
            browser: self.browser.clone(),
            loaded: None,
        }))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.browser.record(MockBrowserCall::Close);
        if self.browser.fail_close {
            return Err(BrowserError::Close("mock close failure".into()));
        }
        Ok(())
    }
}

/// A tab of [`MockBrowser`].
pub struct MockPage {
    browser: MockBrowser,
    loaded: Option<(String, String)>,
}

impl MockPage {
    fn loaded(&self) -> BrowserResult<&(String, String)> {
        self.loaded.as_ref().ok_or(BrowserError::NoPageLoaded)
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> BrowserResult<()> {
        self.browser.record(MockBrowserCall::Goto {
            url: url.to_string(),
        });
        self.loaded = None;

        let response = self.browser.responses.read().unwrap().get(url).cloned();
        match response {
            Some(MockResponse::Page { final_url, html }) => {
                self.loaded = Some((final_url, html));
                Ok(())
            }
            Some(MockResponse::NavigationTimeout) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
            Some(MockResponse::NavigationError(message)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                source: message.into(),
            }),
            None => Err(BrowserError::Navigation {
                url: url.to_string(),
                source: "no mock page".into(),
            }),
        }
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.loaded()?.0.clone())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        self.browser.record(MockBrowserCall::WaitForSelector {
            selector: selector.to_string(),
        });
        let (url, html) = self.loaded()?;
        if document_matches(html, selector)? {
            Ok(())
        } else {
            Err(BrowserError::LoadTimeout {
                url: url.clone(),
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    async fn content(&self) -> BrowserResult<String> {
        self.browser.record(MockBrowserCall::Content);
        Ok(self.loaded()?.1.clone())
    }

    async fn screenshot(&self) -> BrowserResult<Capture> {
        self.browser.record(MockBrowserCall::Screenshot);
        if self.browser.fail_screenshots {
            return Err(BrowserError::Navigation {
                url: self.loaded()?.0.clone(),
                source: "mock screenshot failure".into(),
            });
        }
        Ok(Capture::new(CaptureFormat::Html, self.loaded()?.1.clone()))
    }
}

/// A scraper for a made-up site with a trivial listing format.
///
/// Jobs are `.job` elements carrying a `data-id` attribute and a link:
///
/// ```html
/// <li class="job" data-id="42"><a href="/jobs/42">Rust Engineer</a></li>
/// ```
pub struct MockScraper {
    site: &'static str,
    fail_extraction: bool,
}

impl MockScraper {
    /// Create a scraper for `site`.
    pub fn new(site: &'static str) -> Self {
        Self {
            site,
            fail_extraction: false,
        }
    }

    /// Every extraction fails.
    pub fn failing_extraction(mut self) -> Self {
        self.fail_extraction = true;
        self
    }

    /// Render a listing page in this scraper's format.
    pub fn listing(jobs: &[(&str, &str)]) -> String {
        let items: String = jobs
            .iter()
            .map(|(id, href)| format!(r#"<li class="job" data-id="{id}"><a href="{href}">Job {id}</a></li>"#))
            .collect();
        format!("<html><body><ul>{items}</ul></body></html>")
    }
}

impl SiteScraper for MockScraper {
    fn site(&self) -> &'static str {
        self.site
    }

    fn ready_selector(&self) -> &'static str {
        ".job"
    }

    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        _tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>> {
        if self.fail_extraction {
            return Err(ScrapeError::Extraction("mock extraction failure".into()));
        }

        let job = selector(".job")?;
        let link = selector("a")?;
        Ok(document
            .select(&job)
            .filter_map(|el| {
                let id = el.value().attr("data-id")?;
                let href = link_href(el, &link, page_url)?;
                Some(JobRecord::new(id, href.as_str(), page_url.as_str()))
            })
            .collect())
    }
}

/// A job log that keeps entries in memory.
#[derive(Default)]
pub struct RecordingLog {
    entries: RwLock<Vec<(String, StoredJob)>>,
    fail: bool,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Logged `(site, job)` pairs in order.
    pub fn entries(&self) -> Vec<(String, StoredJob)> {
        self.entries.read().unwrap().clone()
    }
}

#[async_trait]
impl JobLog for RecordingLog {
    async fn log(&self, site: &str, job: &StoredJob) -> std::io::Result<()> {
        if self.fail {
            return Err(std::io::Error::other("mock log failure"));
        }
        self.entries
            .write()
            .unwrap()
            .push((site.to_string(), job.clone()));
        Ok(())
    }
}

/// A notifier that keeps notifications in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<(String, StoredJob)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Notified `(site, job)` pairs in order.
    pub fn sent(&self) -> Vec<(String, StoredJob)> {
        self.sent.read().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, site: &str, job: &StoredJob) -> std::io::Result<()> {
        if self.fail {
            return Err(std::io::Error::other("mock notifier failure"));
        }
        self.sent
            .write()
            .unwrap()
            .push((site.to_string(), job.clone()));
        Ok(())
    }
}

/// A status observer that keeps every snapshot.
#[derive(Default)]
pub struct RecordingStatus {
    snapshots: RwLock<Vec<StatusSnapshot>>,
    unseen: RwLock<Vec<usize>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every snapshot received, oldest first.
    pub fn snapshots(&self) -> Vec<StatusSnapshot> {
        self.snapshots.read().unwrap().clone()
    }

    /// The most recent snapshot.
    pub fn last(&self) -> Option<StatusSnapshot> {
        self.snapshots.read().unwrap().last().cloned()
    }

    /// Sizes of every published unseen index.
    pub fn unseen_counts(&self) -> Vec<usize> {
        self.unseen.read().unwrap().clone()
    }
}

impl StatusObserver for RecordingStatus {
    fn update(&self, status: &StatusSnapshot) {
        self.snapshots.write().unwrap().push(status.clone());
    }

    fn unseen(&self, jobs: &[UnseenJob]) {
        self.unseen.write().unwrap().push(jobs.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_browser_serves_pages_and_records_calls() {
        let browser = MockBrowser::new().with_page(
            "https://example.com/jobs",
            MockScraper::listing(&[("1", "/jobs/1")]),
        );

        let mut session = browser.launch().await.unwrap();
        let mut page = session.new_page().await.unwrap();
        page.goto("https://example.com/jobs", Duration::from_secs(1))
            .await
            .unwrap();
        page.wait_for_selector(".job", Duration::from_secs(1))
            .await
            .unwrap();
        let err = page
            .wait_for_selector(".missing", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        session.close().await.unwrap();

        assert_eq!(browser.visited(), vec!["https://example.com/jobs"]);
        assert_eq!(browser.calls().last(), Some(&MockBrowserCall::Close));
    }

    #[tokio::test]
    async fn test_mock_scraper_extracts_listing() {
        let browser = MockBrowser::new().with_page(
            "https://example.com/jobs",
            MockScraper::listing(&[("1", "/jobs/1"), ("2", "https://example.com/jobs/2")]),
        );
        let mut session = browser.launch().await.unwrap();
        let mut page = session.new_page().await.unwrap();
        page.goto("https://example.com/jobs", Duration::from_secs(1))
            .await
            .unwrap();

        let jobs = MockScraper::new("example.com")
            .extract_jobs(page.as_ref(), &[])
            .await
            .unwrap();

        assert_eq!(
            jobs,
            vec![
                JobRecord::new("1", "https://example.com/jobs/1", "https://example.com/jobs"),
                JobRecord::new("2", "https://example.com/jobs/2", "https://example.com/jobs"),
            ]
        );
    }
}
