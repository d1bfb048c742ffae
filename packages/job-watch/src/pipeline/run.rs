//! The run driver: one full pass over every site and URL.
//!
//! ```text
//! launch ─► for each site ─► for each URL
//!              │                 cooldown (not before the first URL)
//!              │                 goto ─► await_ready ─► redirect check
//!              │                 capture ─► extract ─► reconcile
//!              │                 log + notify each new job
//!              └─ first-run flag computed once per site
//! close
//! ```
//!
//! URL-level failures never abort siblings; only browser launch/close and
//! ledger I/O failures abort the cycle.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use super::status::StatusBoard;
use crate::error::{RunError, RunResult, ScrapeError, StoreError};
use crate::sinks::TracingNotifier;
use crate::stores::ScreenshotStore;
use crate::traits::browser::{Browser, Page};
use crate::traits::sink::{JobLog, Notifier, StatusObserver};
use crate::traits::site::SiteScraper;
use crate::traits::store::JobStore;
use crate::types::config::{CycleConfig, WatchConfig};
use crate::types::job::StoredJob;
use crate::types::status::Mode;

/// Longest error message shown in status updates.
const STATUS_ERROR_CHARS: usize = 100;

/// Something that runs one scrape cycle. Implemented by [`RunDriver`];
/// the scheduler only depends on this.
#[async_trait]
pub trait Cycle: Send + Sync {
    async fn run_cycle(&self) -> RunResult<CycleSummary>;
}

/// Counters for one finished cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub run_number: u64,
    pub sites: usize,
    pub urls_visited: usize,
    pub urls_failed: usize,
    pub urls_skipped: usize,
    pub jobs_scraped: usize,
    pub new_jobs: usize,
}

/// What one URL produced.
#[derive(Debug)]
struct UrlDelta {
    scraped: usize,
    new_jobs: Vec<StoredJob>,
}

/// Why one URL did not produce a delta.
#[derive(Debug)]
enum VisitError {
    /// Recoverable, skip this URL
    Scrape(ScrapeError),
    /// Cycle-fatal
    Store(StoreError),
}

impl From<ScrapeError> for VisitError {
    fn from(e: ScrapeError) -> Self {
        VisitError::Scrape(e)
    }
}

impl From<StoreError> for VisitError {
    fn from(e: StoreError) -> Self {
        VisitError::Store(e)
    }
}

/// Sequences site → URL → load → extract → reconcile → notify.
pub struct RunDriver {
    browser: Arc<dyn Browser>,
    store: Arc<dyn JobStore>,
    scrapers: Vec<Arc<dyn SiteScraper>>,
    watch: WatchConfig,
    config: CycleConfig,
    screenshots: Option<ScreenshotStore>,
    log: Option<Arc<dyn JobLog>>,
    notifier: Arc<dyn Notifier>,
    status: Arc<StatusBoard>,
}

impl RunDriver {
    /// Create a driver over every registered site, notifying through log
    /// events only and reporting status to `status`.
    pub fn new(
        browser: Arc<dyn Browser>,
        store: Arc<dyn JobStore>,
        watch: WatchConfig,
        status: Arc<StatusBoard>,
    ) -> Self {
        Self {
            browser,
            store,
            scrapers: crate::sites::registry(),
            watch,
            config: CycleConfig::default(),
            screenshots: None,
            log: None,
            notifier: Arc::new(TracingNotifier),
            status,
        }
    }

    /// Create a driver with its own status board around `observer`.
    pub fn with_observer(
        browser: Arc<dyn Browser>,
        store: Arc<dyn JobStore>,
        watch: WatchConfig,
        observer: Arc<dyn StatusObserver>,
    ) -> Self {
        Self::new(browser, store, watch, Arc::new(StatusBoard::new(observer)))
    }

    /// Replace the site list.
    pub fn with_scrapers(mut self, scrapers: Vec<Arc<dyn SiteScraper>>) -> Self {
        self.scrapers = scrapers;
        self
    }

    /// Set pacing and timeouts.
    pub fn with_cycle_config(mut self, config: CycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Capture every loaded page before extraction.
    pub fn with_screenshots(mut self, screenshots: ScreenshotStore) -> Self {
        self.screenshots = Some(screenshots);
        self
    }

    /// Record new jobs in `log`.
    pub fn with_log(mut self, log: Arc<dyn JobLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Announce new jobs through `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The status board this driver reports to.
    pub fn status(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.status)
    }

    async fn run(&self, summary: &mut CycleSummary) -> RunResult<()> {
        let mut session = self.browser.launch().await.map_err(RunError::BrowserLaunch)?;

        let scraped = match session.new_page().await {
            Ok(mut page) => self.scrape_sites(page.as_mut(), summary).await,
            Err(e) => Err(RunError::BrowserLaunch(e)),
        };

        let closed = session.close().await;
        match (scraped, closed) {
            (Err(e), Err(close_err)) => {
                warn!(error = %close_err, "Browser close failed after aborted cycle");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(close_err)) => Err(RunError::BrowserClose(close_err)),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    async fn scrape_sites(&self, page: &mut dyn Page, summary: &mut CycleSummary) -> RunResult<()> {
        let site_count = self.scrapers.len();

        for (site_index, scraper) in self.scrapers.iter().enumerate() {
            let site = scraper.site();
            // One flag per site per cycle, so every URL shares bootstrap semantics
            let is_first_run = self.store.is_first_run(site).await?;
            let urls = scraper.target_urls(&self.watch.urls);
            let tags = scraper.target_tags(&self.watch.tags);
            summary.sites += 1;

            info!(site = %site, urls = urls.len(), first_run = is_first_run, "Scraping site");
            self.status.update(|s| {
                s.current_site = site.to_string();
                s.site_index = site_index + 1;
                s.site_count = site_count;
                s.url_index = 0;
                s.url_count = urls.len();
                s.message = format!("Scraping {site}");
            });

            for (url_index, url) in urls.iter().enumerate() {
                if url_index > 0 && !self.config.cooldown.is_zero() {
                    debug!(site = %site, cooldown = ?self.config.cooldown, "Cooling down");
                    self.status.update(|s| s.message = "Cooling down...".to_string());
                    tokio::time::sleep(self.config.cooldown).await;
                }

                self.status.update(|s| {
                    s.url_index = url_index + 1;
                    s.message = format!("Loading {url}");
                });
                summary.urls_visited += 1;

                match self
                    .visit(page, scraper.as_ref(), url, &tags, is_first_run)
                    .await
                {
                    Ok(UrlDelta { scraped, new_jobs }) => {
                        summary.jobs_scraped += scraped;
                        summary.new_jobs += new_jobs.len();
                        self.status.update(|s| {
                            s.jobs_scraped += scraped;
                            s.new_jobs_found += new_jobs.len();
                            s.total_new_jobs += new_jobs.len();
                            s.message = format!(
                                "Scraped {scraped} job(s), {} new",
                                new_jobs.len()
                            );
                        });
                        self.fan_out(site, &new_jobs).await;
                    }
                    Err(VisitError::Scrape(ScrapeError::RedirectMismatch { requested, loaded })) => {
                        summary.urls_skipped += 1;
                        info!(
                            site = %site,
                            requested = %requested,
                            loaded = %loaded,
                            "Page redirected, skipping extraction"
                        );
                        self.status
                            .update(|s| s.message = format!("Redirected to {loaded}, skipped"));
                    }
                    Err(VisitError::Scrape(e)) => {
                        summary.urls_failed += 1;
                        warn!(site = %site, url = %url, error = %e, "URL failed, continuing");
                        let message = truncate(&e.to_string(), STATUS_ERROR_CHARS);
                        self.status.update(|s| s.message = format!("Error: {message}"));
                        if !self.config.error_delay.is_zero() {
                            tokio::time::sleep(self.config.error_delay).await;
                        }
                    }
                    Err(VisitError::Store(e)) => return Err(RunError::Store(e)),
                }
            }
        }

        Ok(())
    }

    async fn visit(
        &self,
        page: &mut dyn Page,
        scraper: &dyn SiteScraper,
        url: &str,
        tags: &[String],
        is_first_run: bool,
    ) -> Result<UrlDelta, VisitError> {
        let site = scraper.site();
        let timeout = self.config.page_timeout;

        page.goto(url, timeout).await.map_err(ScrapeError::from)?;
        self.status.update(|s| s.message = "Waiting for jobs to load...".to_string());
        scraper
            .await_ready(page, timeout)
            .await
            .map_err(ScrapeError::from)?;

        let loaded = page.current_url().await.map_err(ScrapeError::from)?;
        if !same_url(url, &loaded) {
            return Err(ScrapeError::RedirectMismatch {
                requested: url.to_string(),
                loaded,
            }
            .into());
        }

        self.capture(site, &*page).await;

        let records = scraper.extract_jobs(&*page, tags).await?;
        let scraped = records.len();
        debug!(site = %site, url = %url, scraped, "Extracted jobs");

        let new_jobs = self.store.reconcile(site, records, is_first_run).await?;
        if !new_jobs.is_empty() {
            info!(site = %site, url = %url, new_jobs = new_jobs.len(), "Found new jobs");
        }

        Ok(UrlDelta { scraped, new_jobs })
    }

    async fn capture(&self, site: &str, page: &dyn Page) {
        let Some(screenshots) = &self.screenshots else {
            return;
        };
        match page.screenshot().await {
            Ok(capture) => {
                if let Err(e) = screenshots.save(site, &capture).await {
                    warn!(site = %site, error = %e, "Failed to save page capture");
                }
            }
            Err(e) => warn!(site = %site, error = %e, "Failed to capture page"),
        }
    }

    async fn fan_out(&self, site: &str, jobs: &[StoredJob]) {
        for job in jobs {
            if let Some(log) = &self.log {
                if let Err(e) = log.log(site, job).await {
                    warn!(site = %site, url = %job.url, error = %e, "Failed to log new job");
                }
            }
            if let Err(e) = self.notifier.notify(site, job).await {
                warn!(site = %site, url = %job.url, error = %e, "Failed to send notification");
            }
        }
    }
}

#[async_trait]
impl Cycle for RunDriver {
    async fn run_cycle(&self) -> RunResult<CycleSummary> {
        let started = Utc::now();
        let mut summary = CycleSummary::default();

        self.status.update(|s| {
            s.mode = Mode::Scraping;
            s.run_number += 1;
            s.current_site.clear();
            s.site_index = 0;
            s.site_count = self.scrapers.len();
            s.url_index = 0;
            s.url_count = 0;
            s.jobs_scraped = 0;
            s.new_jobs_found = 0;
            s.next_run_in = None;
            s.cycle_started_at = Some(started);
            s.message = "Launching browser...".to_string();
            summary.run_number = s.run_number;
        });
        info!(run = summary.run_number, "Starting scrape cycle");

        let result = self.run(&mut summary).await;

        let finished = Utc::now();
        match &result {
            Ok(()) => {
                info!(
                    run = summary.run_number,
                    sites = summary.sites,
                    urls = summary.urls_visited,
                    failed = summary.urls_failed,
                    skipped = summary.urls_skipped,
                    jobs_scraped = summary.jobs_scraped,
                    new_jobs = summary.new_jobs,
                    elapsed_secs = (finished - started).num_seconds(),
                    "Scrape cycle complete"
                );
                self.status.update(|s| {
                    s.mode = Mode::Idle;
                    s.current_site.clear();
                    s.last_run_at = Some(finished);
                    s.message = format!("Scrape complete, {} new job(s)", summary.new_jobs);
                });
            }
            Err(e) => {
                error!(run = summary.run_number, error = %e, "Scrape cycle failed");
                let message = truncate(&e.to_string(), STATUS_ERROR_CHARS);
                self.status.update(|s| {
                    s.mode = Mode::Idle;
                    s.current_site.clear();
                    s.last_run_at = Some(finished);
                    s.message = format!("Scrape failed: {message}");
                });
            }
        }

        result.map(|()| summary)
    }
}

/// Whether the page stayed on the requested URL. Compares parsed URLs so a
/// normalised trailing slash is not a redirect.
fn same_url(requested: &str, loaded: &str) -> bool {
    match (Url::parse(requested), Url::parse(loaded)) {
        (Ok(a), Ok(b)) => a == b,
        _ => requested == loaded,
    }
}

fn truncate(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        return message.to_string();
    }
    let mut out: String = message.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_url_normalises() {
        assert!(same_url("https://remoteok.com", "https://remoteok.com/"));
        assert!(same_url(
            "https://remoteok.com/remote-rust-jobs",
            "https://remoteok.com/remote-rust-jobs"
        ));
        assert!(!same_url(
            "https://remoteok.com/remote-rust-jobs",
            "https://remoteok.com/login"
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 4), "abcd...");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
