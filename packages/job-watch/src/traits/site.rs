//! Site scraper contract.
//!
//! Each supported job board implements this trait once. Everything
//! site-specific (selectors, id derivation, tag filtering) lives behind it so
//! the store, scheduler and run driver never know which site they are
//! handling.

use async_trait::async_trait;
use scraper::Html;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::error::{BrowserResult, ScrapeError, ScrapeResult};
use crate::traits::browser::Page;
use crate::types::job::JobRecord;

/// A scraper for one job board.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// Stable, hostname-shaped site id. Used as the ledger key.
    fn site(&self) -> &'static str;

    /// CSS selector that only matches once the job list has rendered.
    fn ready_selector(&self) -> &'static str;

    /// Read job records out of a parsed listing page.
    ///
    /// Must return an empty list rather than fail when there are no jobs.
    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>>;

    /// The configured URLs whose host is this site, in input order.
    fn target_urls(&self, urls: &[String]) -> Vec<String> {
        urls.iter()
            .filter(|url| {
                Url::parse(url)
                    .ok()
                    .and_then(|u| u.host_str().map(|h| h == self.site()))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// The configured tag vocabulary for this site, empty if none.
    fn target_tags(&self, tags: &HashMap<String, Vec<String>>) -> Vec<String> {
        tags.get(self.site()).cloned().unwrap_or_default()
    }

    /// Suspend until the job list is present in the loaded page.
    async fn await_ready(&self, page: &mut dyn Page, timeout: Duration) -> BrowserResult<()> {
        page.wait_for_selector(self.ready_selector(), timeout).await
    }

    /// Extract raw job records from the loaded page without changing it.
    async fn extract_jobs(&self, page: &dyn Page, tags: &[String]) -> ScrapeResult<Vec<JobRecord>> {
        let html = page.content().await?;
        let current = page.current_url().await?;
        let page_url = Url::parse(&current)
            .map_err(|e| ScrapeError::Extraction(format!("bad page url {current}: {e}")))?;

        parse_listing(self, &html, &page_url, tags)
    }
}

fn parse_listing<S: SiteScraper + ?Sized>(
    scraper: &S,
    html: &str,
    page_url: &Url,
    tags: &[String],
) -> ScrapeResult<Vec<JobRecord>> {
    let document = Html::parse_document(html);
    scraper.parse_jobs(&document, page_url, tags)
}
