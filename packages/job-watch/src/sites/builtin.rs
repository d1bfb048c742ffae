use scraper::Html;
use url::Url;

use super::{element_id, link_href, selector};
use crate::error::ScrapeResult;
use crate::traits::site::SiteScraper;
use crate::types::job::JobRecord;

/// builtin.com - job cards inside `#jobs-list`.
pub struct BuiltInScraper;

impl SiteScraper for BuiltInScraper {
    fn site(&self) -> &'static str {
        "builtin.com"
    }

    fn ready_selector(&self) -> &'static str {
        r#"[data-id="job-card"]"#
    }

    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        _tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>> {
        let card = selector(r#"#jobs-list div[data-id="job-card"]"#)?;
        let link = selector("h2 a")?;

        Ok(document
            .select(&card)
            .filter_map(|el| {
                let href = link_href(el, &link, page_url)?;
                let id = element_id(el)?;
                Some(JobRecord::new(id, href, page_url.as_str()))
            })
            .collect())
    }
}
