use scraper::Html;
use url::Url;

use super::{link_href, path_id, selector};
use crate::error::ScrapeResult;
use crate::traits::site::SiteScraper;
use crate::types::job::JobRecord;

const JOB_ITEM: &str = ".ais-Hits-list .ais-Hits-item";

/// nodesk.co - Algolia-rendered hit list, filtered by the location headings.
///
/// An empty tag vocabulary turns the location filter off and every hit with a
/// link is kept. Configure `tags["nodesk.co"]` to restrict by location.
pub struct NoDeskScraper;

impl SiteScraper for NoDeskScraper {
    fn site(&self) -> &'static str {
        "nodesk.co"
    }

    fn ready_selector(&self) -> &'static str {
        JOB_ITEM
    }

    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>> {
        let item = selector(JOB_ITEM)?;
        let location = selector("h5")?;
        let link = selector(".link")?;

        let jobs = document
            .select(&item)
            .filter(|el| {
                tags.is_empty()
                    || el.select(&location).any(|h| {
                        let text = h.text().collect::<String>();
                        tags.iter().any(|t| t == text.trim())
                    })
            })
            .filter_map(|el| {
                let href = link_href(el, &link, page_url)?;
                let id = path_id(&href, &[])?;
                Some(JobRecord::new(id, href, page_url.as_str()))
            })
            .collect();

        Ok(jobs)
    }
}
