use scraper::Html;
use url::Url;

use super::{element_id, link_href, selector};
use crate::error::ScrapeResult;
use crate::traits::site::SiteScraper;
use crate::types::job::JobRecord;

const JOB_ROW: &str = ".job-desktop[id]";

/// www.workingnomads.com - desktop job rows carry their id.
pub struct WorkingNomadsScraper;

impl SiteScraper for WorkingNomadsScraper {
    fn site(&self) -> &'static str {
        "www.workingnomads.com"
    }

    fn ready_selector(&self) -> &'static str {
        JOB_ROW
    }

    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        _tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>> {
        let row = selector(JOB_ROW)?;
        let link = selector("h4 a")?;

        Ok(document
            .select(&row)
            .filter_map(|el| {
                let href = link_href(el, &link, page_url)?;
                let id = element_id(el)?;
                Some(JobRecord::new(id, href, page_url.as_str()))
            })
            .collect())
    }
}
