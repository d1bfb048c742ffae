use scraper::Html;
use url::Url;

use super::{link_href, path_id, selector};
use crate::error::ScrapeResult;
use crate::traits::site::SiteScraper;
use crate::types::job::JobRecord;

const JOB_CARD: &str = ".job-list__cards .job-card";

/// remoteyeah.com - job cards whose title links to `/jobs/<slug>`.
pub struct RemoteYeahScraper;

impl SiteScraper for RemoteYeahScraper {
    fn site(&self) -> &'static str {
        "remoteyeah.com"
    }

    fn ready_selector(&self) -> &'static str {
        JOB_CARD
    }

    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        _tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>> {
        let card = selector(JOB_CARD)?;
        let link = selector("a.job-card__title")?;

        Ok(document
            .select(&card)
            .filter_map(|el| {
                let href = link_href(el, &link, page_url)?;
                let id = path_id(&href, &["/jobs/"])?;
                Some(JobRecord::new(id, href, page_url.as_str()))
            })
            .collect())
    }
}
