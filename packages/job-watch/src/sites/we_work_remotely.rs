use scraper::Html;
use url::Url;

use super::{link_href, path_id, selector};
use crate::error::ScrapeResult;
use crate::traits::site::SiteScraper;
use crate::types::job::JobRecord;

const UNLOCKED_LINK: &str = ".listing-link--unlocked";

/// weworkremotely.com - listing containers, skipping ads.
pub struct WeWorkRemotelyScraper;

impl SiteScraper for WeWorkRemotelyScraper {
    fn site(&self) -> &'static str {
        "weworkremotely.com"
    }

    fn ready_selector(&self) -> &'static str {
        UNLOCKED_LINK
    }

    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        _tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>> {
        let listing = selector(".new-listing-container:not(.feature--ad)")?;
        let link = selector(UNLOCKED_LINK)?;

        Ok(document
            .select(&listing)
            .filter_map(|el| {
                let href = link_href(el, &link, page_url)?;
                let id = path_id(&href, &["/remote-jobs/"])?;
                Some(JobRecord::new(id, href, page_url.as_str()))
            })
            .collect())
    }
}
