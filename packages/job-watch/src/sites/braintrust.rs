use scraper::Html;
use url::Url;

use super::{link_href, path_id, selector};
use crate::error::ScrapeResult;
use crate::traits::site::SiteScraper;
use crate::types::job::JobRecord;

const JOB_HEADER: &str = r#"[class^="MuiStack-root jobs-container"] [class^="styles_header"]"#;

/// app.usebraintrust.com - MUI job cards with generated class names, matched
/// by prefix.
pub struct BrainTrustScraper;

impl SiteScraper for BrainTrustScraper {
    fn site(&self) -> &'static str {
        "app.usebraintrust.com"
    }

    fn ready_selector(&self) -> &'static str {
        JOB_HEADER
    }

    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        _tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>> {
        let header = selector(JOB_HEADER)?;
        let link = selector("a")?;

        Ok(document
            .select(&header)
            .filter_map(|el| {
                let href = link_href(el, &link, page_url)?;
                let id = path_id(&href, &["/jobs/"])?;
                Some(JobRecord::new(id, href, page_url.as_str()))
            })
            .collect())
    }
}
