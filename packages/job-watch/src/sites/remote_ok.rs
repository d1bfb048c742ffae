use scraper::Html;
use url::Url;

use super::{element_id, link_href, selector};
use crate::error::ScrapeResult;
use crate::traits::site::SiteScraper;
use crate::types::job::JobRecord;

/// remoteok.com - table rows with the `job` class. Rows render as
/// placeholders first, so readiness waits for a real one.
pub struct RemoteOkScraper;

impl SiteScraper for RemoteOkScraper {
    fn site(&self) -> &'static str {
        "remoteok.com"
    }

    fn ready_selector(&self) -> &'static str {
        "tbody tr.job:not(.placeholder)"
    }

    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        _tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>> {
        let row = selector("tbody tr.job")?;
        let link = selector(".preventLink")?;

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_job_rows_only() {
        let html = r#"
            <table><tbody>
              <tr class="job" id="job-1001"><td><a class="preventLink" href="/remote-jobs/1001">A</a></td></tr>
              <tr class="expand"><td><a class="preventLink" href="/remote-jobs/1001">A</a></td></tr>
              <tr class="job" id="job-1002"><td><a class="preventLink" href="https://remoteok.com/remote-jobs/1002">B</a></td></tr>
              <tr class="job" id="job-1003"><td>no link</td></tr>
            </tbody></table>"#;
        let url = Url::parse("https://remoteok.com/remote-rust-jobs").unwrap();

        let jobs = RemoteOkScraper
            .parse_jobs(&Html::parse_document(html), &url, &[])
            .unwrap();

        let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["job-1001", "job-1002"]);
        assert_eq!(jobs[0].url, "https://remoteok.com/remote-jobs/1001");
        assert_eq!(jobs[0].source, "https://remoteok.com/remote-rust-jobs");
    }
}
