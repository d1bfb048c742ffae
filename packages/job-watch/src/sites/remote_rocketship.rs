use scraper::Html;
use url::Url;

use super::{link_href, selector};
use crate::error::ScrapeResult;
use crate::traits::site::SiteScraper;
use crate::types::job::JobRecord;

const JOB_LIST: &str = r".sm\:w-8\/12.list-none";

/// www.remoterocketship.com - ids combine company and job slug
/// (`/company/acme/jobs/rust-dev` becomes `acme-rust-dev`).
pub struct RemoteRocketshipScraper;

impl SiteScraper for RemoteRocketshipScraper {
    fn site(&self) -> &'static str {
        "www.remoterocketship.com"
    }

    fn ready_selector(&self) -> &'static str {
        JOB_LIST
    }

    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        _tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>> {
        let item = selector(JOB_LIST)?;
        let link = selector(".hidden a.bg-button-secondary")?;

        Ok(document
            .select(&item)
            .filter_map(|el| {
                let href = link_href(el, &link, page_url)?;
                let id = company_job_id(href.path())?;
                Some(JobRecord::new(id, href, page_url.as_str()))
            })
            .collect())
    }
}

fn company_job_id(path: &str) -> Option<String> {
    let id = path
        .replacen("/jobs/", "-", 1)
        .replace("/company/", "")
        .replace('/', "");
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_job_id() {
        assert_eq!(
            company_job_id("/company/acme/jobs/senior-rust-dev"),
            Some("acme-senior-rust-dev".to_string())
        );
        assert_eq!(company_job_id("/"), None);
    }

    #[test]
    fn test_parses_escaped_class_selector() {
        let html = r#"
            <ul class="sm:w-8/12 list-none">
              <div class="hidden">
                <a class="bg-button-secondary" href="/company/acme/jobs/senior-rust-dev">Apply</a>
              </div>
            </ul>
            <ul class="list-none"><div class="hidden">
              <a class="bg-button-secondary" href="/company/x/jobs/y">Apply</a>
            </div></ul>"#;
        let url = Url::parse("https://www.remoterocketship.com/?jobTitle=Rust").unwrap();

        let jobs = RemoteRocketshipScraper
            .parse_jobs(&Html::parse_document(html), &url, &[])
            .unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "acme-senior-rust-dev");
        assert_eq!(
            jobs[0].url,
            "https://www.remoterocketship.com/company/acme/jobs/senior-rust-dev"
        );
    }
}
