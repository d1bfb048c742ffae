use scraper::Html;
use url::Url;

use super::{element_id, link_href, selector};
use crate::error::ScrapeResult;
use crate::traits::site::SiteScraper;
use crate::types::job::JobRecord;

/// www.realworkfromanywhere.com - job cards are the grandchildren of the
/// listing section, identified by their element id.
pub struct RealWorkFromAnywhereScraper;

impl SiteScraper for RealWorkFromAnywhereScraper {
    fn site(&self) -> &'static str {
        "www.realworkfromanywhere.com"
    }

    fn ready_selector(&self) -> &'static str {
        "section:not(.grid-background)"
    }

    fn parse_jobs(
        &self,
        document: &Html,
        page_url: &Url,
        _tags: &[String],
    ) -> ScrapeResult<Vec<JobRecord>> {
        let card = selector("section:not(.grid-background) > div > div")?;
        let link = selector("a.w-full.h-full")?;

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_cards_outside_the_background_section() {
        let html = r#"
            <section class="grid-background"><div><div id="ignored">
              <a class="w-full h-full" href="/jobs/ignored">x</a></div></div></section>
            <section>
              <div>
                <div id="job-1"><a class="w-full h-full" href="/jobs/one">One</a></div>
                <div id="job-2"><a href="/jobs/two">No overlay link</a></div>
                <div><a class="w-full h-full" href="/jobs/three">No id</a></div>
              </div>
            </section>"#;
        let url = Url::parse("https://www.realworkfromanywhere.com/remote-rust-jobs").unwrap();

        let jobs = RealWorkFromAnywhereScraper
            .parse_jobs(&Html::parse_document(html), &url, &[])
            .unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "job-1");
        assert_eq!(jobs[0].url, "https://www.realworkfromanywhere.com/jobs/one");
    }
}
