//! Site scraper implementations and the registry of supported sites.
//!
//! Adding a site means adding a module here and listing it in [`registry`];
//! nothing in the core changes.

mod braintrust;
mod builtin;
mod nodesk;
mod real_work_from_anywhere;
mod remote_ok;
mod remote_rocketship;
mod remote_yeah;
mod we_work_remotely;
mod working_nomads;

pub use braintrust::BrainTrustScraper;
pub use builtin::BuiltInScraper;
pub use nodesk::NoDeskScraper;
pub use real_work_from_anywhere::RealWorkFromAnywhereScraper;
pub use remote_ok::RemoteOkScraper;
pub use remote_rocketship::RemoteRocketshipScraper;
pub use remote_yeah::RemoteYeahScraper;
pub use we_work_remotely::WeWorkRemotelyScraper;
pub use working_nomads::WorkingNomadsScraper;

use scraper::{ElementRef, Selector};
use std::sync::Arc;
use url::Url;

use crate::error::{ScrapeError, ScrapeResult};
use crate::traits::site::SiteScraper;

/// Every supported site, in visiting order.
pub fn registry() -> Vec<Arc<dyn SiteScraper>> {
    vec![
        Arc::new(NoDeskScraper),
        Arc::new(RealWorkFromAnywhereScraper),
        Arc::new(RemoteOkScraper),
        Arc::new(BuiltInScraper),
        Arc::new(WeWorkRemotelyScraper),
        Arc::new(WorkingNomadsScraper),
        Arc::new(RemoteRocketshipScraper),
        Arc::new(BrainTrustScraper),
        Arc::new(RemoteYeahScraper),
    ]
}

/// Look up a registered site by id.
pub fn find(site: &str) -> Option<Arc<dyn SiteScraper>> {
    registry().into_iter().find(|s| s.site() == site)
}

pub(crate) fn selector(css: &str) -> ScrapeResult<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Extraction(format!("bad selector `{css}`: {e}")))
}

/// Absolute URL of the first `link` under `element`, resolved like `a.href`.
pub(crate) fn link_href(element: ElementRef<'_>, link: &Selector, page_url: &Url) -> Option<Url> {
    let href = element.select(link).next()?.value().attr("href")?;
    page_url.join(href.trim()).ok()
}

/// The element's own `id` attribute, if non-empty.
pub(crate) fn element_id(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .id()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Id built from a job URL's path: each `segment` is removed, then every `/`.
pub(crate) fn path_id(url: &Url, segments: &[&str]) -> Option<String> {
    let mut path = url.path().to_string();
    for segment in segments {
        path = path.replace(segment, "");
    }
    let id = path.replace('/', "");
    (!id.is_empty()).then_some(id)
}
