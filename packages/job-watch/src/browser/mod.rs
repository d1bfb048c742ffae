//! Browser collaborator implementations.
//!
//! - `HttpBrowser` - fetches pages over HTTP and queries the returned HTML.
//!   It does not run JavaScript; sites that render their job list
//!   client-side will time out waiting for readiness.

mod http;

pub use http::{HttpBrowser, HttpPage};
pub(crate) use http::document_matches;

// Re-export from traits for convenience
pub use crate::traits::browser::{Browser, BrowserSession, Capture, CaptureFormat, Page};
