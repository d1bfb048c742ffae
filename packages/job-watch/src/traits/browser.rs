//! Browser collaborator traits.
//!
//! A `Browser` launches a `BrowserSession`, which hands out `Page`s. Only the
//! run driver navigates; site scrapers only wait on and read the page.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::BrowserResult;

/// Format of a diagnostic page capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// Full-page raster screenshot
    Png,
    /// Snapshot of the page's HTML
    Html,
}

impl CaptureFormat {
    /// File extension used when the capture is written to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            CaptureFormat::Png => "png",
            CaptureFormat::Html => "html",
        }
    }
}

/// A diagnostic capture of the currently loaded page.
#[derive(Debug, Clone)]
pub struct Capture {
    pub format: CaptureFormat,
    pub bytes: Vec<u8>,
}

impl Capture {
    /// Create a new capture.
    pub fn new(format: CaptureFormat, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            format,
            bytes: bytes.into(),
        }
    }
}

/// Launches browser sessions. One session spans one cycle.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Start a new session.
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>>;
}

/// A running browser.
#[async_trait]
pub trait BrowserSession: Send {
    /// Open a new tab.
    async fn new_page(&mut self) -> BrowserResult<Box<dyn Page>>;

    /// Shut the browser down.
    async fn close(&mut self) -> BrowserResult<()>;
}

/// A single tab.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to `url`, failing with `NavigationTimeout` after `timeout`.
    async fn goto(&mut self, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// The URL the page actually ended up on (after redirects).
    async fn current_url(&self) -> BrowserResult<String>;

    /// Suspend until an element matching `selector` is present, failing with
    /// `LoadTimeout` after `timeout`.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    /// The rendered DOM as HTML.
    async fn content(&self) -> BrowserResult<String>;

    /// Capture the page for diagnostics.
    async fn screenshot(&self) -> BrowserResult<Capture>;
}
