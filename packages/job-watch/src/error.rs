//! Typed errors for the job watcher.
//!
//! Uses `thiserror` for library errors (not `anyhow`). The families line up
//! with the scope at which a failure is handled:
//! - `ScrapeError` is URL-scoped and always recoverable
//! - `RunError` aborts the current cycle only
//! - `ConfigError` is fatal before any scraping begins

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the browser collaborator.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The browser (or its HTTP client) could not be started
    #[error("browser launch failed: {0}")]
    Launch(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The browser session could not be shut down cleanly
    #[error("browser close failed: {0}")]
    Close(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Navigation did not finish within the allotted time
    #[error("navigation timed out after {timeout:?}: {url}")]
    NavigationTimeout { url: String, timeout: Duration },

    /// The page loaded but its content never became ready
    #[error("timed out after {timeout:?} waiting for `{selector}` on {url}")]
    LoadTimeout {
        url: String,
        selector: String,
        timeout: Duration,
    },

    /// Navigation failed outright (connection refused, HTTP error status, ...)
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A CSS selector could not be parsed
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// A page operation was attempted before any `goto`
    #[error("no page loaded")]
    NoPageLoaded,
}

impl BrowserError {
    /// Timeouts are the expected, routine failure of a page visit.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            BrowserError::NavigationTimeout { .. } | BrowserError::LoadTimeout { .. }
        )
    }
}

/// URL-scoped failures. The run driver converts every one of these into a
/// soft-continue.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Loading or waiting on the page failed
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// The page ended up somewhere other than where it was sent
    #[error("redirected from {requested} to {loaded}")]
    RedirectMismatch { requested: String, loaded: String },

    /// The DOM did not have the expected shape
    #[error("extraction failed: {0}")]
    Extraction(String),
}

/// Ledger and artifact persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ledger file is not valid JSON for a list of stored jobs
    #[error("malformed ledger {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Watch configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration document at the expected location
    #[error("configuration not found: {}", path.display())]
    Missing { path: PathBuf },

    /// Configuration exists but could not be read
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration is not valid JSON of the expected shape
    #[error("invalid configuration {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures that abort a whole cycle. The scheduler logs them and moves on to
/// the next scheduled cycle.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not start browser: {0}")]
    BrowserLaunch(#[source] BrowserError),

    #[error("could not close browser: {0}")]
    BrowserClose(#[source] BrowserError),

    #[error("ledger failure: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for browser operations.
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Result type alias for URL-scoped scrape operations.
pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for a full cycle.
pub type RunResult<T> = std::result::Result<T, RunError>;
