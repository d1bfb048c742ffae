//! Scheduled Job-Board Watcher
//!
//! Periodically loads the listing pages of a fixed set of remote-job boards,
//! extracts job records, and reports only the jobs it has never seen before.
//!
//! # How it works
//!
//! - Each supported board is a [`SiteScraper`]: it knows which configured
//!   URLs belong to it, when its page is ready, and how to read records
//!   out of the DOM.
//! - The [`FileLedgerStore`] keeps one JSON ledger per site. Reconciling a
//!   scrape against it yields the delta of new jobs. The very first scrape
//!   of a site only seeds its ledger and reports nothing.
//! - The [`RunDriver`] visits every site and URL in order, with a cooldown
//!   between URLs. A failing URL never stops its siblings.
//! - The [`Scheduler`] runs cycles forever with a jittered countdown that a
//!   [`ManualTrigger`] can cut short.
//!
//! # Usage
//!
//! ```rust,ignore
//! use job_watch::{FileLedgerStore, HttpBrowser, RunDriver, Scheduler, TracingStatus};
//!
//! let config = WatchConfig::load("config.json").await?;
//! let driver = RunDriver::with_observer(
//!     Arc::new(HttpBrowser::new()),
//!     Arc::new(FileLedgerStore::new("data")),
//!     config,
//!     Arc::new(TracingStatus::new()),
//! );
//! let status = driver.status();
//! let scheduler = Scheduler::new(driver, ScheduleConfig::default(), status);
//! scheduler.run(CancellationToken::new()).await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator seams (Browser, SiteScraper, JobStore, sinks)
//! - [`types`] - Job records, configuration and status snapshots
//! - [`sites`] - The supported job boards
//! - [`stores`] - Ledger and screenshot storage
//! - [`browser`] - HTTP-backed browser
//! - [`sinks`] - Job log, notifications and status reporting
//! - [`pipeline`] - Run driver, scheduler and unseen index refresh
//! - [`testing`] - Mock implementations for testing

pub mod browser;
pub mod error;
pub mod pipeline;
pub mod sinks;
pub mod sites;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{BrowserError, ConfigError, RunError, ScrapeError, StoreError};
pub use traits::{
    browser::{Browser, BrowserSession, Capture, CaptureFormat, Page},
    sink::{JobLog, Notifier, StatusObserver},
    site::SiteScraper,
    store::JobStore,
};
pub use types::{
    config::{CycleConfig, ScheduleConfig, WatchConfig},
    job::{JobRecord, StoredJob, UnseenJob},
    status::{Mode, StatusSnapshot},
};

pub use browser::HttpBrowser;
pub use pipeline::{
    find_unseen, refresh_unseen, spawn_unseen_refresh, CountdownEnd, Cycle, CycleSummary,
    ManualTrigger, RunDriver, Scheduler, StatusBoard,
};
pub use sinks::{AppendLog, DesktopNotifier, TracingNotifier, TracingStatus};
pub use stores::{FileLedgerStore, ScreenshotStore};
