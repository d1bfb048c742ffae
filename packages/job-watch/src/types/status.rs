//! Status snapshots pushed to observers while the watcher runs.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What the watcher is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Counting down to the next cycle
    Idle,
    /// A cycle is in progress
    Scraping,
}

/// An immutable picture of the watcher's progress.
///
/// Observers receive a fresh snapshot on every change and never see partial
/// updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub mode: Mode,

    /// Cycles started since the process began
    pub run_number: u64,

    /// Site currently being scraped (empty when idle)
    pub current_site: String,

    /// 1-based index of `current_site` among all registered sites
    pub site_index: usize,
    pub site_count: usize,

    /// 1-based index of the URL being visited for `current_site`
    pub url_index: usize,
    pub url_count: usize,

    /// Records extracted in the current cycle
    pub jobs_scraped: usize,

    /// New records found in the current cycle
    pub new_jobs_found: usize,

    /// New records found since the process began
    pub total_new_jobs: usize,

    /// Human-readable progress line
    pub message: String,

    /// Seconds until the next cycle, while idle
    pub next_run_in: Option<u64>,

    /// When the last cycle finished
    pub last_run_at: Option<DateTime<Utc>>,

    /// When the current cycle started
    pub cycle_started_at: Option<DateTime<Utc>>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            mode: Mode::Idle,
            run_number: 0,
            current_site: String::new(),
            site_index: 0,
            site_count: 0,
            url_index: 0,
            url_count: 0,
            jobs_scraped: 0,
            new_jobs_found: 0,
            total_new_jobs: 0,
            message: "Initializing...".to_string(),
            next_run_in: None,
            last_run_at: None,
            cycle_started_at: None,
        }
    }
}

impl StatusSnapshot {
    /// URL progress through the current site, as a whole percentage.
    pub fn progress_percent(&self) -> u8 {
        if self.url_count == 0 {
            return 0;
        }
        ((self.url_index * 100) / self.url_count).min(100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        let mut status = StatusSnapshot::default();
        assert_eq!(status.progress_percent(), 0);

        status.url_index = 1;
        status.url_count = 4;
        assert_eq!(status.progress_percent(), 25);

        status.url_index = 4;
        assert_eq!(status.progress_percent(), 100);
    }
}
