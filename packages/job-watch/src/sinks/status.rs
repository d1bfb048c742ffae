use std::sync::Mutex;
use tracing::{debug, info};

use crate::traits::sink::StatusObserver;
use crate::types::job::UnseenJob;
use crate::types::status::{Mode, StatusSnapshot};

/// Reports status snapshots as log events.
///
/// Countdown ticks are only logged once a minute to keep the log readable.
#[derive(Default)]
pub struct TracingStatus {
    last_unseen: Mutex<Option<usize>>,
}

impl TracingStatus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusObserver for TracingStatus {
    fn update(&self, status: &StatusSnapshot) {
        match status.mode {
            Mode::Idle => match status.next_run_in {
                Some(secs) if secs % 60 == 0 => {
                    info!(run = status.run_number, "Next scrape in {}", format_clock(secs))
                }
                Some(_) => {}
                None => info!(
                    run = status.run_number,
                    total_new_jobs = status.total_new_jobs,
                    "{}",
                    status.message
                ),
            },
            Mode::Scraping => debug!(
                run = status.run_number,
                site = %status.current_site,
                site_index = status.site_index,
                site_count = status.site_count,
                url_index = status.url_index,
                url_count = status.url_count,
                progress = status.progress_percent(),
                jobs_scraped = status.jobs_scraped,
                new_jobs = status.new_jobs_found,
                "{}",
                status.message
            ),
        }
    }

    fn unseen(&self, jobs: &[UnseenJob]) {
        let mut last = self.last_unseen.lock().unwrap_or_else(|e| e.into_inner());
        if *last != Some(jobs.len()) {
            info!(unseen = jobs.len(), "Unseen jobs");
            *last = Some(jobs.len());
        }
    }
}

/// `mm:ss`, as shown in the countdown.
fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(599), "09:59");
        assert_eq!(format_clock(3600), "60:00");
    }
}
