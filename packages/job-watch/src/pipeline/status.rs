//! Shared status snapshot, updated in place and pushed to an observer.

use std::sync::{Arc, Mutex};

use crate::traits::sink::StatusObserver;
use crate::types::job::UnseenJob;
use crate::types::status::StatusSnapshot;

/// Current status shared by the scheduler and the run driver.
///
/// Every change is applied to a private snapshot and a full copy is
/// published to the observer.
pub struct StatusBoard {
    observer: Arc<dyn StatusObserver>,
    current: Mutex<StatusSnapshot>,
}

impl StatusBoard {
    pub fn new(observer: Arc<dyn StatusObserver>) -> Self {
        Self {
            observer,
            current: Mutex::new(StatusSnapshot::default()),
        }
    }

    /// Apply `change` and publish the resulting snapshot.
    pub fn update(&self, change: impl FnOnce(&mut StatusSnapshot)) {
        let snapshot = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            change(&mut current);
            current.clone()
        };
        self.observer.update(&snapshot);
    }

    /// Copy of the latest snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Publish a freshly computed unseen index.
    pub fn publish_unseen(&self, jobs: &[UnseenJob]) {
        self.observer.unseen(jobs);
    }
}
