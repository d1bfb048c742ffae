//! Consumers of the run driver's output: job log, notifications and status.

use async_trait::async_trait;

use crate::types::job::{StoredJob, UnseenJob};
use crate::types::status::StatusSnapshot;

/// Append-only record of every new job.
#[async_trait]
pub trait JobLog: Send + Sync {
    /// Record one new job for `site`.
    async fn log(&self, site: &str, job: &StoredJob) -> std::io::Result<()>;
}

/// Fire-and-forget notification of a new job.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce one new job for `site`.
    async fn notify(&self, site: &str, job: &StoredJob) -> std::io::Result<()>;
}

/// Receives status snapshots. Implementations must not block.
pub trait StatusObserver: Send + Sync {
    /// A new snapshot replaced the previous one.
    fn update(&self, status: &StatusSnapshot);

    /// The unseen index was recomputed.
    fn unseen(&self, _jobs: &[UnseenJob]) {}
}
