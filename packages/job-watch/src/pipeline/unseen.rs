//! The unseen-jobs index: one-off lookups and the periodic status refresh.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::status::StatusBoard;
use crate::error::StoreResult;
use crate::traits::store::JobStore;
use crate::types::job::UnseenJob;

/// Recompute the unseen index once and publish it.
pub async fn refresh_unseen(store: &dyn JobStore, status: &StatusBoard) -> StoreResult<usize> {
    let jobs = store.unseen_across_all_sites().await?;
    status.publish_unseen(&jobs);
    Ok(jobs.len())
}

/// Newest unseen job with `id`, optionally restricted to one site's ledger.
pub async fn find_unseen(
    store: &dyn JobStore,
    id: &str,
    site: Option<&str>,
) -> StoreResult<Option<UnseenJob>> {
    let jobs = store.unseen_across_all_sites().await?;
    Ok(jobs
        .into_iter()
        .find(|u| u.job.id == id && site.map_or(true, |s| s == u.site)))
}

/// Publish the unseen index immediately and then every `every`, until
/// `shutdown` is cancelled. Store failures are logged and retried on the
/// next tick.
pub fn spawn_unseen_refresh(
    store: Arc<dyn JobStore>,
    status: Arc<StatusBoard>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = refresh_unseen(store.as_ref(), &status).await {
                        warn!(error = %e, "Failed to refresh unseen jobs");
                    }
                }
            }
        }
    })
}
