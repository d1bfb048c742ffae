//! Job store trait.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::job::{JobRecord, StoredJob, UnseenJob};

/// Durable per-site ledger of previously seen jobs.
///
/// All operations except `unseen_across_all_sites` and `mark_seen` are
/// scoped to one site.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// True iff no ledger exists yet for `site`.
    async fn is_first_run(&self, site: &str) -> StoreResult<bool>;

    /// The persisted ledger, or an empty list if there is none.
    async fn load(&self, site: &str) -> StoreResult<Vec<StoredJob>>;

    /// Reduce a scrape against the ledger and persist the new records.
    ///
    /// Returns the delta of new records, except on a first run where the
    /// records are imported as already seen and the returned delta is empty.
    async fn reconcile(
        &self,
        site: &str,
        records: Vec<JobRecord>,
        is_first_run: bool,
    ) -> StoreResult<Vec<StoredJob>>;

    /// Every unseen record across all ledgers, newest first.
    async fn unseen_across_all_sites(&self) -> StoreResult<Vec<UnseenJob>>;

    /// Flip `seen` on the first record with `job_id` in any ledger.
    ///
    /// Ids are not globally unique; prefer [`JobStore::mark_seen_in`].
    /// Returns the site whose ledger changed, if any.
    async fn mark_seen(&self, job_id: &str) -> StoreResult<Option<String>>;

    /// Flip `seen` on the record `job_id` in `site`'s ledger.
    ///
    /// Returns whether a record was changed.
    async fn mark_seen_in(&self, site: &str, job_id: &str) -> StoreResult<bool>;
}
