//! File-backed job ledger: one pretty-printed JSON array per site.

use async_trait::async_trait;
use chrono::Utc;
use fs2::FileExt;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::store::JobStore;
use crate::types::job::{JobRecord, StoredJob, UnseenJob};

const LEDGER_EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

/// Job store persisting each site's ledger to `{data_dir}/{site}.json`.
///
/// Every mutation rewrites the whole file through a uniquely named temp file
/// that is then renamed over the ledger, so readers never see a partial write.
///
/// Read-modify-write cycles are serialised at two levels: a per-site async
/// lock between tasks of this process, then an exclusive advisory lock on
/// `{data_dir}/{site}.lock` between processes. The watcher and a
/// `mark-seen` invocation may therefore share a data directory.
pub struct FileLedgerStore {
    data_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileLedgerStore {
    /// Create a store rooted at `data_dir`. The directory is created lazily.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Directory holding the ledgers.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of `site`'s ledger file.
    pub fn ledger_path(&self, site: &str) -> PathBuf {
        self.data_dir.join(format!("{site}.{LEDGER_EXTENSION}"))
    }

    fn lock_for(&self, site: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(site.to_string()).or_default().clone()
    }

    async fn ensure_data_dir(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StoreError::io(&self.data_dir, e))
    }

    async fn read_ledger(&self, path: &Path) -> StoreResult<Vec<StoredJob>> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        serde_json::from_slice(&raw).map_err(|e| StoreError::json(path, e))
    }

    async fn write_ledger(&self, path: &Path, jobs: &[StoredJob]) -> StoreResult<()> {
        self.ensure_data_dir().await?;

        let body = serde_json::to_vec_pretty(jobs).map_err(|e| StoreError::json(path, e))?;
        let dir = self.data_dir.clone();
        let target = path.to_path_buf();
        blocking(move || {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&body)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::io(path, e))
    }

    /// Take the cross-process lock for `site`, waiting for other holders.
    async fn lock_ledger(&self, site: &str) -> StoreResult<LedgerLock> {
        self.ensure_data_dir().await?;

        let path = self.data_dir.join(format!("{site}.{LOCK_EXTENSION}"));
        let lock_path = path.clone();
        let file = blocking(move || {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| StoreError::io(&path, e))?;

        Ok(LedgerLock { _file: file })
    }

    /// Site ids of every ledger on disk, sorted.
    pub async fn sites(&self) -> StoreResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.data_dir, e)),
        };

        let mut sites = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.data_dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LEDGER_EXTENSION) {
                continue;
            }
            if let Some(site) = path.file_stem().and_then(|s| s.to_str()) {
                sites.push(site.to_string());
            }
        }
        sites.sort();
        Ok(sites)
    }

    /// Flip `seen` on `job_id` in `site`'s ledger while holding its lock.
    async fn flip_seen(&self, site: &str, job_id: &str) -> StoreResult<bool> {
        let path = self.ledger_path(site);
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        if !exists {
            return Ok(false);
        }

        let lock = self.lock_for(site);
        let _guard = lock.lock().await;
        let _ledger_lock = self.lock_ledger(site).await?;

        let mut jobs = self.read_ledger(&path).await?;
        let mut changed = false;
        for job in jobs.iter_mut().filter(|j| j.id == job_id && !j.seen) {
            job.seen = true;
            changed = true;
        }

        if changed {
            self.write_ledger(&path, &jobs).await?;
            debug!(site = %site, job_id = %job_id, "Marked job as seen");
        }
        Ok(changed)
    }
}

/// Held advisory lock on a ledger's lock file. Dropping it closes the file,
/// which releases the lock.
struct LedgerLock {
    _file: std::fs::File,
}

/// Run blocking file work off the async workers.
async fn blocking<T, F>(work: F) -> std::io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(std::io::Error::other)?
}

#[async_trait]
impl JobStore for FileLedgerStore {
    async fn is_first_run(&self, site: &str) -> StoreResult<bool> {
        let path = self.ledger_path(site);
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        Ok(!exists)
    }

    async fn load(&self, site: &str) -> StoreResult<Vec<StoredJob>> {
        let lock = self.lock_for(site);
        let _guard = lock.lock().await;
        self.read_ledger(&self.ledger_path(site)).await
    }

    async fn reconcile(
        &self,
        site: &str,
        records: Vec<JobRecord>,
        is_first_run: bool,
    ) -> StoreResult<Vec<StoredJob>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let lock = self.lock_for(site);
        let _guard = lock.lock().await;
        let _ledger_lock = self.lock_ledger(site).await?;

        let path = self.ledger_path(site);
        let mut ledger = self.read_ledger(&path).await?;
        let mut known: HashSet<String> = ledger.iter().map(|j| j.id.clone()).collect();

        let now = Utc::now();
        let new_jobs: Vec<StoredJob> = records
            .into_iter()
            // `insert` also drops repeats within the same scrape
            .filter(|r| known.insert(r.id.clone()))
            .map(|r| r.into_stored(now, is_first_run))
            .collect();

        if new_jobs.is_empty() {
            return Ok(Vec::new());
        }

        ledger.extend(new_jobs.iter().cloned());
        self.write_ledger(&path, &ledger).await?;

        info!(
            site = %site,
            new_jobs = new_jobs.len(),
            ledger_size = ledger.len(),
            first_run = is_first_run,
            "Ledger updated"
        );

        if is_first_run {
            Ok(Vec::new())
        } else {
            Ok(new_jobs)
        }
    }

    async fn unseen_across_all_sites(&self) -> StoreResult<Vec<UnseenJob>> {
        let mut unseen = Vec::new();
        for site in self.sites().await? {
            for job in self.load(&site).await?.into_iter().filter(|j| !j.seen) {
                unseen.push(UnseenJob {
                    site: site.clone(),
                    job,
                });
            }
        }

        unseen.sort_by(|a, b| b.job.date.cmp(&a.job.date));
        Ok(unseen)
    }

    async fn mark_seen(&self, job_id: &str) -> StoreResult<Option<String>> {
        for site in self.sites().await? {
            if self.flip_seen(&site, job_id).await? {
                return Ok(Some(site));
            }
        }
        Ok(None)
    }

    async fn mark_seen_in(&self, site: &str, job_id: &str) -> StoreResult<bool> {
        self.flip_seen(site, job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    fn record(id: &str) -> JobRecord {
        JobRecord::new(
            id,
            format!("https://example.com/{id}"),
            "https://example.com/jobs",
        )
    }

    fn store() -> (tempfile::TempDir, FileLedgerStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLedgerStore::new(dir.path().join("data"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_missing_ledger_is_first_run_and_loads_empty() {
        let (_dir, store) = store();
        assert!(store.is_first_run("example.com").await.unwrap());
        assert!(store.load("example.com").await.unwrap().is_empty());
        assert!(store.unseen_across_all_sites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_run_imports_as_seen_with_empty_delta() {
        let (_dir, store) = store();

        let delta = store
            .reconcile("example.com", vec![record("a")], true)
            .await
            .unwrap();

        assert!(delta.is_empty());
        let ledger = store.load("example.com").await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].id, "a");
        assert!(ledger[0].seen);
        assert!(!store.is_first_run("example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_second_scrape_returns_only_new_records() {
        let (_dir, store) = store();
        store
            .reconcile("example.com", vec![record("a")], true)
            .await
            .unwrap();

        let before = Utc::now();
        let delta = store
            .reconcile("example.com", vec![record("a"), record("b")], false)
            .await
            .unwrap();

        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].id, "b");
        assert_eq!(delta[0].url, "https://example.com/b");
        assert!(!delta[0].seen);
        assert!(delta[0].date >= before);
        assert_eq!(store.load("example.com").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let (_dir, store) = store();
        let records = vec![record("a"), record("b")];

        let first = store
            .reconcile("example.com", records.clone(), false)
            .await
            .unwrap();
        let second = store
            .reconcile("example.com", records, false)
            .await
            .unwrap();

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(store.load("example.com").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_scrape_leaves_ledger_untouched() {
        let (_dir, store) = store();
        let delta = store.reconcile("example.com", vec![], true).await.unwrap();

        assert!(delta.is_empty());
        assert!(store.is_first_run("example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_ids_stay_unique_across_and_within_scrapes() {
        let (_dir, store) = store();
        store
            .reconcile("example.com", vec![record("a"), record("a"), record("b")], false)
            .await
            .unwrap();
        store
            .reconcile("example.com", vec![record("b"), record("c"), record("c")], false)
            .await
            .unwrap();

        let ledger = store.load("example.com").await.unwrap();
        let ids: Vec<_> = ledger.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_ledger_is_pretty_printed_json_array() {
        let (_dir, store) = store();
        store
            .reconcile("example.com", vec![record("a")], false)
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(store.ledger_path("example.com"))
            .await
            .unwrap();
        assert!(raw.starts_with("[\n  {"));
        let parsed: Vec<StoredJob> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_seen_removes_from_unseen_index() {
        let (_dir, store) = store();
        store
            .reconcile("example.com", vec![record("a")], true)
            .await
            .unwrap();
        store
            .reconcile("example.com", vec![record("a"), record("b")], false)
            .await
            .unwrap();

        let unseen = store.unseen_across_all_sites().await.unwrap();
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen[0].job.id, "b");
        assert_eq!(unseen[0].site, "example.com");

        let site = store.mark_seen("b").await.unwrap();
        assert_eq!(site.as_deref(), Some("example.com"));

        let ledger = store.load("example.com").await.unwrap();
        assert!(ledger.iter().all(|j| j.seen));
        assert!(store.unseen_across_all_sites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seen_never_reverts() {
        let (_dir, store) = store();
        store
            .reconcile("example.com", vec![record("a")], false)
            .await
            .unwrap();
        assert!(store.mark_seen_in("example.com", "a").await.unwrap());

        // Seeing the same job again must not reset the flag
        store
            .reconcile("example.com", vec![record("a")], false)
            .await
            .unwrap();
        assert!(store.load("example.com").await.unwrap()[0].seen);

        // Marking twice is a no-op
        assert!(!store.mark_seen_in("example.com", "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_seen_first_match_only_touches_one_ledger() {
        let (_dir, store) = store();
        store.reconcile("a.example.com", vec![record("x")], false).await.unwrap();
        store.reconcile("b.example.com", vec![record("x")], false).await.unwrap();

        assert_eq!(
            store.mark_seen("x").await.unwrap().as_deref(),
            Some("a.example.com")
        );
        assert!(!store.load("b.example.com").await.unwrap()[0].seen);

        assert!(store.mark_seen_in("b.example.com", "x").await.unwrap());
        assert_eq!(store.mark_seen("x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unseen_sorted_newest_first() {
        let (_dir, store) = store();
        let base = DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ledger_a = vec![
            record("old").into_stored(base, false),
            record("seen").into_stored(base + Duration::hours(5), true),
            record("newest").into_stored(base + Duration::hours(3), false),
        ];
        let ledger_b = vec![record("middle").into_stored(base + Duration::hours(2), false)];

        store
            .write_ledger(&store.ledger_path("a.example.com"), &ledger_a)
            .await
            .unwrap();
        store
            .write_ledger(&store.ledger_path("b.example.com"), &ledger_b)
            .await
            .unwrap();

        let unseen = store.unseen_across_all_sites().await.unwrap();
        let ids: Vec<_> = unseen.iter().map(|u| u.job.id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "middle", "old"]);
        assert!(unseen.windows(2).all(|w| w[0].job.date >= w[1].job.date));
    }

    #[tokio::test]
    async fn test_malformed_ledger_surfaces_error() {
        let (_dir, store) = store();
        store.ensure_data_dir().await.unwrap();
        tokio::fs::write(store.ledger_path("example.com"), "not json")
            .await
            .unwrap();

        let err = store
            .reconcile("example.com", vec![record("a")], false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }

    #[tokio::test]
    async fn test_lock_and_temp_files_are_not_listed_as_sites() {
        let (_dir, store) = store();
        store
            .reconcile("example.com", vec![record("a")], false)
            .await
            .unwrap();
        store.mark_seen_in("example.com", "a").await.unwrap();

        assert!(store.data_dir().join("example.com.lock").exists());
        assert_eq!(store.sites().await.unwrap(), vec!["example.com"]);
    }

    #[tokio::test]
    async fn test_mark_seen_in_unknown_site_creates_nothing() {
        let (_dir, store) = store();

        assert!(!store.mark_seen_in("nowhere.example.com", "a").await.unwrap());
        assert!(!store.data_dir().exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_stores_sharing_a_directory_keep_every_update() {
        let dir = tempfile::tempdir().unwrap();
        // Separate instances share no in-process lock, like two processes
        let watcher = Arc::new(FileLedgerStore::new(dir.path()));
        let cli = Arc::new(FileLedgerStore::new(dir.path()));

        for round in 0..10 {
            let acked = format!("acked-{round}");
            watcher
                .reconcile("example.com", vec![record(&acked)], false)
                .await
                .unwrap();

            let scrape = {
                let watcher = Arc::clone(&watcher);
                tokio::spawn(async move {
                    for i in 0..5 {
                        watcher
                            .reconcile(
                                "example.com",
                                vec![record(&format!("job-{round}-{i}"))],
                                false,
                            )
                            .await
                            .unwrap();
                    }
                })
            };
            let ack = {
                let cli = Arc::clone(&cli);
                let acked = acked.clone();
                tokio::spawn(async move { cli.mark_seen_in("example.com", &acked).await.unwrap() })
            };

            scrape.await.unwrap();
            assert!(ack.await.unwrap());

            let ledger = cli.load("example.com").await.unwrap();
            let acked_job = ledger.iter().find(|j| j.id == acked).unwrap();
            assert!(acked_job.seen, "round {round}: acknowledgement lost");
            for i in 0..5 {
                let id = format!("job-{round}-{i}");
                assert!(
                    ledger.iter().any(|j| j.id == id),
                    "round {round}: {id} lost"
                );
            }
        }

        let ledger = watcher.load("example.com").await.unwrap();
        assert_eq!(ledger.len(), 60);
        assert_eq!(ledger.iter().filter(|j| j.seen).count(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_reconciles_do_not_lose_records() {
        let (_dir, store) = store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .reconcile("example.com", vec![record(&format!("job-{i}"))], false)
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().len(), 1);
        }

        assert_eq!(store.load("example.com").await.unwrap().len(), 8);
    }
}
