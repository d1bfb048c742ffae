//! Bounded-retention store for per-site page captures.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::browser::Capture;

/// Writes captures to `{dir}/{site}_{timestamp}.{ext}`, keeping at most
/// `max_per_site` files for each site.
pub struct ScreenshotStore {
    dir: PathBuf,
    max_per_site: usize,
}

impl ScreenshotStore {
    /// Create a store. `max_per_site` is clamped to at least one.
    pub fn new(dir: impl Into<PathBuf>, max_per_site: usize) -> Self {
        Self {
            dir: dir.into(),
            max_per_site: max_per_site.max(1),
        }
    }

    /// Directory holding the captures.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Existing captures for `site`, oldest first.
    pub async fn captures_for_site(&self, site: &str) -> StoreResult<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let prefix = format!("{site}_");
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(&prefix) && is_capture(name) {
                files.push(entry.path());
            }
        }

        // Timestamps sort lexicographically
        files.sort();
        Ok(files)
    }

    /// Write a new capture for `site`, first deleting the oldest ones so
    /// that at most `max_per_site` remain afterwards.
    pub async fn save(&self, site: &str, capture: &Capture) -> StoreResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        self.prune(site).await?;

        let path = self.dir.join(file_name(site, Utc::now(), capture.format.extension()));
        tokio::fs::write(&path, &capture.bytes)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        debug!(site = %site, path = %path.display(), "Saved page capture");
        Ok(path)
    }

    async fn prune(&self, site: &str) -> StoreResult<()> {
        let existing = self.captures_for_site(site).await?;
        if existing.len() < self.max_per_site {
            return Ok(());
        }

        let excess = existing.len() + 1 - self.max_per_site;
        for path in existing.into_iter().take(excess) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| StoreError::io(&path, e))?;
        }
        Ok(())
    }
}

fn is_capture(name: &str) -> bool {
    name.ends_with(".png") || name.ends_with(".html")
}

fn file_name(site: &str, at: DateTime<Utc>, extension: &str) -> String {
    let timestamp = at
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{site}_{timestamp}.{extension}")
}
