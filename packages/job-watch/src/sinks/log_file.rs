use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::traits::sink::JobLog;
use crate::types::job::StoredJob;

/// Appends one block per new job to a text file.
///
/// ```text
/// 2024-05-01T10:20:30.456Z
/// Site: remoteok.com
/// Link: https://remoteok.com/remote-jobs/1001
/// From: https://remoteok.com/remote-rust-jobs
/// ```
pub struct AppendLog {
    path: PathBuf,
}

impl AppendLog {
    /// Log to `path`; parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn entry(site: &str, job: &StoredJob, timestamp: &str) -> String {
    let mut entry = format!("{timestamp}\nSite: {site}\nLink: {}\n", job.url);
    if !job.source.is_empty() {
        entry.push_str(&format!("From: {}\n", job.source));
    }
    entry.push('\n');
    entry
}

#[async_trait]
impl JobLog for AppendLog {
    async fn log(&self, site: &str, job: &StoredJob) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let timestamp = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry(site, job, &timestamp).as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::job::JobRecord;

    fn job(source: &str) -> StoredJob {
        JobRecord::new("1001", "https://remoteok.com/remote-jobs/1001", source)
            .into_stored(Utc::now(), false)
    }

    #[test]
    fn test_entry_format() {
        assert_eq!(
            entry("remoteok.com", &job("https://remoteok.com/"), "T"),
            "T\nSite: remoteok.com\nLink: https://remoteok.com/remote-jobs/1001\nFrom: https://remoteok.com/\n\n"
        );
        assert_eq!(
            entry("remoteok.com", &job(""), "T"),
            "T\nSite: remoteok.com\nLink: https://remoteok.com/remote-jobs/1001\n\n"
        );
    }

    #[tokio::test]
    async fn test_appends_and_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppendLog::new(dir.path().join("logs/jobs.log"));

        log.log("remoteok.com", &job("https://remoteok.com/")).await.unwrap();
        log.log("remoteok.com", &job("https://remoteok.com/")).await.unwrap();

        let contents = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert_eq!(contents.matches("Site: remoteok.com").count(), 2);
        assert!(contents.ends_with("\n\n"));
    }
}
