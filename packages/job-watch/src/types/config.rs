//! Configuration types for watch targets, cycles and scheduling.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// The watch target document (`config.json`).
///
/// ```json
/// {
///   "urls": ["https://nodesk.co/remote-jobs/engineering/"],
///   "tags": { "nodesk.co": ["Worldwide", "Europe"] }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Every listing page to visit, across all sites
    pub urls: Vec<String>,

    /// Optional per-site filter vocabulary, keyed by site id
    #[serde(default)]
    pub tags: HashMap<String, Vec<String>>,
}

impl WatchConfig {
    /// Create a config from a URL list with no tags.
    pub fn new(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            tags: HashMap::new(),
        }
    }

    /// Add a tag vocabulary for a site.
    pub fn with_tags(
        mut self,
        site: impl Into<String>,
        tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.tags
            .insert(site.into(), tags.into_iter().map(Into::into).collect());
        self
    }

    /// Load the document once at startup.
    ///
    /// A missing file is reported as [`ConfigError::Missing`] so the caller
    /// can exit before any scraping starts.
    pub async fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Pacing and timeouts for one cycle of the run driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleConfig {
    /// Delay before every URL of a site except the first
    pub cooldown: Duration,

    /// Bound on navigation and on waiting for the job list
    pub page_timeout: Duration,

    /// Pause after a URL fails before moving on
    pub error_delay: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(2000),
            page_timeout: Duration::from_secs(30),
            error_delay: Duration::from_millis(3000),
        }
    }
}

impl CycleConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-URL cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the navigation / readiness timeout.
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Set the delay after a failed URL.
    pub fn with_error_delay(mut self, delay: Duration) -> Self {
        self.error_delay = delay;
        self
    }

    /// No pauses at all (tests).
    pub fn immediate() -> Self {
        Self {
            cooldown: Duration::ZERO,
            page_timeout: Duration::from_secs(5),
            error_delay: Duration::ZERO,
        }
    }
}

/// When the scheduler runs cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Nominal time between cycles
    pub base_interval: Duration,

    /// Half-width of the uniform jitter window added to `base_interval`
    pub jitter: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(600),
            jitter: Duration::from_secs(120),
        }
    }
}

impl ScheduleConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base interval.
    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    /// Set the jitter window.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = WatchConfig::load(dir.path().join("config.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[tokio::test]
    async fn test_load_config_without_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"urls":["https://remoteok.com/remote-dev-jobs"]}"#)
            .await
            .unwrap();

        let config = WatchConfig::load(&path).await.unwrap();
        assert_eq!(config.urls, vec!["https://remoteok.com/remote-dev-jobs"]);
        assert!(config.tags.is_empty());
    }

    #[tokio::test]
    async fn test_load_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, "{\"urls\": 3}").await.unwrap();

        let err = WatchConfig::load(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
