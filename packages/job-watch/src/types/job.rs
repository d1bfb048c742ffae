//! Job records - raw scrape output and the persisted ledger entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job as extracted from a listing page.
///
/// `id` is only unique within one site's scrape. It is derived from the job
/// URL path or the DOM element id, never from anything time-dependent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Stable identifier within the site
    pub id: String,

    /// Canonical link to the posting
    pub url: String,

    /// Listing page the record was extracted from (provenance, not identity)
    #[serde(default)]
    pub source: String,
}

impl JobRecord {
    /// Create a new raw record.
    pub fn new(id: impl Into<String>, url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            source: source.into(),
        }
    }

    /// Stamp the record for persistence.
    pub fn into_stored(self, date: DateTime<Utc>, seen: bool) -> StoredJob {
        StoredJob {
            id: self.id,
            url: self.url,
            source: self.source,
            date,
            seen,
        }
    }
}

/// A ledger entry: a raw record plus when it was first observed and whether
/// a human has acknowledged it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredJob {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub source: String,

    /// First observation; never updated afterwards
    pub date: DateTime<Utc>,

    /// Only ever flips from `false` to `true`
    pub seen: bool,
}

impl StoredJob {
    /// The raw record this entry was created from.
    pub fn record(&self) -> JobRecord {
        JobRecord::new(&self.id, &self.url, &self.source)
    }
}

/// An unseen job together with the site whose ledger holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnseenJob {
    pub site: String,
    #[serde(flatten)]
    pub job: StoredJob,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_job_serializes_with_ledger_field_names() {
        let date = DateTime::parse_from_rfc3339("2024-05-01T10:00:00.000Z")
            .unwrap()
            .with_timezone(&Utc);
        let stored = JobRecord::new("a", "https://example.com/a", "https://example.com/")
            .into_stored(date, false);

        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["url"], "https://example.com/a");
        assert_eq!(value["source"], "https://example.com/");
        assert_eq!(value["seen"], false);
        assert!(value["date"].as_str().unwrap().starts_with("2024-05-01T10:00:00"));
    }

    #[test]
    fn test_ledger_entries_without_source_still_load() {
        let json = r#"{"id":"x","url":"https://example.com/x","date":"2024-05-01T10:00:00.000Z","seen":true}"#;
        let stored: StoredJob = serde_json::from_str(json).unwrap();
        assert_eq!(stored.source, "");
        assert!(stored.seen);
    }
}
