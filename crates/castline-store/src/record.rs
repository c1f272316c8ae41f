//! Durable entities: per-item processing records and per-feed state

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of the last processing attempt for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Succeeded,
    Failed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        })
    }
}

/// Record of one item's processing outcome, keyed by `(feed_id, item_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingRecord {
    pub feed_id: String,
    pub item_id: String,
    pub published_at: DateTime<Utc>,
    pub status: ItemStatus,
    /// Audio artifact, set when `status` is `Succeeded`
    pub output_path: Option<PathBuf>,
    pub processed_at: DateTime<Utc>,
    /// Human-readable failure, set when `status` is `Failed`
    pub failure_reason: Option<String>,
}

impl ProcessingRecord {
    pub fn succeeded(
        feed_id: impl Into<String>,
        item_id: impl Into<String>,
        published_at: DateTime<Utc>,
        output_path: PathBuf,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            feed_id: feed_id.into(),
            item_id: item_id.into(),
            published_at,
            status: ItemStatus::Succeeded,
            output_path: Some(output_path),
            processed_at,
            failure_reason: None,
        }
    }

    pub fn failed(
        feed_id: impl Into<String>,
        item_id: impl Into<String>,
        published_at: DateTime<Utc>,
        reason: impl Into<String>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            feed_id: feed_id.into(),
            item_id: item_id.into(),
            published_at,
            status: ItemStatus::Failed,
            output_path: None,
            processed_at,
            failure_reason: Some(reason.into()),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == ItemStatus::Succeeded
    }

    pub(crate) fn to_stored(&self) -> StoredRecord {
        StoredRecord {
            published_at: self.published_at,
            status: self.status,
            output_path: self.output_path.clone(),
            processed_at: self.processed_at,
            failure_reason: self.failure_reason.clone(),
        }
    }
}

/// Per-feed state: publication time of the newest successfully processed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedState {
    pub feed_id: String,
    pub high_water: DateTime<Utc>,
}

/// On-disk form of a record; the key carries feed and item ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    pub published_at: DateTime<Utc>,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub processed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl StoredRecord {
    pub(crate) fn into_record(self, feed_id: &str, item_id: &str) -> ProcessingRecord {
        ProcessingRecord {
            feed_id: feed_id.to_string(),
            item_id: item_id.to_string(),
            published_at: self.published_at,
            status: self.status,
            output_path: self.output_path,
            processed_at: self.processed_at,
            failure_reason: self.failure_reason,
        }
    }
}

/// On-disk form of a feed state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredFeed {
    pub high_water: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn succeeded_record_has_path_only() {
        let r = ProcessingRecord::succeeded("f", "a", ts(10), PathBuf::from("out/a.mp3"), ts(20));
        assert!(r.is_succeeded());
        assert_eq!(r.output_path, Some(PathBuf::from("out/a.mp3")));
        assert!(r.failure_reason.is_none());
    }

    #[test]
    fn failed_record_has_reason_only() {
        let r = ProcessingRecord::failed("f", "a", ts(10), "synthesis failed: quota", ts(20));
        assert!(!r.is_succeeded());
        assert!(r.output_path.is_none());
        assert_eq!(r.failure_reason.as_deref(), Some("synthesis failed: quota"));
    }

    #[test]
    fn stored_round_trip_keeps_fields() {
        let r = ProcessingRecord::failed("f", "a", ts(10), "boom", ts(20));
        let back = r.to_stored().into_record("f", "a");
        assert_eq!(back, r);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ItemStatus::Succeeded).unwrap(),
            "\"succeeded\""
        );
        assert_eq!(format!("{}", ItemStatus::Failed), "failed");
    }
}
