//! Feed entries as produced by the poller and as dispatched to workers

use chrono::{DateTime, Utc};

/// One entry as returned by a [`FeedPoller`](crate::FeedPoller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Stable identifier (canonical URL or GUID)
    pub item_id: String,
    /// Article location handed to the extractor
    pub url: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
}

/// A discovered, not yet processed feed item. Never mutated after discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDescriptor {
    pub feed_id: String,
    pub item_id: String,
    pub url: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
}

impl ItemDescriptor {
    pub fn from_raw(feed_id: &str, raw: RawEntry) -> Self {
        Self {
            feed_id: feed_id.to_string(),
            item_id: raw.item_id,
            url: raw.url,
            title: raw.title,
            published_at: raw.published_at,
        }
    }

    /// Short label for progress lines and logs.
    pub fn label(&self) -> String {
        if self.title.is_empty() {
            format!("{}: {}", self.feed_id, self.item_id)
        } else {
            format!("{}: {}", self.feed_id, self.title)
        }
    }
}
