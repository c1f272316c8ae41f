//! Runtime configuration for a digest run

use std::path::PathBuf;
use std::time::Duration;

/// One syndicated feed to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    /// Display name; doubles as the feed identifier when set
    pub name: Option<String>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
        }
    }

    pub fn named(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: Some(name.into()),
        }
    }

    /// Stable identifier keying state for this feed.
    pub fn id(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// Runtime configuration, assembled by the binary from file and flags.
#[derive(Debug, Clone)]
pub struct Config {
    pub feeds: Vec<FeedSource>,
    /// Root of the date-partitioned artifact tree
    pub output_dir: PathBuf,
    pub state_file: PathBuf,
    /// Worker pool size, also the bound on in-flight collaborator calls
    pub workers: usize,
    pub max_sentences: usize,
    /// Per-feed dispatch cap; `None` = unlimited
    pub max_items_per_feed: Option<usize>,
    /// Write `<artifact>.txt` with the condensed text
    pub transcripts: bool,
    pub feed_timeout: Duration,
    pub extract_timeout: Duration,
    pub synthesize_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            output_dir: PathBuf::from("output"),
            state_file: PathBuf::from("state.json"),
            workers: 4,
            max_sentences: 5,
            max_items_per_feed: Some(3),
            transcripts: true,
            feed_timeout: Duration::from_secs(20),
            extract_timeout: Duration::from_secs(30),
            synthesize_timeout: Duration::from_secs(120),
        }
    }
}
