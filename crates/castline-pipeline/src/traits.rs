//! Collaborator capabilities injected at startup
//!
//! Each capability is one narrow method. The I/O-bound ones are async so a
//! worker can drop them at their deadline; summarization is pure and sync.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::FeedSource;
use crate::error::{BoxError, FeedUnavailable};
use crate::item::RawEntry;

/// Turns a feed source into its current entries.
#[async_trait]
pub trait FeedPoller: Send + Sync {
    async fn poll(&self, feed: &FeedSource) -> Result<Vec<RawEntry>, FeedUnavailable>;
}

/// Fetches an article and returns its readable text.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract_text(&self, url: &str) -> Result<String, BoxError>;
}

/// Condenses text to at most `max_sentences` sentences.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, text: &str, max_sentences: usize) -> Result<String, BoxError>;
}

/// Renders text into an artifact at `output`.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), BoxError>;

    /// Extension of the produced artifact, without the dot
    fn file_extension(&self) -> &'static str {
        "mp3"
    }

    fn name(&self) -> &'static str;
}

/// The full set of collaborators a run needs.
#[derive(Clone)]
pub struct Collaborators {
    pub poller: Arc<dyn FeedPoller>,
    pub extractor: Arc<dyn Extractor>,
    pub summarizer: Arc<dyn Summarizer>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("synthesizer", &self.synthesizer.name())
            .finish_non_exhaustive()
    }
}
