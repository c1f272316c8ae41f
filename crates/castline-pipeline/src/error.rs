//! Error taxonomy: feed-scoped, item-scoped and run-fatal failures

use std::fmt;
use std::time::Duration;

use castline_store::StateError;

/// Error type returned by collaborator implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Feed could not be polled, or returned no entries. Skips one feed only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUnavailable {
    pub feed_id: String,
    pub reason: String,
}

impl FeedUnavailable {
    pub fn new(feed_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FeedUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feed {} unavailable: {}", self.feed_id, self.reason)
    }
}

impl std::error::Error for FeedUnavailable {}

/// Per-item pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Summarize,
    Synthesize,
}

impl Stage {
    /// Progress label while the stage is running
    pub fn verb(self) -> &'static str {
        match self {
            Self::Extract => "extracting",
            Self::Summarize => "summarizing",
            Self::Synthesize => "synthesizing",
        }
    }

    fn failure_kind(self) -> &'static str {
        match self {
            Self::Extract => "extraction failed",
            Self::Summarize => "summarization failed",
            Self::Synthesize => "synthesis failed",
        }
    }
}

/// Why a stage failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    Timeout(Duration),
    Failed(String),
}

/// Item-scoped failure: `ExtractionFailed`, `SummarizationFailed` or
/// `SynthesisFailed`, optionally tagged as a timeout.
///
/// Captured as data in a failed processing record, never propagated
/// as a run failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub stage: Stage,
    pub cause: Cause,
}

impl ItemError {
    pub fn failed(stage: Stage, reason: impl fmt::Display) -> Self {
        Self {
            stage,
            cause: Cause::Failed(reason.to_string()),
        }
    }

    pub fn timeout(stage: Stage, after: Duration) -> Self {
        Self {
            stage,
            cause: Cause::Timeout(after),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, Cause::Timeout(_))
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.stage.failure_kind();
        match &self.cause {
            Cause::Timeout(after) => {
                write!(f, "{kind}: timeout after {:.1}s", after.as_secs_f64())
            }
            Cause::Failed(reason) => write!(f, "{kind}: {reason}"),
        }
    }
}

impl std::error::Error for ItemError {}

/// Run-fatal failure. Reported before any state mutation reaches disk.
#[derive(Debug)]
pub enum RunError {
    /// No feeds configured
    NoFeeds,
    /// The state file exists but cannot be trusted
    CorruptState(StateError),
    /// The state file could not be read
    StateUnreadable(StateError),
    /// Writing the state file failed; on-disk state is unchanged
    Persist(StateError),
}

impl RunError {
    /// Process exit code for an aborted run
    pub fn exit_code(&self) -> u8 {
        2
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFeeds => f.write_str("no feeds configured"),
            Self::CorruptState(e) => write!(f, "refusing to run: {e}"),
            Self::StateUnreadable(e) => write!(f, "cannot read state: {e}"),
            Self::Persist(e) => write!(f, "failed to persist state: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoFeeds => None,
            Self::CorruptState(e) | Self::StateUnreadable(e) | Self::Persist(e) => Some(e),
        }
    }
}

impl From<StateError> for RunError {
    fn from(e: StateError) -> Self {
        if e.is_corrupt() {
            Self::CorruptState(e)
        } else {
            Self::StateUnreadable(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_error_display() {
        let e = ItemError::failed(Stage::Synthesize, "quota exceeded");
        assert_eq!(e.to_string(), "synthesis failed: quota exceeded");
        assert!(!e.is_timeout());

        let e = ItemError::timeout(Stage::Extract, Duration::from_secs(30));
        assert_eq!(e.to_string(), "extraction failed: timeout after 30.0s");
        assert!(e.is_timeout());
    }

    #[test]
    fn feed_unavailable_display() {
        let e = FeedUnavailable::new("bbc", "HTTP 503");
        assert_eq!(e.to_string(), "feed bbc unavailable: HTTP 503");
    }

    #[test]
    fn run_error_from_state_error() {
        let path = std::path::Path::new("/tmp/state.json");
        let corrupt = StateError::Corrupt {
            path: path.to_path_buf(),
            reason: "bad".into(),
        };
        assert!(matches!(RunError::from(corrupt), RunError::CorruptState(_)));

        let io = StateError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let err = RunError::from(io);
        assert!(matches!(err, RunError::StateUnreadable(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
