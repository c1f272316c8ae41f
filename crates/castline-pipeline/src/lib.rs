//! Castline Pipeline - discovery, stage pipeline and run orchestration
//!
//! Turns configured feeds into audio digests: new items are discovered
//! against the persisted state, pushed through extract → summarize →
//! synthesize on a bounded worker pool, and their outcomes committed back
//! to the state store once per run.
//!
//! # Example
//!
//! ```no_run
//! use castline_core::{ProgressContext, Shutdown};
//! use castline_pipeline::{Collaborators, Config, Coordinator, FeedSource};
//!
//! fn digest(collaborators: &Collaborators) {
//!     let config = Config {
//!         feeds: vec![FeedSource::named("bbc", "https://feeds.bbci.co.uk/news/rss.xml")],
//!         ..Default::default()
//!     };
//!     let shutdown = Shutdown::new();
//!     let progress = ProgressContext::hidden();
//!     let summary = Coordinator::new(&config, collaborators, &shutdown, &progress)
//!         .run_once()
//!         .expect("run aborted");
//!     println!("{} items succeeded", summary.succeeded);
//! }
//! ```

pub mod config;
pub mod discover;
pub mod error;
pub mod item;
pub mod output;
pub mod pipeline;
pub mod runner;
pub mod scheduler;
pub mod traits;

// Re-exports for convenience
pub use config::{Config, FeedSource};
pub use discover::discover;
pub use error::{BoxError, Cause, FeedUnavailable, ItemError, RunError, Stage};
pub use item::{ItemDescriptor, RawEntry};
pub use output::{artifact_path, feed_slug, transcript_path};
pub use pipeline::{ItemOutcome, Pipeline};
pub use runner::{Coordinator, Phase, RunSummary};
pub use scheduler::{Mode, ScheduleReport, Scheduler, run_periodic};
pub use traits::{Collaborators, Extractor, FeedPoller, Summarizer, Synthesizer};
