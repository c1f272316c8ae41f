//! Castline Adapters - concrete collaborators for the digest pipeline
//!
//! Feed polling (`feed-rs`), article extraction (`scraper`), extractive
//! summarization and speech synthesis, each implementing one capability
//! trait from `castline-pipeline`.

pub mod extract;
pub mod feed;
pub mod summarize;
pub mod tts;

pub use extract::{HtmlExtractor, extract_paragraphs};
pub use feed::{HttpFeedPoller, parse_feed};
pub use summarize::{FrequencySummarizer, summarize};
pub use tts::{GoogleTts, TranscriptWriter, split_chunks, synthesizer_by_name};
