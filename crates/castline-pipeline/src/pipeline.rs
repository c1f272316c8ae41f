//! Per-item stage pipeline and the bounded worker pool running it

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::Sender;

use castline_core::{DeadlineExceeded, ProgressContext, Shutdown, WorkQueue, with_deadline};
use castline_store::ProcessingRecord;
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;

use crate::config::Config;
use crate::error::{ItemError, Stage};
use crate::item::ItemDescriptor;
use crate::output::{artifact_path, transcript_path};
use crate::traits::Collaborators;

/// Where an item is in its stage sequence.
#[derive(Debug)]
enum ItemState {
    Pending,
    Extracted(String),
    Summarized(String),
    Synthesized(PathBuf),
    Failed(ItemError),
}

/// Final result for one dispatched item.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub item: ItemDescriptor,
    /// Artifact path on success
    pub result: Result<PathBuf, ItemError>,
    pub finished_at: DateTime<Utc>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn to_record(&self) -> ProcessingRecord {
        let item = &self.item;
        match &self.result {
            Ok(path) => ProcessingRecord::succeeded(
                item.feed_id.as_str(),
                item.item_id.as_str(),
                item.published_at,
                path.clone(),
                self.finished_at,
            ),
            Err(e) => ProcessingRecord::failed(
                item.feed_id.as_str(),
                item.item_id.as_str(),
                item.published_at,
                e.to_string(),
                self.finished_at,
            ),
        }
    }
}

/// Runs extract → summarize → synthesize for items, one worker per item.
///
/// Workers share nothing mutable: each reads the config and collaborators
/// and sends its outcome to the collector.
pub struct Pipeline<'a> {
    config: &'a Config,
    collaborators: &'a Collaborators,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, collaborators: &'a Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Process `items` on `config.workers` threads, sending each outcome to `sink`.
    ///
    /// Once `shutdown` is requested no new item is claimed; items already in
    /// flight finish or hit their deadline. Returns the number of items
    /// never started.
    pub fn run(
        &self,
        items: &[ItemDescriptor],
        shutdown: &Shutdown,
        progress: &ProgressContext,
        sink: Sender<ItemOutcome>,
    ) -> usize {
        let queue = WorkQueue::new(items.iter().collect());
        let workers = self.config.workers.clamp(1, items.len().max(1));
        log::debug!("dispatching {} items to {workers} workers", queue.total());

        std::thread::scope(|s| {
            for _ in 0..workers {
                let sink = sink.clone();
                let queue = &queue;
                s.spawn(move || {
                    loop {
                        if shutdown.is_requested() {
                            break;
                        }
                        let Some(item) = queue.next() else { break };
                        let pb = progress.item_line(&item.label());
                        let outcome = self.process_item(item, &pb);
                        pb.finish_and_clear();
                        if sink.send(outcome).is_err() {
                            // Collector gone; nothing left to report to.
                            break;
                        }
                    }
                });
            }
        });

        let unclaimed = queue.unclaimed();
        if unclaimed > 0 {
            log::info!("shutdown requested, {unclaimed} items left for the next run");
        }
        unclaimed
    }

    /// Drive one item through its stages. A failing stage ends the sequence.
    pub fn process_item(&self, item: &ItemDescriptor, pb: &ProgressBar) -> ItemOutcome {
        let mut state = ItemState::Pending;
        let result = loop {
            state = match state {
                ItemState::Pending => {
                    pb.set_message(Stage::Extract.verb());
                    self.extract(item)
                        .map_or_else(ItemState::Failed, ItemState::Extracted)
                }
                ItemState::Extracted(text) => {
                    pb.set_message(Stage::Summarize.verb());
                    self.summarize(&text)
                        .map_or_else(ItemState::Failed, ItemState::Summarized)
                }
                ItemState::Summarized(summary) => {
                    pb.set_message(Stage::Synthesize.verb());
                    self.synthesize(item, &summary)
                        .map_or_else(ItemState::Failed, ItemState::Synthesized)
                }
                ItemState::Synthesized(path) => break Ok(path),
                ItemState::Failed(e) => break Err(e),
            };
        };

        match &result {
            Ok(path) => log::info!("{}: wrote {}", item.label(), path.display()),
            Err(e) => log::warn!("{}: {e}", item.label()),
        }

        ItemOutcome {
            item: item.clone(),
            result,
            finished_at: Utc::now(),
        }
    }

    fn extract(&self, item: &ItemDescriptor) -> Result<String, ItemError> {
        let deadline = self.config.extract_timeout;
        let fut = self.collaborators.extractor.extract_text(&item.url);
        match with_deadline(deadline, fut) {
            Ok(Ok(text)) if text.trim().is_empty() => {
                Err(ItemError::failed(Stage::Extract, "no article text found"))
            }
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ItemError::failed(Stage::Extract, e)),
            Err(DeadlineExceeded { after }) => Err(ItemError::timeout(Stage::Extract, after)),
        }
    }

    fn summarize(&self, text: &str) -> Result<String, ItemError> {
        let summary = self
            .collaborators
            .summarizer
            .summarize(text, self.config.max_sentences)
            .map_err(|e| ItemError::failed(Stage::Summarize, e))?;
        if summary.trim().is_empty() {
            return Err(ItemError::failed(Stage::Summarize, "empty summary"));
        }
        Ok(summary)
    }

    fn synthesize(&self, item: &ItemDescriptor, summary: &str) -> Result<PathBuf, ItemError> {
        let synthesizer = &self.collaborators.synthesizer;
        let ext = synthesizer.file_extension();
        let path = artifact_path(&self.config.output_dir, item, ext);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ItemError::failed(Stage::Synthesize, format!("{}: {e}", parent.display()))
            })?;
        }

        let deadline = self.config.synthesize_timeout;
        match with_deadline(deadline, synthesizer.synthesize(summary, &path)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ItemError::failed(Stage::Synthesize, e)),
            Err(DeadlineExceeded { after }) => {
                return Err(ItemError::timeout(Stage::Synthesize, after));
            }
        }

        // Only next to a finished artifact; a text artifact is its own transcript.
        if self.config.transcripts && ext != "txt" {
            let transcript = transcript_path(&path);
            fs::write(&transcript, summary).map_err(|e| {
                ItemError::failed(Stage::Synthesize, format!("{}: {e}", transcript.display()))
            })?;
        }
        Ok(path)
    }
}
