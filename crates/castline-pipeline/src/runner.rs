//! Run orchestration: load state, discover, dispatch, collect, persist

use std::collections::HashMap;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use castline_core::{ProgressContext, Shutdown, block_on};
use castline_store::StateStore;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;

use crate::config::Config;
use crate::discover::discover;
use crate::error::{FeedUnavailable, RunError};
use crate::item::ItemDescriptor;
use crate::pipeline::{ItemOutcome, Pipeline};
use crate::traits::Collaborators;

/// Coordinator state within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Discovering,
    Dispatching,
    Collecting,
    Persisting,
}

/// Drives one full pass over all configured feeds.
///
/// The coordinator is the only writer of the [`StateStore`]; state is loaded
/// fresh at the start of every run and persisted once at the end.
pub struct Coordinator<'a> {
    config: &'a Config,
    collaborators: &'a Collaborators,
    shutdown: &'a Shutdown,
    progress: &'a ProgressContext,
    phase: Phase,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        config: &'a Config,
        collaborators: &'a Collaborators,
        shutdown: &'a Shutdown,
        progress: &'a ProgressContext,
    ) -> Self {
        Self {
            config,
            collaborators,
            shutdown,
            progress,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        log::debug!("run phase: {:?} -> {phase:?}", self.phase);
        self.phase = phase;
    }

    /// Execute one run. Item failures are counted in the summary; only
    /// state and configuration problems abort.
    pub fn run_once(&mut self) -> Result<RunSummary, RunError> {
        let start = Instant::now();
        let result = self.run_phases(start);
        self.enter(Phase::Idle);
        if let Ok(summary) = &result {
            summary.log();
        }
        result
    }

    fn run_phases(&mut self, start: Instant) -> Result<RunSummary, RunError> {
        if self.config.feeds.is_empty() {
            return Err(RunError::NoFeeds);
        }

        self.enter(Phase::Loading);
        let mut store = StateStore::load(&self.config.state_file)?;

        self.enter(Phase::Discovering);
        let (items, unavailable) = self.discover_all(&store);
        let mut summary = RunSummary {
            feeds: self.config.feeds.len(),
            feeds_unavailable: unavailable.len(),
            discovered: items.len(),
            ..RunSummary::empty()
        };
        if items.is_empty() {
            log::info!("no new items");
            summary.elapsed = start.elapsed();
            return Ok(summary);
        }

        self.enter(Phase::Dispatching);
        let outcomes = self.dispatch_and_collect(&items);

        self.enter(Phase::Persisting);
        for outcome in &outcomes {
            summary.count(outcome);
        }
        summary.skipped = items.len() - outcomes.len();
        apply_outcomes(&mut store, &items, &outcomes);
        store.persist().map_err(RunError::Persist)?;

        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    /// Poll every feed concurrently and reduce each to its unseen items.
    fn discover_all(&self, store: &StateStore) -> (Vec<ItemDescriptor>, Vec<FeedUnavailable>) {
        let poller = &self.collaborators.poller;
        let timeout = self.config.feed_timeout;
        let polls = block_on(join_all(self.config.feeds.iter().map(|feed| async move {
            match tokio::time::timeout(timeout, poller.poll(feed)).await {
                Ok(result) => result,
                Err(_) => Err(FeedUnavailable::new(
                    feed.id(),
                    format!("timed out after {:.1}s", timeout.as_secs_f64()),
                )),
            }
        })));

        let mut items = Vec::new();
        let mut unavailable = Vec::new();
        for (feed, poll) in self.config.feeds.iter().zip(polls) {
            let feed_state = store.feed_state(feed.id());
            match discover(
                feed,
                poll,
                feed_state.as_ref(),
                store,
                self.config.max_items_per_feed,
            ) {
                Ok(found) => {
                    log::info!("{}: {} new items", feed.id(), found.len());
                    items.extend(found);
                }
                Err(e) => {
                    log::warn!("{e}");
                    unavailable.push(e);
                }
            }
        }
        (items, unavailable)
    }

    /// Run the worker pool on a scoped thread while this thread collects
    /// outcomes as they arrive.
    fn dispatch_and_collect(&mut self, items: &[ItemDescriptor]) -> Vec<ItemOutcome> {
        let pipeline = Pipeline::new(self.config, self.collaborators);
        let shutdown = self.shutdown;
        let progress = self.progress;
        let bar = progress.run_bar(items.len());
        let (tx, rx) = mpsc::channel();

        let outcomes = std::thread::scope(|s| {
            s.spawn(|| pipeline.run(items, shutdown, progress, tx));
            self.enter(Phase::Collecting);
            rx.iter()
                .inspect(|outcome: &ItemOutcome| {
                    bar.inc(1);
                    if !outcome.is_success() {
                        bar.set_message(format!("last failure: {}", outcome.item.feed_id));
                    }
                })
                .collect::<Vec<_>>()
        });
        bar.finish_and_clear();
        outcomes
    }
}

/// Record every outcome and advance each feed's high-water mark to the
/// newest item that succeeded this run.
///
/// Items dispatched but never started (shutdown) have no record yet, so
/// the mark stays strictly below the oldest of them to keep them
/// discoverable.
fn apply_outcomes(store: &mut StateStore, dispatched: &[ItemDescriptor], outcomes: &[ItemOutcome]) {
    let mut oldest_unstarted: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for item in dispatched {
        let started = outcomes
            .iter()
            .any(|o| o.item.feed_id == item.feed_id && o.item.item_id == item.item_id);
        if !started {
            oldest_unstarted
                .entry(item.feed_id.as_str())
                .and_modify(|ts| *ts = (*ts).min(item.published_at))
                .or_insert(item.published_at);
        }
    }

    let mut newest_success: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for outcome in outcomes {
        store.record_outcome(outcome.to_record());

        let item = &outcome.item;
        let below_unstarted = oldest_unstarted
            .get(item.feed_id.as_str())
            .is_none_or(|limit| item.published_at < *limit);
        if outcome.is_success() && below_unstarted {
            newest_success
                .entry(item.feed_id.as_str())
                .and_modify(|ts| *ts = (*ts).max(item.published_at))
                .or_insert(item.published_at);
        }
    }

    for (feed_id, ts) in newest_success {
        if store.advance_high_water(feed_id, ts) {
            log::debug!("{feed_id}: high-water mark now {ts}");
        }
    }
}

/// Summary of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub feeds: usize,
    pub feeds_unavailable: usize,
    pub discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failures caused by a stage deadline, included in `failed`
    pub timed_out: usize,
    /// Dispatched but not started because of shutdown
    pub skipped: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn empty() -> Self {
        Self {
            feeds: 0,
            feeds_unavailable: 0,
            discovered: 0,
            succeeded: 0,
            failed: 0,
            timed_out: 0,
            skipped: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn count(&mut self, outcome: &ItemOutcome) {
        match &outcome.result {
            Ok(_) => self.succeeded += 1,
            Err(e) => {
                self.failed += 1;
                if e.is_timeout() {
                    self.timed_out += 1;
                }
            }
        }
    }

    /// Every processed item failed (and at least one was processed).
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.succeeded == 0
    }

    /// Process exit code for a completed run
    pub fn exit_code(&self) -> u8 {
        if self.all_failed() { 1 } else { 0 }
    }

    pub fn log(&self) {
        log::info!("=== Run Summary ===");
        log::info!(
            "Feeds: {} polled ({} unavailable)",
            self.feeds,
            self.feeds_unavailable
        );
        log::info!(
            "Items: {} discovered, {} succeeded, {} failed ({} timed out)",
            self.discovered,
            self.succeeded,
            self.failed,
            self.timed_out
        );
        if self.skipped > 0 {
            log::info!("Skipped: {} (shutdown)", self.skipped);
        }
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
        if self.all_failed() {
            log::warn!("every item in this run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ItemError, Stage};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn item(feed: &str, id: &str, published: i64) -> ItemDescriptor {
        ItemDescriptor {
            feed_id: feed.into(),
            item_id: id.into(),
            url: format!("https://news.example/{id}"),
            title: id.into(),
            published_at: ts(published),
        }
    }

    fn outcome(item: &ItemDescriptor, ok: bool) -> ItemOutcome {
        ItemOutcome {
            item: item.clone(),
            result: if ok {
                Ok(PathBuf::from(format!("out/{}.mp3", item.item_id)))
            } else {
                Err(ItemError::failed(Stage::Synthesize, "quota"))
            },
            finished_at: ts(100),
        }
    }

    #[test]
    fn run_summary_empty() {
        let summary = RunSummary::empty();
        assert_eq!(summary.discovered, 0);
        assert!(!summary.all_failed());
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.elapsed, Duration::ZERO);
    }

    #[test]
    fn run_summary_all_failed() {
        let summary = RunSummary {
            discovered: 2,
            failed: 2,
            ..RunSummary::empty()
        };
        assert!(summary.all_failed());
        assert_eq!(summary.exit_code(), 1);
        summary.log();
    }

    #[test]
    fn run_summary_partial_failure_exits_zero() {
        let summary = RunSummary {
            discovered: 3,
            succeeded: 1,
            failed: 2,
            ..RunSummary::empty()
        };
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn count_tracks_timeouts() {
        let it = item("F1", "a", 1);
        let mut summary = RunSummary::empty();
        summary.count(&outcome(&it, true));
        summary.count(&ItemOutcome {
            result: Err(ItemError::timeout(Stage::Extract, Duration::from_secs(30))),
            ..outcome(&it, false)
        });
        assert_eq!((summary.succeeded, summary.failed, summary.timed_out), (1, 1, 1));
    }

    #[test]
    fn high_water_uses_newest_success_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::load(&dir.path().join("s.json")).unwrap();
        let a = item("F1", "a", 1);
        let b = item("F1", "b", 2);
        let c = item("F2", "c", 5);
        let outcomes = vec![outcome(&b, false), outcome(&a, true), outcome(&c, false)];

        apply_outcomes(&mut store, &[a.clone(), b.clone(), c.clone()], &outcomes);

        assert_eq!(store.high_water("F1"), Some(ts(1)));
        assert_eq!(store.high_water("F2"), None);
        assert!(store.is_succeeded("F1", "a"));
        assert!(!store.is_succeeded("F1", "b"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn high_water_stays_below_unstarted_items() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::load(&dir.path().join("s.json")).unwrap();
        let a = item("F1", "a", 1);
        let b = item("F1", "b", 3);
        let unstarted = item("F1", "c", 3);
        let outcomes = vec![outcome(&a, true), outcome(&b, true)];

        apply_outcomes(&mut store, &[a, b, unstarted], &outcomes);

        assert_eq!(store.high_water("F1"), Some(ts(1)));
        assert!(store.is_succeeded("F1", "b"));
    }

    #[test]
    fn outcome_order_does_not_matter() {
        let a = item("F1", "a", 1);
        let b = item("F1", "b", 2);
        let c = item("F2", "c", 3);
        let dispatched = [a.clone(), b.clone(), c.clone()];
        let forward = vec![outcome(&a, true), outcome(&b, false), outcome(&c, true)];
        let mut backward = forward.clone();
        backward.reverse();

        let dir = tempfile::tempdir().unwrap();
        let mut s1 = StateStore::load(&dir.path().join("1.json")).unwrap();
        let mut s2 = StateStore::load(&dir.path().join("2.json")).unwrap();
        apply_outcomes(&mut s1, &dispatched, &forward);
        apply_outcomes(&mut s2, &dispatched, &backward);

        assert_eq!(s1.records().collect::<Vec<_>>(), s2.records().collect::<Vec<_>>());
        assert_eq!(s1.feeds().collect::<Vec<_>>(), s2.feeds().collect::<Vec<_>>());
    }
}
