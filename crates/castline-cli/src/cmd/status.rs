//! `castline status` - inspect the state file

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use castline_store::{ItemStatus, ProcessingRecord, StateStore};

use crate::config::{Config, Overrides};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// List failed items with their reasons
    #[arg(long)]
    pub failed: bool,

    /// State file path (default: output.state_file)
    #[arg(long)]
    pub state_file: Option<PathBuf>,
}

/// Per-feed totals
#[derive(Debug, Default, PartialEq, Eq)]
struct FeedRow {
    high_water: Option<DateTime<Utc>>,
    succeeded: usize,
    failed: usize,
}

pub fn run(args: StatusArgs, config: &Config) -> Result<u8> {
    let path = config.state_file(&Overrides {
        state_file: args.state_file,
        ..Default::default()
    });
    let store = StateStore::load(&path)
        .with_context(|| format!("Failed to load state from {}", path.display()))?;

    if store.is_empty() && store.feeds().next().is_none() {
        eprintln!("No state recorded yet at {}", store.path().display());
        return Ok(0);
    }

    let mut table = super::table(&["Feed", "High-water", "Succeeded", "Failed"]);
    for (feed, row) in feed_rows(&store) {
        table.add_row(vec![
            feed,
            row.high_water
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            row.succeeded.to_string(),
            row.failed.to_string(),
        ]);
    }
    eprintln!("\n{table}");

    if args.failed {
        let failed = failed_records(&store);
        if failed.is_empty() {
            eprintln!("No failed items");
        } else {
            let mut table = super::table(&["Feed", "Item", "Attempted", "Reason"]);
            for record in failed {
                table.add_row(vec![
                    record.feed_id.clone(),
                    record.item_id.clone(),
                    record.processed_at.format("%Y-%m-%d %H:%M").to_string(),
                    record.failure_reason.clone().unwrap_or_default(),
                ]);
            }
            eprintln!("\n{table}");
        }
    }
    Ok(0)
}

fn feed_rows(store: &StateStore) -> BTreeMap<String, FeedRow> {
    let mut rows: BTreeMap<String, FeedRow> = BTreeMap::new();
    for state in store.feeds() {
        rows.entry(state.feed_id).or_default().high_water = Some(state.high_water);
    }
    for record in store.records() {
        let row = rows.entry(record.feed_id.clone()).or_default();
        match record.status {
            ItemStatus::Succeeded => row.succeeded += 1,
            ItemStatus::Failed => row.failed += 1,
        }
    }
    rows
}

/// Failed records, most recent attempt first
fn failed_records(store: &StateStore) -> Vec<&ProcessingRecord> {
    let mut failed: Vec<_> = store.records().filter(|r| !r.is_succeeded()).collect();
    failed.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 9, hour, 0, 0).unwrap()
    }

    fn sample_store(dir: &std::path::Path) -> StateStore {
        let mut store = StateStore::load(&dir.join("state.json")).unwrap();
        store.record_outcome(ProcessingRecord::succeeded(
            "bbc",
            "https://bbc.example/1",
            ts(8),
            PathBuf::from("out/a.mp3"),
            ts(10),
        ));
        store.record_outcome(ProcessingRecord::failed(
            "bbc",
            "https://bbc.example/2",
            ts(9),
            "synthesis failed: quota exceeded",
            ts(10),
        ));
        store.record_outcome(ProcessingRecord::failed(
            "npr",
            "https://npr.example/1",
            ts(7),
            "extraction failed: timeout after 30.0s",
            ts(11),
        ));
        store.advance_high_water("bbc", ts(8));
        store
    }

    #[test]
    fn rows_per_feed() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());
        let rows = feed_rows(&store);

        assert_eq!(
            rows["bbc"],
            FeedRow {
                high_water: Some(ts(8)),
                succeeded: 1,
                failed: 1
            }
        );
        assert_eq!(
            rows["npr"],
            FeedRow {
                high_water: None,
                succeeded: 0,
                failed: 1
            }
        );
    }

    #[test]
    fn failed_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());
        let failed = failed_records(&store);
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].feed_id, "npr");
        assert_eq!(failed[1].item_id, "https://bbc.example/2");
    }

    #[test]
    fn status_reads_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = sample_store(dir.path());
        store.persist().unwrap();

        let args = StatusArgs {
            failed: true,
            state_file: Some(dir.path().join("state.json")),
        };
        assert_eq!(run(args, &Config::default()).unwrap(), 0);
    }

    #[test]
    fn status_without_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = StatusArgs {
            failed: true,
            state_file: Some(dir.path().join("state.json")),
        };
        assert_eq!(run(args, &Config::default()).unwrap(), 0);
        assert!(!dir.path().join("state.json").exists());
    }

    #[test]
    fn status_rejects_corrupt_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let args = StatusArgs {
            failed: false,
            state_file: Some(path),
        };
        assert!(run(args, &Config::default()).is_err());
    }
}
