//! Durable processing state, persisted as a single JSON file
//!
//! File layout:
//! ```text
//! {
//!   "format_version": 1,
//!   "feeds": { "<feed_id>": { "high_water": "2025-03-09T14:05:00Z" } },
//!   "items": {
//!     "<feed_id>": {
//!       "<item_id>": { "published_at": ..., "status": "succeeded", "output_path": ..., "processed_at": ... }
//!     }
//!   }
//! }
//! ```
//!
//! The whole file is replaced on every [`StateStore::persist`] via tmp → rename,
//! so a crash leaves either the previous or the new state on disk.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::record::{FeedState, ProcessingRecord, StoredFeed, StoredRecord};

/// Bump when the on-disk layout changes incompatibly.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    format_version: u32,
    #[serde(default)]
    feeds: BTreeMap<String, StoredFeed>,
    #[serde(default)]
    items: BTreeMap<String, BTreeMap<String, StoredRecord>>,
}

/// In-memory view of the state file.
///
/// Only the run coordinator mutates a `StateStore`; workers never see it.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    high_water: BTreeMap<String, DateTime<Utc>>,
    items: BTreeMap<String, BTreeMap<String, ProcessingRecord>>,
    dirty: bool,
}

impl StateStore {
    /// Load state from `path`. A missing file yields an empty store.
    ///
    /// An existing file that is empty, unparsable, of an unknown format
    /// version, or internally inconsistent is reported as
    /// [`StateError::Corrupt`], never silently treated as empty.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no state file at {}, starting empty", path.display());
                return Ok(Self::empty(path));
            }
            Err(e) => return Err(StateError::io(path, e)),
        };

        if content.trim().is_empty() {
            return Err(StateError::corrupt(path, "file is empty"));
        }

        let file: StateFile =
            serde_json::from_str(&content).map_err(|e| StateError::corrupt(path, e.to_string()))?;

        if file.format_version != CURRENT_FORMAT_VERSION {
            return Err(StateError::corrupt(
                path,
                format!(
                    "format_version {} != supported {CURRENT_FORMAT_VERSION}",
                    file.format_version
                ),
            ));
        }

        let high_water = file
            .feeds
            .into_iter()
            .map(|(feed_id, feed)| (feed_id, feed.high_water))
            .collect();

        let mut items = BTreeMap::new();
        for (feed_id, records) in file.items {
            let mut by_item = BTreeMap::new();
            for (item_id, stored) in records {
                let record = stored.into_record(&feed_id, &item_id);
                if record.is_succeeded() && record.output_path.is_none() {
                    return Err(StateError::corrupt(
                        path,
                        format!("succeeded item {feed_id}/{item_id} has no output_path"),
                    ));
                }
                by_item.insert(item_id, record);
            }
            items.insert(feed_id, by_item);
        }

        let store = Self {
            path: path.to_path_buf(),
            high_water,
            items,
            dirty: false,
        };
        log::debug!(
            "loaded state {}: {} feeds, {} records",
            path.display(),
            store.high_water.len(),
            store.len()
        );
        Ok(store)
    }

    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            high_water: BTreeMap::new(),
            items: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Backing file, whether or not it exists yet.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when in-memory state differs from the last load or persist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of processing records across all feeds.
    pub fn len(&self) -> usize {
        self.items.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upsert one record keyed by `(feed_id, item_id)`.
    ///
    /// Returns whether the stored content changed. Repeating an identical
    /// record is a no-op. A `Failed` outcome never replaces a `Succeeded`
    /// record: the artifact on disk is still valid.
    pub fn record_outcome(&mut self, record: ProcessingRecord) -> bool {
        let by_item = self.items.entry(record.feed_id.clone()).or_default();
        match by_item.get(&record.item_id) {
            Some(existing) if *existing == record => return false,
            Some(existing) if existing.is_succeeded() && !record.is_succeeded() => {
                log::warn!(
                    "ignoring failure for {}/{}: already succeeded",
                    record.feed_id,
                    record.item_id
                );
                return false;
            }
            _ => {}
        }
        by_item.insert(record.item_id.clone(), record);
        self.dirty = true;
        true
    }

    /// Set the feed's high-water mark to `max(current, ts)`. Returns whether it moved.
    pub fn advance_high_water(&mut self, feed_id: &str, ts: DateTime<Utc>) -> bool {
        match self.high_water.get_mut(feed_id) {
            Some(current) if *current >= ts => false,
            Some(current) => {
                *current = ts;
                self.dirty = true;
                true
            }
            None => {
                self.high_water.insert(feed_id.to_string(), ts);
                self.dirty = true;
                true
            }
        }
    }

    pub fn high_water(&self, feed_id: &str) -> Option<DateTime<Utc>> {
        self.high_water.get(feed_id).copied()
    }

    pub fn feed_state(&self, feed_id: &str) -> Option<FeedState> {
        self.high_water(feed_id).map(|high_water| FeedState {
            feed_id: feed_id.to_string(),
            high_water,
        })
    }

    /// All feeds with a high-water mark, ordered by feed id.
    pub fn feeds(&self) -> impl Iterator<Item = FeedState> + '_ {
        self.high_water.iter().map(|(feed_id, ts)| FeedState {
            feed_id: feed_id.clone(),
            high_water: *ts,
        })
    }

    pub fn record(&self, feed_id: &str, item_id: &str) -> Option<&ProcessingRecord> {
        self.items.get(feed_id)?.get(item_id)
    }

    pub fn is_succeeded(&self, feed_id: &str, item_id: &str) -> bool {
        self.record(feed_id, item_id)
            .is_some_and(ProcessingRecord::is_succeeded)
    }

    /// All records, ordered by feed id then item id.
    pub fn records(&self) -> impl Iterator<Item = &ProcessingRecord> {
        self.items.values().flat_map(BTreeMap::values)
    }

    /// Write state atomically: tmp file, fsync, rename.
    ///
    /// Returns `Ok(false)` without touching the disk when nothing changed.
    /// The tmp file is removed on every failure path.
    pub fn persist(&mut self) -> Result<bool, StateError> {
        if !self.dirty {
            log::debug!("state unchanged, skipping persist");
            return Ok(false);
        }

        let file = StateFile {
            format_version: CURRENT_FORMAT_VERSION,
            feeds: self
                .high_water
                .iter()
                .map(|(feed_id, ts)| (feed_id.clone(), StoredFeed { high_water: *ts }))
                .collect(),
            items: self
                .items
                .iter()
                .filter(|(_, records)| !records.is_empty())
                .map(|(feed_id, records)| {
                    let stored = records
                        .iter()
                        .map(|(item_id, r)| (item_id.clone(), r.to_stored()))
                        .collect();
                    (feed_id.clone(), stored)
                })
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| StateError::io(&self.path, io::Error::other(e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
        }

        let tmp = TempFile::new(tmp_path(&self.path));
        write_synced(tmp.path(), &json).map_err(|e| StateError::io(tmp.path(), e))?;
        fs::rename(tmp.path(), &self.path).map_err(|e| StateError::io(&self.path, e))?;
        tmp.disarm();

        self.dirty = false;
        log::debug!("persisted state to {} ({} records)", self.path.display(), self.len());
        Ok(true)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(data)?;
    f.sync_all()
}

/// RAII guard removing a tmp file unless disarmed after a successful rename.
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
