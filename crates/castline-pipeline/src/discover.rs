//! Item discovery: reduce a feed's raw entries to the unseen ones

use std::collections::HashSet;

use castline_store::{FeedState, StateStore};

use crate::config::FeedSource;
use crate::error::FeedUnavailable;
use crate::item::{ItemDescriptor, RawEntry};

/// Select the items of `feed` that still need processing.
///
/// An entry is kept when it has no `Succeeded` record and either lies
/// above the feed's high-water mark or has a `Failed` record (retry).
/// The result is ordered by `published_at`, ties broken by `item_id`.
///
/// `cap` keeps the *oldest* items, so the high-water mark never jumps
/// over an entry that was held back; entries sharing the boundary
/// timestamp stay together.
///
/// An unreachable feed or an empty poll yields `Err(FeedUnavailable)`,
/// which callers treat as an empty, non-fatal result.
pub fn discover(
    feed: &FeedSource,
    poll: Result<Vec<RawEntry>, FeedUnavailable>,
    feed_state: Option<&FeedState>,
    store: &StateStore,
    cap: Option<usize>,
) -> Result<Vec<ItemDescriptor>, FeedUnavailable> {
    let feed_id = feed.id();
    let raw = poll?;
    if raw.is_empty() {
        return Err(FeedUnavailable::new(feed_id, "feed returned no entries"));
    }

    let high_water = feed_state.map(|s| s.high_water);
    let mut seen = HashSet::new();
    let mut items: Vec<ItemDescriptor> = raw
        .into_iter()
        // First occurrence wins when a feed repeats an id.
        .filter(|entry| seen.insert(entry.item_id.clone()))
        .filter(|entry| match store.record(feed_id, &entry.item_id) {
            Some(record) if record.is_succeeded() => false,
            Some(_) => true,
            None => high_water.is_none_or(|hw| entry.published_at > hw),
        })
        .map(|entry| ItemDescriptor::from_raw(feed_id, entry))
        .collect();

    items.sort_by(|a, b| {
        a.published_at
            .cmp(&b.published_at)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });

    if let Some(cap) = cap {
        apply_cap(&mut items, cap);
    }
    Ok(items)
}

fn apply_cap(items: &mut Vec<ItemDescriptor>, cap: usize) {
    if cap == 0 || items.len() <= cap {
        return;
    }
    let boundary = items[cap - 1].published_at;
    let keep = cap
        + items[cap..]
            .iter()
            .take_while(|item| item.published_at == boundary)
            .count();
    let held = items.len() - keep;
    items.truncate(keep);
    log::debug!("held back {held} newer items until the next run");
}

#[cfg(test)]
mod tests {
    use super::*;
    use castline_store::ProcessingRecord;
    use chrono::{DateTime, TimeZone, Utc};
    use std::path::PathBuf;

    const T0: i64 = 1_700_000_000;

    fn ts(offset: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(T0 + offset, 0).unwrap()
    }

    fn entry(id: &str, offset: i64) -> RawEntry {
        RawEntry {
            item_id: id.to_string(),
            url: format!("https://news.example/{id}"),
            title: format!("Story {id}"),
            published_at: ts(offset),
        }
    }

    fn feed() -> FeedSource {
        FeedSource::named("F1", "https://news.example/rss")
    }

    fn state(offset: i64) -> FeedState {
        FeedState {
            feed_id: "F1".into(),
            high_water: ts(offset),
        }
    }

    fn empty_store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(&dir.path().join("state.json")).unwrap();
        (dir, store)
    }

    fn ids(items: &[ItemDescriptor]) -> Vec<&str> {
        items.iter().map(|i| i.item_id.as_str()).collect()
    }

    #[test]
    fn filters_by_high_water_and_orders() {
        let (_dir, store) = empty_store();
        let raw = vec![entry("b", 2), entry("old", 0), entry("a", 1), entry("older", -5)];
        let items = discover(&feed(), Ok(raw), Some(&state(0)), &store, None).unwrap();
        assert_eq!(ids(&items), ["a", "b"]);
        assert!(items.iter().all(|i| i.feed_id == "F1"));
    }

    #[test]
    fn ties_broken_by_item_id() {
        let (_dir, store) = empty_store();
        let raw = vec![entry("z", 1), entry("m", 1), entry("a", 1)];
        let items = discover(&feed(), Ok(raw), None, &store, None).unwrap();
        assert_eq!(ids(&items), ["a", "m", "z"]);
    }

    #[test]
    fn no_feed_state_keeps_everything() {
        let (_dir, store) = empty_store();
        let raw = vec![entry("a", -100), entry("b", 100)];
        let items = discover(&feed(), Ok(raw), None, &store, None).unwrap();
        assert_eq!(ids(&items), ["a", "b"]);
    }

    #[test]
    fn succeeded_items_excluded_even_above_high_water() {
        let (_dir, mut store) = empty_store();
        store.record_outcome(ProcessingRecord::succeeded(
            "F1",
            "a",
            ts(1),
            PathBuf::from("out/a.mp3"),
            ts(10),
        ));
        // Republished with a newer timestamp.
        let raw = vec![entry("a", 5), entry("b", 2)];
        let items = discover(&feed(), Ok(raw), Some(&state(0)), &store, None).unwrap();
        assert_eq!(ids(&items), ["b"]);
    }

    #[test]
    fn failed_items_rediscovered_below_high_water() {
        let (_dir, mut store) = empty_store();
        store.record_outcome(ProcessingRecord::failed(
            "F1",
            "b",
            ts(2),
            "synthesis failed: quota",
            ts(10),
        ));
        let raw = vec![entry("a", 1), entry("b", 2)];
        let items = discover(&feed(), Ok(raw), Some(&state(3)), &store, None).unwrap();
        assert_eq!(ids(&items), ["b"]);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let (_dir, store) = empty_store();
        let raw = vec![entry("a", 3), entry("a", 1)];
        let items = discover(&feed(), Ok(raw), None, &store, None).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].published_at, ts(3));
    }

    #[test]
    fn empty_poll_is_unavailable() {
        let (_dir, store) = empty_store();
        let err = discover(&feed(), Ok(vec![]), None, &store, None).unwrap_err();
        assert_eq!(err.feed_id, "F1");
    }

    #[test]
    fn poll_error_passes_through() {
        let (_dir, store) = empty_store();
        let poll = Err(FeedUnavailable::new("F1", "HTTP 503"));
        let err = discover(&feed(), poll, None, &store, None).unwrap_err();
        assert_eq!(err.reason, "HTTP 503");
    }

    #[test]
    fn all_seen_is_empty_not_unavailable() {
        let (_dir, store) = empty_store();
        let raw = vec![entry("a", 1)];
        let items = discover(&feed(), Ok(raw), Some(&state(5)), &store, None).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn cap_keeps_oldest() {
        let (_dir, store) = empty_store();
        let raw = vec![entry("d", 4), entry("c", 3), entry("b", 2), entry("a", 1)];
        let items = discover(&feed(), Ok(raw), None, &store, Some(2)).unwrap();
        assert_eq!(ids(&items), ["a", "b"]);
    }

    #[test]
    fn cap_keeps_boundary_ties_together() {
        let (_dir, store) = empty_store();
        let raw = vec![entry("a", 1), entry("b", 2), entry("c", 2), entry("d", 3)];
        let items = discover(&feed(), Ok(raw), None, &store, Some(2)).unwrap();
        assert_eq!(ids(&items), ["a", "b", "c"]);
    }

    #[test]
    fn zero_cap_is_unlimited() {
        let (_dir, store) = empty_store();
        let raw = vec![entry("a", 1), entry("b", 2), entry("c", 3)];
        let items = discover(&feed(), Ok(raw), None, &store, Some(0)).unwrap();
        assert_eq!(items.len(), 3);
    }
}
