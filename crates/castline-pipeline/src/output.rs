//! Deterministic artifact paths
//!
//! ```text
//! {output_dir}/
//! └── 2025-03-09/                       # publication date (UTC)
//!     ├── bbc-world_140500_3f9a2c1d.mp3 # {feed slug}_{HHMMSS}_{item digest}
//!     └── bbc-world_140500_3f9a2c1d.txt # transcript, same stem
//! ```
//!
//! The path depends only on feed, item and publication time, so a retried
//! item overwrites its previous artifact instead of duplicating it. The
//! slug is a readable prefix only; the digest covers the full feed id and
//! item id, so distinct items never share a path.

use std::path::{Path, PathBuf};

use castline_store::item_digest;

use crate::item::ItemDescriptor;

const SLUG_MAX_CHARS: usize = 40;

/// Filesystem-safe form of a feed id: `[A-Za-z0-9_-]`, others become `_`.
pub fn feed_slug(feed_id: &str) -> String {
    let slug: String = feed_id
        .chars()
        .take(SLUG_MAX_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if slug.is_empty() {
        "feed".to_string()
    } else {
        slug
    }
}

/// Artifact path for `item` with the given extension (no dot).
pub fn artifact_path(output_dir: &Path, item: &ItemDescriptor, ext: &str) -> PathBuf {
    let date = item.published_at.format("%Y-%m-%d").to_string();
    let time = item.published_at.format("%H%M%S");
    let name = format!(
        "{}_{time}_{}.{ext}",
        feed_slug(&item.feed_id),
        item_digest(&item.feed_id, &item.item_id)
    );
    output_dir.join(date).join(name)
}

/// Transcript written next to an artifact.
pub fn transcript_path(artifact: &Path) -> PathBuf {
    artifact.with_extension("txt")
}
