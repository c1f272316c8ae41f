//! castline-store: durable run state for the digest agent
//!
//! Tracks, per feed, the high-water publication timestamp and, per feed
//! item, the outcome of its last processing attempt. The whole state is
//! one JSON document that is loaded wholesale and replaced atomically.

pub mod error;
pub mod hash;
pub mod record;
pub mod store;

pub use error::StateError;
pub use hash::item_digest;
pub use record::{FeedState, ItemStatus, ProcessingRecord};
pub use store::{CURRENT_FORMAT_VERSION, StateStore};
