//! Castline Core - Shared infrastructure for the castline digest agent
//!
//! This crate provides the pieces every other castline crate leans on:
//! logging, progress display, graceful shutdown, the shared HTTP client
//! and runtime, deadline enforcement and retry.

pub mod deadline;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;
pub mod work_queue;

// Re-exports for convenience
pub use deadline::{DeadlineExceeded, block_on, with_deadline};
pub use http::{HttpError, SHARED_RUNTIME, http_client};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::ProgressContext;
pub use retry::{backoff_duration, retry_with_backoff};
pub use shutdown::Shutdown;
pub use work_queue::WorkQueue;
