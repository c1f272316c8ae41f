//! Deadline enforcement for collaborator calls.
//!
//! Worker threads are plain OS threads; a collaborator future is driven
//! to completion on [`SHARED_RUNTIME`] under `tokio::time::timeout`.
//! When the deadline passes the future is dropped, so the calling
//! worker is free again no later than the deadline.

use std::future::Future;
use std::time::Duration;

use crate::http::SHARED_RUNTIME;

/// A future did not complete before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded {
    pub after: Duration,
}

impl std::fmt::Display for DeadlineExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timed out after {:.1}s", self.after.as_secs_f64())
    }
}

impl std::error::Error for DeadlineExceeded {}

/// Drive `fut` to completion on the shared runtime from a plain thread.
///
/// Must not be called from inside an async context.
pub fn block_on<F: Future>(fut: F) -> F::Output {
    SHARED_RUNTIME.handle().block_on(fut)
}

/// Block the current (non-runtime) thread on `fut`, giving up after `deadline`.
///
/// Must not be called from inside an async context: it uses `block_on`.
pub fn with_deadline<F>(deadline: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    block_on(async {
        tokio::time::timeout(deadline, fut)
            .await
            .map_err(|_| DeadlineExceeded { after: deadline })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn block_on_runs_timer_futures() {
        let out = block_on(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            "done"
        });
        assert_eq!(out, "done");
    }

    #[test]
    fn completes_within_deadline() {
        let out = with_deadline(Duration::from_secs(5), async { 21 * 2 });
        assert_eq!(out, Ok(42));
    }

    #[test]
    fn slow_future_is_cut_off() {
        let start = Instant::now();
        let out = with_deadline(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "never"
        });
        assert_eq!(
            out,
            Err(DeadlineExceeded {
                after: Duration::from_millis(50)
            })
        );
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn usable_from_many_threads() {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    with_deadline(Duration::from_secs(5), async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        i
                    })
                })
            })
            .collect();
        let mut results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        results.sort();
        assert_eq!(results, vec![0, 1, 2, 3]);
    }

    #[test]
    fn display_mentions_seconds() {
        let err = DeadlineExceeded {
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "timed out after 1.5s");
    }
}
