//! Retry with exponential backoff for collaborator HTTP calls

use std::future::Future;
use std::time::Duration;

use crate::http::HttpError;

/// Exponential backoff: 2^(attempt-1) seconds (1s, 2s, 4s, ...)
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.saturating_sub(1))
}

/// Retry a fallible HTTP operation with exponential backoff.
///
/// Retries up to `max_retries` times on retryable errors
/// ([`HttpError::is_retryable`]), sleeping between attempts on the
/// runtime timer so a surrounding deadline can still cut it short.
///
/// Returns `Ok(T)` on first success, or the final `Err` on exhaustion / non-retryable error.
pub async fn retry_with_backoff<T, F, Fut>(
    label: &str,
    max_retries: u32,
    mut attempt_fn: F,
) -> Result<T, HttpError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HttpError>>,
{
    let mut attempt = 0u32;
    loop {
        match attempt_fn().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                log::debug!("{label}: attempt {attempt}/{max_retries} failed: {e}, retrying...");
                tokio::time::sleep(backoff_duration(attempt)).await;
            }
            Err(e) => {
                log::debug!("{label}: giving up: {e}");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn status_err(status: u16) -> HttpError {
        HttpError::Status {
            status,
            url: "https://example.com".to_string(),
        }
    }

    #[test]
    fn backoff_exponential() {
        assert_eq!(backoff_duration(1), Duration::from_secs(1));
        assert_eq!(backoff_duration(2), Duration::from_secs(2));
        assert_eq!(backoff_duration(3), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out = retry_with_backoff("test", 3, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(status_err(503))
            } else {
                Ok("body")
            }
        })
        .await;
        assert_eq!(out.unwrap(), "body");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Result<(), _> = retry_with_backoff("test", 3, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(status_err(404))
        })
        .await;
        assert_eq!(out.unwrap_err().status(), Some(404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Result<(), _> = retry_with_backoff("test", 2, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(status_err(500))
        })
        .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
