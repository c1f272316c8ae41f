//! Shared HTTP client and tokio runtime.
//!
//! Network calls are async reqwest futures; worker threads drive them on
//! [`SHARED_RUNTIME`] (see [`crate::deadline`]), keeping the worker pool
//! itself plain OS threads.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Browser-like user agent; several news sites reject obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36 castline/0.1";

/// Error types for HTTP operations
#[derive(Debug)]
pub enum HttpError {
    /// Server answered with a non-success status
    Status { status: u16, url: String },
    /// Connection, TLS, redirect or body-read failure
    Transport { url: String, message: String },
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { status, url } => write!(f, "HTTP {status} from {url}"),
            Self::Transport { url, message } => write!(f, "HTTP error for {url}: {message}"),
        }
    }
}

impl std::error::Error for HttpError {}

impl HttpError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(url: &str, e: &reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
                url: url.to_string(),
            },
            None => Self::Transport {
                url: url.to_string(),
                message: e.to_string(),
            },
        }
    }

    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }

    /// 5xx, 429 and transport failures are worth another attempt; other 4xx are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Transport { .. } => true,
        }
    }
}

static SHARED_CLIENT: LazyLock<reqwest::Client> =
    LazyLock::new(|| build_client(DEFAULT_USER_AGENT).expect("failed to build HTTP client"));

/// Get shared HTTP client (default user agent).
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Build a client with connection pooling and the given user agent.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    reqwest::Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(4)
        .build()
}

/// Shared tokio runtime for collaborator I/O.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("castline-io")
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// GET `url` with the given `Accept` header, returning the body bytes.
pub async fn get_bytes(
    client: &reqwest::Client,
    url: &str,
    accept: &'static str,
) -> Result<Vec<u8>, HttpError> {
    let response = client
        .get(url)
        .header(ACCEPT, HeaderValue::from_static(accept))
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| HttpError::from_reqwest(url, &e))?;

    let body = response
        .bytes()
        .await
        .map_err(|e| HttpError::from_reqwest(url, &e))?;
    Ok(body.to_vec())
}
