//! Blocking JSON GET with bounded retries.
//!
//! Providers never talk to `reqwest` directly; they go through `HttpGet`, so
//! tests can script responses without a network.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::AppError;

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters of a failing response body echoed in the log.
const BODY_SNIPPET: usize = 300;

/// A completed HTTP exchange (any status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Why a single attempt failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("HTTP {status}: {snippet}")]
    Status { status: u16, snippet: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Minimal GET transport.
pub trait HttpGet {
    /// Perform one GET. Only transport failures are errors; any HTTP status
    /// is returned as a response.
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, FetchError>;
}

/// `reqwest` blocking transport.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("tech-monthly/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::io(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpGet for ReqwestTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, FetchError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

/// Attempt budget and linear backoff (`backoff * attempt_number`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub tries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(tries: u32, backoff: Duration) -> Self {
        Self { tries, backoff }
    }

    /// Wait before attempt `attempt + 1` (1-based attempt numbers).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1500))
    }
}

/// GET `url` and decode JSON, retrying per `policy`.
///
/// Returns `None` once every attempt has failed; the last failure is logged.
/// Credentials in `query` are never logged.
pub fn get_json<T: DeserializeOwned>(
    http: &dyn HttpGet,
    url: &str,
    query: &[(&str, String)],
    policy: RetryPolicy,
) -> Option<T> {
    let tries = policy.tries.max(1);
    let mut last: Option<FetchError> = None;

    for attempt in 1..=tries {
        match attempt_json::<T>(http, url, query) {
            Ok(value) => return Some(value),
            Err(e) => {
                debug!(url, attempt, error = %e, "GET attempt failed");
                last = Some(e);
            }
        }
        if attempt < tries {
            thread::sleep(policy.delay_after(attempt));
        }
    }

    if let Some(e) = last {
        warn!(url, tries, error = %e, "GET failed");
    }
    None
}

fn attempt_json<T: DeserializeOwned>(
    http: &dyn HttpGet,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, FetchError> {
    let resp = http.get(url, query)?;
    if resp.status == 429 {
        return Err(FetchError::RateLimited);
    }
    if !(200..300).contains(&resp.status) {
        return Err(FetchError::Status {
            status: resp.status,
            snippet: resp.body.chars().take(BODY_SNIPPET).collect(),
        });
    }
    serde_json::from_str(&resp.body).map_err(|e| FetchError::Decode(e.to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for unit tests.

    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Replays queued responses in order and records requested URLs.
    #[derive(Default)]
    pub struct ScriptedHttp {
        pub responses: RefCell<VecDeque<Result<HttpResponse, FetchError>>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl ScriptedHttp {
        pub fn with(responses: Vec<Result<HttpResponse, FetchError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn ok(body: &str) -> Result<HttpResponse, FetchError> {
            Ok(HttpResponse {
                status: 200,
                body: body.to_string(),
            })
        }

        pub fn status(status: u16) -> Result<HttpResponse, FetchError> {
            Ok(HttpResponse {
                status,
                body: String::new(),
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl HttpGet for ScriptedHttp {
        fn get(&self, url: &str, _query: &[(&str, String)]) -> Result<HttpResponse, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Transport("script exhausted".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedHttp;
    use super::*;

    const NO_WAIT: RetryPolicy = RetryPolicy::new(3, Duration::ZERO);

    #[test]
    fn retries_through_rate_limit_and_errors() {
        let http = ScriptedHttp::with(vec![
            ScriptedHttp::status(429),
            Err(FetchError::Transport("reset".into())),
            ScriptedHttp::ok(r#"{"status":"OK"}"#),
        ]);
        let v: Option<serde_json::Value> = get_json(&http, "https://x", &[], NO_WAIT);
        assert_eq!(v.unwrap()["status"], "OK");
        assert_eq!(http.call_count(), 3);
    }

    #[test]
    fn gives_up_after_budget() {
        let http = ScriptedHttp::with(vec![
            ScriptedHttp::status(500),
            ScriptedHttp::status(500),
            ScriptedHttp::status(500),
            ScriptedHttp::ok("{}"),
        ]);
        let v: Option<serde_json::Value> = get_json(&http, "https://x", &[], NO_WAIT);
        assert!(v.is_none());
        assert_eq!(http.call_count(), 3);
    }

    #[test]
    fn undecodable_body_counts_as_failure() {
        let http = ScriptedHttp::with(vec![ScriptedHttp::ok("<html>"), ScriptedHttp::ok("[1]")]);
        let v: Option<Vec<u8>> = get_json(&http, "https://x", &[], RetryPolicy::new(2, Duration::ZERO));
        assert_eq!(v, Some(vec![1]));
    }

    #[test]
    fn backoff_grows_linearly() {
        let p = RetryPolicy::new(3, Duration::from_millis(1500));
        assert_eq!(p.delay_after(1), Duration::from_millis(1500));
        assert_eq!(p.delay_after(2), Duration::from_millis(3000));
    }
}
