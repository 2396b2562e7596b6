//! Define common types used by various components of httpstress

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

pub const DEFAULT_TOTAL_REQUESTS: usize = 200;
pub const DEFAULT_CONCURRENCY: usize = 50;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Status code recorded when the exchange failed below HTTP (refused, reset, timeout, dns...)
pub const TRANSPORT_FAILURE: u16 = 0;
pub const SUCCESS_STATUS: u16 = 200;

/// One configured kind of request.
///
/// `method` is kept as written by the user, it's validated when the run is expanded into
/// concrete requests. An empty method disables the template.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestTemplate {
    pub weight: u32,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub body: String,
}

impl RequestTemplate {
    /// Template for the single url case. A non-empty body turns the request into a POST.
    pub fn single_url(url: String, body: String, content_type: String) -> Self {
        let method = if body.is_empty() { "GET" } else { "POST" };
        RequestTemplate {
            weight: 1,
            method: method.to_string(),
            url,
            content_type,
            body,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.method.is_empty()
    }
}

impl Display for RequestTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (weight={})", &self.method, &self.url, self.weight)
    }
}

/// Everything a run needs, built once before dispatching and never changed afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub total_requests: usize,
    pub concurrency: usize,
    pub timeout: Duration,
    pub keep_alive: bool,
    /// raw `Name: Value` strings, parsed while expanding
    pub headers: Vec<String>,
    pub templates: Vec<RequestTemplate>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            total_requests: DEFAULT_TOTAL_REQUESTS,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            keep_alive: false,
            headers: vec![],
            templates: vec![],
        }
    }
}

/// Outcome of a single request
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RequestResult {
    /// [`TRANSPORT_FAILURE`] if no response was received
    pub status_code: u16,
    pub duration: Duration,
}

impl RequestResult {
    pub fn new(status_code: u16, duration: Duration) -> Self {
        RequestResult {
            status_code,
            duration,
        }
    }

    pub fn transport_failure(duration: Duration) -> Self {
        Self::new(TRANSPORT_FAILURE, duration)
    }

    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_STATUS
    }
}
