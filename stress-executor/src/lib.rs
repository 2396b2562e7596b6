use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use log::debug;
use stress_types::RunConfig;

mod client;
mod pool;
mod request;

pub use client::{ClientOptions, HttpsClient, HyperSender, RequestSender};
pub use pool::WorkerPool;
pub use request::{expand_requests, ConcreteRequest};

/// Problems found while preparing a run. Nothing is sent once one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// anything other than GET or POST
    UnsupportedMethod(String),
    RequestBuild { url: String, reason: String },
    /// header string isn't a `Name: Value` pair
    InvalidHeader(String),
    /// requests are wanted but every template is disabled
    NoTemplate,
    InvalidConcurrency(usize),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnsupportedMethod(method) => {
                write!(f, "unsupported method: {}", method)
            }
            ConfigError::RequestBuild { url, reason } => {
                write!(f, "invalid request url {}: {}", url, reason)
            }
            ConfigError::InvalidHeader(header) => write!(f, "invalid http header: {}", header),
            ConfigError::NoTemplate => write!(f, "no request configured"),
            ConfigError::InvalidConcurrency(c) => {
                write!(f, "concurrency must be at least 1, got {}", c)
            }
        }
    }
}

impl StdError for ConfigError {}

/// Failure below HTTP. Recorded as status 0, never stops a worker.
#[derive(Debug)]
pub enum TransportError {
    Http(hyper::Error),
    Timeout(Duration),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Http(e) => write!(f, "{}", e),
            TransportError::Timeout(timeout) => {
                write!(f, "no response within {}ms", timeout.as_millis())
            }
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TransportError::Http(e) => Some(e),
            TransportError::Timeout(_) => None,
        }
    }
}

impl From<hyper::Error> for TransportError {
    fn from(e: hyper::Error) -> Self {
        TransportError::Http(e)
    }
}

/// Validate the run settings and expand the templates into `total_requests` concrete requests
pub fn build_requests(config: &RunConfig) -> Result<Vec<ConcreteRequest>, ConfigError> {
    if config.concurrency == 0 {
        return Err(ConfigError::InvalidConcurrency(config.concurrency));
    }
    let requests = expand_requests(&config.templates, &config.headers, config.total_requests)?;
    debug!(
        "[build_requests] - {} requests built from {} templates",
        requests.len(),
        config.templates.len()
    );
    Ok(requests)
}


#[cfg(test)]
mod test {
    use super::*;
    use stress_types::RequestTemplate;

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = RunConfig {
            total_requests: 10,
            concurrency: 0,
            templates: vec![RequestTemplate::single_url(
                "http://127.0.0.1:2080/get".to_string(),
                String::new(),
                String::new(),
            )],
            ..Default::default()
        };
        assert_eq!(
            build_requests(&config).unwrap_err(),
            ConfigError::InvalidConcurrency(0)
        );
    }

    #[test]
    fn builds_total_requests() {
        let config = RunConfig {
            total_requests: 7,
            concurrency: 3,
            templates: vec![RequestTemplate::single_url(
                "http://127.0.0.1:2080/get".to_string(),
                String::new(),
                String::new(),
            )],
            ..Default::default()
        };
        assert_eq!(build_requests(&config).unwrap().len(), 7);
    }
}
