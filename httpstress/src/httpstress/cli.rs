use std::time::Duration;

use clap::{ArgAction, Parser};
use stress_config::{load_run_config, ConfigFileError};
use stress_types::{
    RequestTemplate, RunConfig, DEFAULT_CONCURRENCY, DEFAULT_CONTENT_TYPE, DEFAULT_TIMEOUT_SECS,
    DEFAULT_TOTAL_REQUESTS,
};

/// Send a fixed number of HTTP requests with a fixed number of workers and report how it went.
///
/// Either a single url is given, or the requests are read from a config file.
#[derive(Debug, Clone, Parser)]
#[command(name = "httpstress")]
#[command(bin_name = "httpstress")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Number of requests to run
    #[arg(short = 'n', value_name = "N", default_value_t = DEFAULT_TOTAL_REQUESTS)]
    pub requests: usize,

    /// Number of requests to run concurrently
    #[arg(short = 'c', value_name = "N", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Connection timeout, 0 for no timeout
    #[arg(short = 't', value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Http keep-alive, -k or -k=true|false
    #[arg(
        short = 'k',
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub keep_alive: bool,

    /// Custom http header, repeatable, eg. -H "Accept: text/html"
    #[arg(short = 'H', value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Request body, sends POST requests when set
    #[arg(short = 'd', value_name = "BODY", default_value = "")]
    pub body: String,

    /// Content-Type header
    #[arg(short = 'T', value_name = "TYPE", default_value = DEFAULT_CONTENT_TYPE)]
    pub content_type: String,

    /// Config file with the requests to run, used when no url is given
    #[arg(short = 'f', value_name = "FILE")]
    pub config_file: Option<String>,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    pub url: Option<String>,
}

impl Args {
    fn base_config(&self) -> RunConfig {
        RunConfig {
            total_requests: self.requests,
            concurrency: self.concurrency,
            timeout: Duration::from_secs(self.timeout),
            keep_alive: self.keep_alive,
            headers: self.headers.clone(),
            templates: vec![],
        }
    }

    /// Build the run configuration. A url on the command line wins over the config file.
    pub fn into_run_config(self) -> Result<RunConfig, ConfigFileError> {
        let mut config = self.base_config();
        match self.url {
            Some(url) => {
                config.templates = vec![RequestTemplate::single_url(
                    url,
                    self.body,
                    self.content_type,
                )];
                Ok(config)
            }
            None => {
                let path = self
                    .config_file
                    .unwrap_or_else(common_env::default_config_file);
                load_run_config(path, config)
            }
        }
    }
}
