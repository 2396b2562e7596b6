//! Common environment variables used by various components

use once_cell::sync::OnceCell;
use std::env;
use std::str::FromStr;
use std::time::Duration;

static KEEP_ALIVE_IDLE_TIMEOUT: OnceCell<u64> = OnceCell::new();
pub const ENV_NAME_KEEP_ALIVE_IDLE_TIMEOUT: &str = "KEEP_ALIVE_IDLE_TIMEOUT";
pub const DEFAULT_KEEP_ALIVE_IDLE_TIMEOUT: u64 = 30;

/// How long an idle pooled connection is kept when keep-alive is enabled
pub fn keep_alive_idle_timeout() -> Duration {
    let secs = *KEEP_ALIVE_IDLE_TIMEOUT.get_or_init(|| {
        env::var(ENV_NAME_KEEP_ALIVE_IDLE_TIMEOUT)
            .map_err(|_| ())
            .and_then(|secs| u64::from_str(&secs).map_err(|_| ()))
            .unwrap_or(DEFAULT_KEEP_ALIVE_IDLE_TIMEOUT)
    });
    Duration::from_secs(secs)
}

pub const ENV_NAME_CONFIG_FILE: &str = "HTTPSTRESS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "./httpconfig";

pub fn default_config_file() -> String {
    env::var(ENV_NAME_CONFIG_FILE).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
}
