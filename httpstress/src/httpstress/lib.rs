pub mod cli;
pub mod controller;

pub use controller::{RunController, RunOutcome, RunState};

pub use stress_executor::ConfigError;
pub use stress_report::Report;
pub use stress_types::{RequestTemplate, RunConfig};

#[macro_export]
macro_rules! log_error {
    ($result:expr) => {
        if let Err(e) = $result {
            log::error!("{}", e.to_string());
        }
    };
}
