use std::io::Write;
use std::time::Instant;

use log::{debug, info, trace};
use stress_executor::{
    build_requests, ClientOptions, ConfigError, HyperSender, RequestSender, WorkerPool,
};
use stress_report::{Report, ResultSink};
use stress_types::RunConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::log_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Dispatching,
    Completed,
    Cancelled,
    Finalized,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    /// how dispatching ended, [`RunState::Completed`] or [`RunState::Cancelled`]
    pub state: RunState,
}

impl RunOutcome {
    pub fn cancelled(&self) -> bool {
        self.state == RunState::Cancelled
    }

    /// 0 when every worker finished, 1 if the run was interrupted
    pub fn exit_status(&self) -> u8 {
        if self.cancelled() {
            1
        } else {
            0
        }
    }
}

/// Drives a single run: build the requests, dispatch them, wait for the workers or for a
/// cancellation, then finalize.
pub struct RunController {
    config: RunConfig,
    state: RunState,
    cancel: CancellationToken,
}

impl RunController {
    pub fn new(config: RunConfig) -> Self {
        RunController {
            config,
            state: RunState::Idle,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Cancelling this token stops waiting for the workers and finalizes with the results
    /// received so far
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn transition(&mut self, next: RunState) {
        debug!("[RunController] - {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run against the real targets, cancelled by an interrupt signal (ctrl-c)
    pub async fn run(&mut self) -> Result<RunOutcome, ConfigError> {
        let options = ClientOptions::from_config(&self.config);
        let listener = listen_for_interrupt(self.cancellation_token());
        let outcome = self.run_with(move |_| HyperSender::new(options)).await;
        if let Some(listener) = listener {
            listener.abort();
        }
        outcome
    }

    /// Same as [`RunController::run`] with a custom sender for each worker and no signal
    /// listener
    pub async fn run_with<F, S>(&mut self, new_sender: F) -> Result<RunOutcome, ConfigError>
    where
        F: Fn(usize) -> S,
        S: RequestSender + 'static,
    {
        let requests = build_requests(&self.config)?;
        if let Ok(config) = serde_json::to_string(&self.config) {
            debug!("[RunController] - effective config: {}", config);
        }
        let concurrency = self.config.concurrency;
        let (sink, results) = ResultSink::new(requests.len());
        let pool = WorkerPool::new(requests, concurrency, results);

        self.transition(RunState::Dispatching);
        info!("start...");
        let start = Instant::now();
        let cancelled = tokio::select! {
            _ = pool.run(new_sender) => false,
            _ = self.cancel.cancelled() => true,
        };
        let elapsed = start.elapsed();

        let state = if cancelled {
            info!("interrupted, finalizing with the results received so far");
            RunState::Cancelled
        } else {
            RunState::Completed
        };
        self.transition(state);

        let report = sink.finalize(elapsed, concurrency);
        self.transition(RunState::Finalized);
        if let Some(latency) = report.mean_latency() {
            info!(
                "{} results received, mean request latency: {}ms",
                report.total_received(),
                latency.as_millis()
            );
        }
        Ok(RunOutcome { report, state })
    }

    /// Write the summary and return the process exit status
    pub fn finish<W: Write>(&mut self, outcome: &RunOutcome, out: &mut W) -> u8 {
        if outcome.report.is_empty() {
            info!("no result received, nothing to report");
        }
        log_error!(write!(out, "{}", outcome.report).and_then(|_| out.flush()));
        self.transition(RunState::Terminated);
        outcome.exit_status()
    }
}

/// The handler is installed before returning, an interrupt arriving right after is not lost
#[cfg(unix)]
fn listen_for_interrupt(token: CancellationToken) -> Option<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(interrupt) => interrupt,
        Err(e) => {
            trace!("can't listen for interrupt signal: {}", e);
            return None;
        }
    };
    Some(tokio::spawn(async move {
        if interrupt.recv().await.is_some() {
            info!("receive interrupt");
            token.cancel();
        }
    }))
}

#[cfg(not(unix))]
fn listen_for_interrupt(token: CancellationToken) -> Option<JoinHandle<()>> {
    Some(tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(_) => {
                info!("receive interrupt");
                token.cancel();
            }
            Err(e) => trace!("can't listen for interrupt signal: {}", e),
        }
    }))
}
