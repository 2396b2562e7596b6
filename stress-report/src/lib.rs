//! Collects request results from workers and turns them into the final [`Report`]

use log::{debug, error};
use std::fmt::{self, Display, Formatter};
use std::time::Duration;
use stress_types::RequestResult;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{channel, Receiver, Sender};

/// Receiving end of the result queue. Owned by whoever finalizes the run.
pub struct ResultSink {
    receiver: Receiver<RequestResult>,
}

/// Producer handle given to each worker
#[derive(Clone)]
pub struct ResultSender {
    sender: Sender<RequestResult>,
}

impl ResultSink {
    /// Creates a sink able to buffer `capacity` results without anyone reading them.
    ///
    /// Sized with the total request count, senders never have to wait for the consumer.
    pub fn new(capacity: usize) -> (ResultSink, ResultSender) {
        let (sender, receiver) = channel(capacity.max(1));
        (ResultSink { receiver }, ResultSender { sender })
    }

    /// Drain everything that's already queued and compute the report.
    ///
    /// Never waits for more results, anything that arrives after this point is lost. Consumes
    /// the sink, a run is finalized only once.
    pub fn finalize(mut self, elapsed: Duration, concurrency: usize) -> Report {
        let mut received = Vec::new();
        while let Ok(result) = self.receiver.try_recv() {
            if !result.is_success() {
                debug!("failed: {}", result.status_code);
            }
            received.push(result);
        }
        Report::from_results(&received, elapsed, concurrency)
    }
}

impl ResultSender {
    /// Queue a result without blocking
    pub fn add_result(&self, result: RequestResult) {
        match self.sender.try_send(result) {
            Ok(_) => {}
            Err(TrySendError::Full(result)) => {
                error!("[ResultSender] - result queue is full, dropping {:?}", result)
            }
            Err(TrySendError::Closed(_)) => {
                debug!("[ResultSender] - result queue closed, run already finalized")
            }
        }
    }
}

/// Aggregated outcome of a run. Built once by [`ResultSink::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    concurrency: usize,
    elapsed: Duration,
    total_received: u64,
    succeeded: u64,
    failed: u64,
    total_latency: Duration,
}

impl Report {
    fn new(concurrency: usize, elapsed: Duration) -> Self {
        Report {
            concurrency,
            elapsed,
            total_received: 0,
            succeeded: 0,
            failed: 0,
            total_latency: Duration::ZERO,
        }
    }

    /// Pure aggregation over a set of results
    pub fn from_results<'a, I>(results: I, elapsed: Duration, concurrency: usize) -> Self
    where
        I: IntoIterator<Item = &'a RequestResult>,
    {
        let mut report = Report::new(concurrency, elapsed);
        for result in results {
            report.add(result);
        }
        report
    }

    fn add(&mut self, result: &RequestResult) {
        self.total_received += 1;
        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.total_latency += result.duration;
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn total_received(&self) -> u64 {
        self.total_received
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded
    }

    /// Includes transport failures (status 0)
    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn is_empty(&self) -> bool {
        self.total_received == 0
    }

    /// `None` when nothing was received or no time elapsed
    pub fn requests_per_second(&self) -> Option<f64> {
        if self.is_empty() || self.elapsed.is_zero() {
            return None;
        }
        Some(self.total_received as f64 / self.elapsed.as_secs_f64())
    }

    /// Wall clock time divided by the number of received results, in seconds
    pub fn average_time_per_request(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.elapsed.as_secs_f64() / self.total_received as f64)
    }

    /// Mean of the per request durations measured by the workers
    pub fn mean_latency(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        let nanos = self.total_latency.as_nanos() / u128::from(self.total_received);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}

/// Human readable summary. Writes nothing when no result was received.
impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let average = match self.average_time_per_request() {
            Some(average) => average,
            None => return Ok(()),
        };
        let rps = self.requests_per_second().unwrap_or(0.0);
        writeln!(f, "Summary:")?;
        writeln!(f, " Concurrency Level:\t{}", self.concurrency)?;
        writeln!(
            f,
            " Time taken for tests:\t{:.4} secs",
            self.elapsed.as_secs_f64()
        )?;
        writeln!(f, " Complete requests:\t{}", self.total_received)?;
        writeln!(f, " Failed requests:\t{}", self.failed)?;
        writeln!(f, " Success requests:\t{}", self.succeeded)?;
        writeln!(f, " Requests per second:\t{:.4}", rps)?;
        writeln!(f, " Average time per request:\t{:.4}", average)
    }
}
