use std::time::Instant;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use log::{debug, error, trace, warn};
use stress_report::ResultSender;
use stress_types::RequestResult;

use crate::{ConcreteRequest, RequestSender};

/// Fans the requests out to `concurrency` workers.
///
/// Worker `r` owns the contiguous slice `[r * (N / C), (r + 1) * (N / C))`. When `N` isn't a
/// multiple of `C` the last `N % C` requests aren't assigned to anyone and are never sent.
pub struct WorkerPool {
    slices: Vec<Vec<ConcreteRequest>>,
    results: ResultSender,
}

impl WorkerPool {
    pub fn new(requests: Vec<ConcreteRequest>, concurrency: usize, results: ResultSender) -> Self {
        let total = requests.len();
        let per_worker = total.checked_div(concurrency).unwrap_or(0);
        let unscheduled = total - per_worker * concurrency;
        if unscheduled > 0 {
            warn!(
                "[WorkerPool] - {} requests can't be split evenly across {} workers, {} won't be sent",
                total, concurrency, unscheduled
            );
        }
        let mut requests = requests.into_iter();
        let slices = (0..concurrency)
            .map(|_| requests.by_ref().take(per_worker).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        WorkerPool { slices, results }
    }

    /// Number of requests that will actually be sent
    pub fn scheduled(&self) -> usize {
        self.slices.iter().map(Vec::len).sum()
    }

    pub fn workers(&self) -> usize {
        self.slices.len()
    }

    /// Run every worker to completion. `new_sender` is called once per worker, so each one gets
    /// its own client.
    ///
    /// Workers are spawned tasks, if this future is dropped they keep running in the background.
    pub async fn run<F, S>(self, new_sender: F)
    where
        F: Fn(usize) -> S,
        S: RequestSender + 'static,
    {
        debug!(
            "[WorkerPool] - starting {} workers for {} requests",
            self.workers(),
            self.scheduled()
        );
        let mut workers = self
            .slices
            .into_iter()
            .enumerate()
            .map(|(worker, slice)| {
                let sender = new_sender(worker);
                tokio::spawn(run_worker(worker, sender, slice, self.results.clone()))
            })
            .collect::<FuturesUnordered<_>>();
        while let Some(joined) = workers.next().await {
            if let Err(e) = joined {
                error!("[WorkerPool] - worker failed: {}", e);
            }
        }
        debug!("[WorkerPool] - all workers finished");
    }
}

async fn run_worker<S: RequestSender>(
    worker: usize,
    mut sender: S,
    slice: Vec<ConcreteRequest>,
    results: ResultSender,
) {
    trace!("[worker {}] - {} requests", worker, slice.len());
    for request in slice {
        let start = Instant::now();
        let result = match sender.send(request).await {
            Ok(status) => RequestResult::new(status, start.elapsed()),
            Err(e) => {
                let result = RequestResult::transport_failure(start.elapsed());
                warn!("[worker {}] - request failed: {}", worker, e);
                result
            }
        };
        results.add_result(result);
    }
    trace!("[worker {}] - done", worker);
}
