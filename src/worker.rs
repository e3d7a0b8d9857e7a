use std::sync::Arc;

use async_channel::Receiver;
use tracing::{debug, error};

use crate::dispatch::{EventDispatcher, Job};
use crate::metrics::Metrics;
use crate::stats::RunStats;

/// Everything a worker task needs, handed over at spawn time.
pub struct WorkerContext {
    pub worker_id: usize,
    pub queue: Receiver<Job>,
    pub dispatcher: Arc<dyn EventDispatcher>,
    pub stats: Arc<RunStats>,
    pub metrics: Arc<Metrics>,
    /// Target names, indexed like `Job::target`.
    pub target_names: Arc<[String]>,
}

/// Runs one worker until the queue is closed and drained.
///
/// There is no separate cancellation path: a worker only stops when
/// `recv` reports the queue closed and empty, so every job it dequeues is
/// dispatched and counted. Returns the number of jobs this worker handled.
pub async fn run_worker(ctx: WorkerContext) -> u64 {
    debug!(worker_id = ctx.worker_id, "Worker starting");
    let mut handled = 0u64;

    while let Ok(job) = ctx.queue.recv().await {
        let target_name = ctx
            .target_names
            .get(job.target)
            .map(String::as_str)
            .unwrap_or("unknown");

        ctx.metrics.concurrent_requests.inc();
        let outcome = ctx.dispatcher.dispatch(&job).await;
        ctx.metrics.concurrent_requests.dec();

        ctx.stats.record_outcome(
            job.target,
            outcome.is_success(),
            outcome.latency,
            outcome.body_bytes,
        );
        ctx.metrics.observe_dispatch(
            target_name,
            outcome.status,
            outcome.error,
            outcome.latency.as_secs_f64(),
        );

        if let Some(category) = outcome.error {
            match outcome.status {
                Some(status) => debug!(
                    worker_id = ctx.worker_id,
                    target_name = target_name,
                    status_code = status,
                    error_category = category.label(),
                    "Target rejected event"
                ),
                None => error!(
                    worker_id = ctx.worker_id,
                    target_name = target_name,
                    url = %job.target_url,
                    error = outcome.detail.as_deref().unwrap_or(""),
                    error_category = category.label(),
                    "Request failed"
                ),
            }
        }

        handled += 1;
    }

    debug!(
        worker_id = ctx.worker_id,
        handled = handled,
        "Worker stopping, queue drained"
    );
    handled
}
