use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_channel::Receiver;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::dispatch::Job;
use crate::metrics::Metrics;
use crate::scheduler::SchedulerReport;
use crate::stats::{format_target_table, RunStats, StatsSnapshot};

/// Default time between two progress lines.
pub const REPORT_PERIOD: Duration = Duration::from_secs(1);

/// Inputs for [`run_reporter`].
pub struct ReporterContext {
    pub stats: Arc<RunStats>,
    pub metrics: Arc<Metrics>,
    /// Used only to sample the queue depth.
    pub queue: Receiver<Job>,
    pub started_at: Instant,
    pub period: Duration,
}

/// Logs one progress line per period until `shutdown` flips to true.
///
/// Reporting is read-only: it never blocks the scheduler or the workers.
pub async fn run_reporter(ctx: ReporterContext, mut shutdown: watch::Receiver<bool>) {
    let mut interval = time::interval_at(ctx.started_at + ctx.period, ctx.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let elapsed = ctx.started_at.elapsed();
                let snapshot = ctx.stats.snapshot();
                let queued = ctx.queue.len();
                ctx.metrics.queue_depth.set(queued as i64);

                info!(
                    elapsed_secs = elapsed.as_secs_f64(),
                    sent = snapshot.sent,
                    ok = snapshot.ok,
                    errors = snapshot.errors,
                    achieved_eps = snapshot.achieved_eps(elapsed),
                    avg_latency_us = snapshot.mean_latency().as_micros() as u64,
                    queued = queued,
                    "{}",
                    snapshot.format_progress(elapsed)
                );
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    ctx.metrics.queue_depth.set(ctx.queue.len() as i64);
    debug!("Progress reporter stopped");
}

/// Final report for a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Wall time from start until the last worker finished draining.
    pub elapsed: Duration,
    pub configured_eps: u64,
    pub concurrency: usize,
    pub scheduler: SchedulerReport,
    pub stats: StatsSnapshot,
}

impl RunSummary {
    pub fn achieved_eps(&self) -> f64 {
        self.stats.achieved_eps(self.elapsed)
    }

    /// Emitted jobs that never produced an outcome; zero after a clean drain.
    pub fn undelivered(&self) -> u64 {
        self.scheduler.emitted.saturating_sub(self.stats.sent)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed_ms = Duration::from_millis(self.elapsed.as_millis() as u64);

        writeln!(f, "====== Summary ======")?;
        writeln!(f, "Duration:        {:?}", elapsed_ms)?;
        writeln!(f, "Configured EPS:  {} (total)", self.configured_eps)?;
        writeln!(f, "Achieved EPS:    {:.2}", self.achieved_eps())?;
        writeln!(f, "Total sent:      {}", self.stats.sent)?;
        writeln!(f, "Success:         {}", self.stats.ok)?;
        writeln!(f, "Errors:          {}", self.stats.errors)?;
        writeln!(f, "Success rate:    {:.2}%", self.stats.success_rate())?;
        writeln!(f, "Avg latency:     {:?}", self.stats.mean_latency())?;
        writeln!(f, "Bytes sent:      {}", self.stats.bytes_sent)?;
        writeln!(f, "Concurrency:     {} workers", self.concurrency)?;
        writeln!(
            f,
            "Emitted:         {} ({} abandoned at deadline)",
            self.scheduler.emitted, self.scheduler.abandoned
        )?;
        writeln!(f)?;
        write!(f, "{}", format_target_table(&self.stats.targets, self.elapsed))
    }
}
