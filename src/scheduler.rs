//! Fractional-rate tick scheduler.
//!
//! Every tick each target's carry grows by `instant_eps / TICK_HZ`; the whole
//! part is emitted as jobs and the fractional remainder is kept for the next
//! tick. Over any long window the emitted count per target therefore tracks
//! `rate x time` to within one job, with no truncation bias.

use std::sync::Arc;
use std::time::Duration;

use async_channel::Sender;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::dispatch::Job;
use crate::event::EventSynthesizer;
use crate::metrics::Metrics;
use crate::ramp::RampProfile;
use crate::stats::RunStats;
use crate::targets::TargetSpec;

/// Scheduler wake-ups per second.
pub const TICK_HZ: u32 = 100;

/// Time between two scheduler ticks.
pub const TICK_PERIOD: Duration = Duration::from_millis(1000 / TICK_HZ as u64);

/// Deadline offset used when `start + duration` is not representable.
const UNBOUNDED_RUN: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Per-target carry accounting, independent of any clock or queue.
#[derive(Debug, Clone)]
pub struct RateScheduler {
    per_target_eps: f64,
    ramp: RampProfile,
    carry: Vec<f64>,
    counts: Vec<u64>,
}

impl RateScheduler {
    /// Splits `aggregate_eps` evenly across `target_count` targets.
    pub fn new(aggregate_eps: u64, target_count: usize, ramp: RampProfile) -> Self {
        let per_target_eps = if target_count == 0 {
            0.0
        } else {
            aggregate_eps as f64 / target_count as f64
        };
        Self {
            per_target_eps,
            ramp,
            carry: vec![0.0; target_count],
            counts: vec![0; target_count],
        }
    }

    pub fn per_target_eps(&self) -> f64 {
        self.per_target_eps
    }

    /// Jobs owed per target for the tick scheduled `elapsed` after start.
    pub fn plan_tick(&mut self, elapsed: Duration) -> &[u64] {
        let instant_eps = self.ramp.rate_at(self.per_target_eps, elapsed);
        let per_tick = instant_eps / TICK_HZ as f64;

        for (carry, count) in self.carry.iter_mut().zip(self.counts.iter_mut()) {
            *carry += per_tick;
            let whole = carry.floor();
            *carry -= whole;
            *count = whole as u64;
        }

        &self.counts
    }

    /// Current fractional remainders, indexed like the target set.
    pub fn carry(&self) -> &[f64] {
        &self.carry
    }
}

/// What the scheduler did over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub ticks: u64,
    pub emitted: u64,
    /// Jobs owed in the final tick that could not be enqueued before the deadline.
    pub abandoned: u64,
}

/// Inputs for [`run_scheduler`].
pub struct SchedulerContext {
    pub targets: Vec<TargetSpec>,
    pub rate: RateScheduler,
    pub duration: Duration,
    pub queue: Sender<Job>,
    pub synthesizer: EventSynthesizer,
    pub stats: Arc<RunStats>,
    pub metrics: Arc<Metrics>,
}

/// Drives the tick loop until the run deadline, then closes the queue.
///
/// The deadline is fixed when this function starts. A full queue blocks
/// emission until space frees or the deadline passes; in the latter case the
/// rest of the tick is abandoned. Leftover carry is discarded.
pub async fn run_scheduler(ctx: SchedulerContext) -> SchedulerReport {
    let SchedulerContext {
        targets,
        mut rate,
        duration,
        queue,
        mut synthesizer,
        stats,
        metrics,
    } = ctx;

    let start = Instant::now();
    let deadline = start
        .checked_add(duration)
        .unwrap_or_else(|| start + UNBOUNDED_RUN);

    // Burst catches up ticks missed while blocked so the long-run rate holds.
    let mut interval = time::interval_at(start, TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

    let mut report = SchedulerReport::default();

    info!(
        targets = targets.len(),
        per_target_eps = rate.per_target_eps(),
        duration = ?duration,
        "Scheduler starting"
    );

    'ticks: loop {
        let tick_at = tokio::select! {
            biased;
            _ = time::sleep_until(deadline) => break 'ticks,
            tick_at = interval.tick() => tick_at,
        };
        if tick_at >= deadline {
            break;
        }
        report.ticks += 1;

        let counts = rate.plan_tick(tick_at.duration_since(start));

        for (idx, &count) in counts.iter().enumerate() {
            let target = &targets[idx];

            for emitted_here in 0..count {
                let job = Job {
                    target: idx,
                    target_url: target.url.clone(),
                    event: synthesizer.synthesize(),
                };

                match time::timeout_at(deadline, queue.send(job)).await {
                    Ok(Ok(())) => {
                        report.emitted += 1;
                        stats.record_emitted(idx);
                        metrics
                            .events_emitted_total
                            .with_label_values(&[target.name.as_str()])
                            .inc();
                    }
                    Ok(Err(_)) | Err(_) => {
                        let rest_of_tick: u64 = counts[idx + 1..].iter().sum();
                        report.abandoned += (count - emitted_here) + rest_of_tick;
                        warn!(
                            target_name = %target.name,
                            abandoned = report.abandoned,
                            queue_closed = queue.is_closed(),
                            "Deadline reached with a full dispatch queue, abandoning tick"
                        );
                        break 'ticks;
                    }
                }
            }
        }

        debug!(tick = report.ticks, emitted = report.emitted, "Tick complete");
    }

    // Buffered jobs stay receivable after close.
    queue.close();

    info!(
        ticks = report.ticks,
        emitted = report.emitted,
        abandoned = report.abandoned,
        queued = queue.len(),
        "Scheduler stopped, dispatch queue closed"
    );

    report
}
