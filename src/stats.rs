//! Shared run counters and per-target throughput accounting.
//!
//! Every field is an independent `AtomicU64` updated with `fetch_add`, so
//! workers never contend on a lock. The per-target slots are allocated once
//! from the selected target set and indexed by the job's target index.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::targets::TargetSpec;

/// Counters for a single target.
#[derive(Debug)]
pub struct TargetStats {
    name: String,
    emitted: AtomicU64,
    ok: AtomicU64,
    errors: AtomicU64,
    latency_sum_us: AtomicU64,
}

impl TargetStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            emitted: AtomicU64::new(0),
            ok: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
        }
    }
}

/// Process-wide outcome counters for one run.
#[derive(Debug)]
pub struct RunStats {
    ok: AtomicU64,
    errors: AtomicU64,
    latency_sum_us: AtomicU64,
    bytes_sent: AtomicU64,
    targets: Vec<TargetStats>,
}

impl RunStats {
    pub fn new(targets: &[TargetSpec]) -> Self {
        Self {
            ok: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            targets: targets.iter().map(|t| TargetStats::new(&t.name)).collect(),
        }
    }

    /// Records that the scheduler enqueued one job for `target`.
    pub fn record_emitted(&self, target: usize) {
        if let Some(t) = self.targets.get(target) {
            t.emitted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records one completed dispatch. Latency and bytes are added before the
    /// outcome counter, so a reader that sees the outcome also sees them.
    pub fn record_outcome(&self, target: usize, success: bool, latency: Duration, body_bytes: u64) {
        let latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);

        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.bytes_sent.fetch_add(body_bytes, Ordering::Relaxed);
        let outcome = if success { &self.ok } else { &self.errors };
        outcome.fetch_add(1, Ordering::Release);

        if let Some(t) = self.targets.get(target) {
            t.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
            let outcome = if success { &t.ok } else { &t.errors };
            outcome.fetch_add(1, Ordering::Release);
        }
    }

    /// Consistent view of the counters.
    ///
    /// `sent` is reported as the sum of the loaded outcome counters, so
    /// `sent == ok + errors` holds for every snapshot even while workers are
    /// recording.
    pub fn snapshot(&self) -> StatsSnapshot {
        let ok = self.ok.load(Ordering::Acquire);
        let errors = self.errors.load(Ordering::Acquire);
        let latency_sum_us = self.latency_sum_us.load(Ordering::Relaxed);
        let bytes_sent = self.bytes_sent.load(Ordering::Relaxed);

        let targets = self
            .targets
            .iter()
            .map(|t| {
                let ok = t.ok.load(Ordering::Acquire);
                let errors = t.errors.load(Ordering::Acquire);
                TargetSnapshot {
                    name: t.name.clone(),
                    emitted: t.emitted.load(Ordering::Relaxed),
                    sent: ok + errors,
                    ok,
                    errors,
                    latency_sum_us: t.latency_sum_us.load(Ordering::Relaxed),
                }
            })
            .collect();

        StatsSnapshot {
            sent: ok + errors,
            ok,
            errors,
            latency_sum_us,
            bytes_sent,
            targets,
        }
    }
}

/// Point-in-time copy of the run counters.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub sent: u64,
    pub ok: u64,
    pub errors: u64,
    pub latency_sum_us: u64,
    pub bytes_sent: u64,
    pub targets: Vec<TargetSnapshot>,
}

impl StatsSnapshot {
    /// Arithmetic mean latency; zero when nothing was sent.
    pub fn mean_latency(&self) -> Duration {
        mean_latency(self.latency_sum_us, self.sent)
    }

    /// Achieved events per second over `elapsed`.
    pub fn achieved_eps(&self, elapsed: Duration) -> f64 {
        rate(self.sent, elapsed)
    }

    /// Percentage of sent events that succeeded; zero when nothing was sent.
    pub fn success_rate(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        self.ok as f64 / self.sent as f64 * 100.0
    }

    pub fn emitted(&self) -> u64 {
        self.targets.iter().map(|t| t.emitted).sum()
    }

    /// One-line progress report.
    pub fn format_progress(&self, elapsed: Duration) -> String {
        format!(
            "t={:>6.1}s sent={} ok={} errs={} eps={:.1} avg_lat={:?}",
            elapsed.as_secs_f64(),
            self.sent,
            self.ok,
            self.errors,
            self.achieved_eps(elapsed),
            self.mean_latency()
        )
    }
}

/// Counters for one target at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSnapshot {
    pub name: String,
    pub emitted: u64,
    pub sent: u64,
    pub ok: u64,
    pub errors: u64,
    pub latency_sum_us: u64,
}

impl TargetSnapshot {
    pub fn mean_latency(&self) -> Duration {
        mean_latency(self.latency_sum_us, self.sent)
    }

    /// Format as a table row.
    pub fn format_table_row(&self, elapsed: Duration) -> String {
        format!(
            "{:<16} {:>10} {:>10} {:>10} {:>10} {:>10.2} {:>12.2}",
            self.name,
            self.emitted,
            self.sent,
            self.ok,
            self.errors,
            rate(self.sent, elapsed),
            self.mean_latency().as_secs_f64() * 1000.0
        )
    }
}

/// Format per-target statistics as a table.
pub fn format_target_table(targets: &[TargetSnapshot], elapsed: Duration) -> String {
    if targets.is_empty() {
        return "No target data available.\n".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<16} {:>10} {:>10} {:>10} {:>10} {:>10} {:>12}\n",
        "Target", "Emitted", "Sent", "OK", "Errors", "EPS", "Avg (ms)"
    ));
    output.push_str(&"-".repeat(84));
    output.push('\n');

    for target in targets {
        output.push_str(&target.format_table_row(elapsed));
        output.push('\n');
    }

    output
}

fn mean_latency(latency_sum_us: u64, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(latency_sum_us / count)
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}
