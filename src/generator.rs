use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::RunConfig;
use crate::dispatch::{EventDispatcher, Job};
use crate::event::EventSynthesizer;
use crate::metrics::Metrics;
use crate::ramp::RampProfile;
use crate::reporter::{run_reporter, ReporterContext, RunSummary, REPORT_PERIOD};
use crate::scheduler::{run_scheduler, RateScheduler, SchedulerContext, SchedulerReport};
use crate::stats::RunStats;
use crate::worker::{run_worker, WorkerContext};

/// Owns one load run from first tick to final summary.
pub struct LoadGenerator {
    config: Arc<RunConfig>,
    dispatcher: Arc<dyn EventDispatcher>,
    metrics: Arc<Metrics>,
    stats: Arc<RunStats>,
}

impl LoadGenerator {
    pub fn new(
        config: Arc<RunConfig>,
        dispatcher: Arc<dyn EventDispatcher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let stats = Arc::new(RunStats::new(&config.selected_targets));
        Self {
            config,
            dispatcher,
            metrics,
            stats,
        }
    }

    /// Runs the scheduler for the configured duration, then waits for every
    /// queued job to be dispatched before building the summary.
    pub async fn run(&self) -> RunSummary {
        let config = &self.config;
        let targets = config.selected_targets.clone();
        let started_at = Instant::now();

        let (tx, rx) = async_channel::bounded::<Job>(config.queue_capacity.max(1));
        let target_names: Arc<[String]> = targets.iter().map(|t| t.name.clone()).collect();

        info!(
            dispatcher = self.dispatcher.name(),
            workers = config.concurrency,
            queue_capacity = config.queue_capacity,
            targets = targets.len(),
            "Starting load run"
        );

        let workers: Vec<JoinHandle<u64>> = (0..config.concurrency)
            .map(|worker_id| {
                tokio::spawn(run_worker(WorkerContext {
                    worker_id,
                    queue: rx.clone(),
                    dispatcher: self.dispatcher.clone(),
                    stats: self.stats.clone(),
                    metrics: self.metrics.clone(),
                    target_names: target_names.clone(),
                }))
            })
            .collect();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reporter = tokio::spawn(run_reporter(
            ReporterContext {
                stats: self.stats.clone(),
                metrics: self.metrics.clone(),
                queue: rx,
                started_at,
                period: REPORT_PERIOD,
            },
            shutdown_rx,
        ));

        let synthesizer = match config.event_seed {
            Some(seed) => EventSynthesizer::with_seed(seed),
            None => EventSynthesizer::new(),
        };
        let scheduler = tokio::spawn(run_scheduler(SchedulerContext {
            rate: RateScheduler::new(
                config.aggregate_eps,
                targets.len(),
                RampProfile::new(config.ramp_duration),
            ),
            targets,
            duration: config.duration,
            queue: tx,
            synthesizer,
            stats: self.stats.clone(),
            metrics: self.metrics.clone(),
        }));

        let scheduler_report = match scheduler.await {
            Ok(report) => report,
            Err(e) => {
                // The sender was dropped with the task, so workers still drain.
                error!(error = %e, "Scheduler task failed");
                SchedulerReport {
                    emitted: self.stats.snapshot().emitted(),
                    ..SchedulerReport::default()
                }
            }
        };
        info!("Test duration completed, draining dispatch queue");

        let mut handled = 0u64;
        for handle in workers {
            match handle.await {
                Ok(count) => handled += count,
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }
        let elapsed = started_at.elapsed();

        if let Err(e) = shutdown_tx.send(true) {
            debug!(error = %e, "Progress reporter already stopped");
        }
        if let Err(e) = reporter.await {
            error!(error = %e, "Progress reporter task failed");
        }

        let stats = self.stats.snapshot();
        info!(
            handled = handled,
            sent = stats.sent,
            ok = stats.ok,
            errors = stats.errors,
            elapsed_ms = elapsed.as_millis() as u64,
            "All workers finished"
        );

        RunSummary {
            elapsed,
            configured_eps: config.aggregate_eps,
            concurrency: config.concurrency,
            scheduler: scheduler_report,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchOutcome;
    use crate::targets::TargetTable;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedDispatcher {
        status: u16,
        delay: Duration,
    }

    #[async_trait]
    impl EventDispatcher for FixedDispatcher {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn dispatch(&self, _job: &Job) -> DispatchOutcome {
            tokio::time::sleep(self.delay).await;
            DispatchOutcome::from_status(self.status, self.delay, 64)
        }
    }

    fn config(eps: u64, concurrency: usize, duration: Duration) -> RunConfig {
        let table = TargetTable::from_base_url("http://x");
        RunConfig {
            base_url: "http://x".to_string(),
            aggregate_eps: eps,
            duration,
            concurrency,
            request_timeout: Duration::from_secs(3),
            ramp_duration: Duration::ZERO,
            selected_targets: table.all().to_vec(),
            queue_capacity: (eps * 2) as usize,
            skip_tls_verify: false,
            resolve_target_addr: None,
            metrics_port: None,
            metric_namespace: "generator_test".to_string(),
            event_seed: Some(3),
        }
    }

    fn generator(config: RunConfig, dispatcher: FixedDispatcher) -> LoadGenerator {
        let metrics = Arc::new(Metrics::new(&config.metric_namespace).unwrap());
        LoadGenerator::new(Arc::new(config), Arc::new(dispatcher), metrics)
    }

    #[tokio::test(start_paused = true)]
    async fn run_dispatches_every_emitted_event() {
        let generator = generator(
            config(200, 8, Duration::from_secs(2)),
            FixedDispatcher {
                status: 202,
                delay: Duration::from_millis(5),
            },
        );

        let summary = generator.run().await;

        assert_eq!(summary.scheduler.emitted, 400);
        assert_eq!(summary.stats.sent, 400);
        assert_eq!(summary.stats.ok, 400);
        assert_eq!(summary.stats.errors, 0);
        assert_eq!(summary.stats.targets[0].sent, 200);
        assert_eq!(summary.stats.targets[1].sent, 200);
        assert_eq!(summary.undelivered(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_targets_are_drained_after_deadline() {
        // One worker at 50ms per event handles 20 events/s but is offered 100.
        let mut cfg = config(100, 1, Duration::from_secs(1));
        cfg.queue_capacity = 1000;
        let generator = generator(
            cfg,
            FixedDispatcher {
                status: 503,
                delay: Duration::from_millis(50),
            },
        );

        let summary = generator.run().await;

        assert_eq!(summary.scheduler.emitted, 100);
        assert_eq!(summary.stats.sent, 100);
        assert_eq!(summary.stats.errors, 100);
        assert_eq!(summary.stats.ok, 0);
        assert!(summary.elapsed >= Duration::from_secs(5));
        assert_eq!(summary.stats.success_rate(), 0.0);
    }
}
