//! Long-running daemon loop
//!
//! ```text
//! RUNNING_CYCLE ──ok/skipped──▶ SLEEPING(jitter) ──▶ RUNNING_CYCLE ...
//!       │
//!       └──error/panic──▶ SLEEPING(cooldown) ──▶ RUNNING_CYCLE ...
//! ```
//!
//! The loop only ends on a shutdown signal, which is honoured both while a
//! cycle runs and while sleeping.

use futures::FutureExt;
use rand::Rng;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScheduleConfig;
use crate::metrics::{self, CycleStatus};
use crate::orchestrator::{panic_message, CycleOutcome, CycleRunner};

/// Counters reported when the daemon stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonStats {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DaemonStats {
    pub fn cycles(&self) -> usize {
        self.completed + self.skipped + self.failed
    }
}

/// Runs cycles forever with randomized spacing
pub struct Daemon {
    runner: Arc<dyn CycleRunner>,
    min_delay: Duration,
    max_delay: Duration,
    cooldown: Duration,
}

impl Daemon {
    pub fn new(runner: Arc<dyn CycleRunner>, schedule: &ScheduleConfig) -> Self {
        Self {
            runner,
            min_delay: Duration::from_secs(schedule.min_delay_secs),
            max_delay: Duration::from_secs(schedule.max_delay_secs.max(schedule.min_delay_secs)),
            cooldown: schedule.error_cooldown(),
        }
    }

    /// Sleep after a completed or skipped cycle
    pub fn jitter(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let secs = rand::thread_rng()
            .gen_range(self.min_delay.as_secs_f64()..=self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Run a single cycle, converting a panic into a failed outcome
    async fn run_guarded(&self) -> Result<CycleOutcome, String> {
        match AssertUnwindSafe(self.runner.run_cycle()).catch_unwind().await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => {
                if !e.is_recoverable() {
                    tracing::warn!(
                        category = %e.category(),
                        "Cycle error will repeat until the configuration is fixed"
                    );
                }
                Err(format!("{} ({})", e, e.category()))
            }
            Err(panic) => {
                metrics::record_cycle_status(CycleStatus::Failed);
                Err(format!("cycle panicked: {}", panic_message(panic)))
            }
        }
    }

    /// Run until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F) -> DaemonStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = DaemonStats::default();

        tracing::info!(
            min_delay_secs = self.min_delay.as_secs(),
            max_delay_secs = self.max_delay.as_secs(),
            cooldown_secs = self.cooldown.as_secs(),
            "Stock checker daemon started"
        );

        loop {
            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested during cycle");
                    break;
                }
                outcome = self.run_guarded() => outcome,
            };

            let delay = match outcome {
                Ok(CycleOutcome::Completed(_)) => {
                    stats.completed += 1;
                    self.jitter()
                }
                Ok(CycleOutcome::Skipped(reason)) => {
                    tracing::info!("Cycle skipped: {}", reason);
                    stats.skipped += 1;
                    self.jitter()
                }
                Err(e) => {
                    tracing::error!("Cycle failed: {}", e);
                    stats.failed += 1;
                    self.cooldown
                }
            };

            tracing::info!("Sleeping for {:.2} seconds before next check", delay.as_secs_f64());

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested while sleeping");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!(
            completed = stats.completed,
            skipped = stats.skipped,
            failed = stats.failed,
            "Stock checker daemon stopped"
        );
        stats
    }

    /// Run until Ctrl-C or SIGTERM
    pub async fn run(&self) -> DaemonStats {
        self.run_until(shutdown_signal()).await
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!("Failed to wait for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("SIGTERM received");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl CycleRunner for Noop {
        async fn run_cycle(&self) -> Result<CycleOutcome> {
            Ok(CycleOutcome::Skipped("noop".to_string()))
        }
    }

    fn schedule(min: u64, max: u64) -> ScheduleConfig {
        ScheduleConfig {
            min_delay_secs: min,
            max_delay_secs: max,
            ..ScheduleConfig::default()
        }
    }

    #[test]
    fn test_jitter_within_bounds() {
        let daemon = Daemon::new(Arc::new(Noop), &schedule(30, 60));
        for _ in 0..100 {
            let d = daemon.jitter();
            assert!(d >= Duration::from_secs(30) && d <= Duration::from_secs(60));
        }
        assert_eq!(daemon.cooldown(), Duration::from_secs(300));
    }

    #[test]
    fn test_fixed_jitter() {
        let daemon = Daemon::new(Arc::new(Noop), &schedule(45, 45));
        assert_eq!(daemon.jitter(), Duration::from_secs(45));
    }

    #[tokio::test]
    async fn test_immediate_shutdown_runs_no_cycle() {
        let daemon = Daemon::new(Arc::new(Noop), &schedule(1, 1));
        let stats = daemon.run_until(async {}).await;
        assert_eq!(stats.cycles(), 0);
    }

    #[test]
    fn test_stats_cycles() {
        let stats = DaemonStats {
            completed: 2,
            skipped: 1,
            failed: 3,
        };
        assert_eq!(stats.cycles(), 6);
    }
}
