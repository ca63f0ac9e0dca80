//! Periodic enforcement loop
//!
//! Drives one enforcement pass per tick of a fixed-interval timer. Passes
//! never overlap: a pass that outlasts the interval coalesces the missed
//! ticks instead of queueing them. Shutdown is observed between ticks.

use super::{Enforcer, PassSummary};
use crate::health::{components, HealthRegistry};
use crate::observability::ControllerMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Configuration for the enforcement loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Interval between enforcement passes (default: 10 seconds)
    pub interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// Ticking task that repeats enforcement passes until cancelled.
pub struct EnforcementLoop {
    enforcer: Arc<Enforcer>,
    config: LoopConfig,
    health: HealthRegistry,
    stats: ControllerMetrics,
}

impl EnforcementLoop {
    pub fn new(
        enforcer: Arc<Enforcer>,
        config: LoopConfig,
        health: HealthRegistry,
        stats: ControllerMetrics,
    ) -> Self {
        Self {
            enforcer,
            config,
            health,
            stats,
        }
    }

    /// Run until the shutdown signal fires.
    pub async fn run(self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting enforcement loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    self.stats.inc_passes();

                    match self.enforcer.run_pass().await {
                        Ok(summary) => {
                            self.report(&summary).await;
                            debug!(
                                evaluated = summary.evaluated,
                                enforced = summary.enforced,
                                exceeded = summary.exceeded,
                                terminated = summary.terminated,
                                elapsed_ms = start.elapsed().as_millis(),
                                "Enforcement pass complete"
                            );
                        }
                        Err(error) => {
                            warn!(%error, "enforcement pass aborted");
                            self.stats.inc_list_errors();
                            self.health
                                .set_degraded(components::ENFORCER, error.to_string())
                                .await;
                        }
                    }

                    self.stats
                        .observe_pass_duration(start.elapsed().as_secs_f64());
                }
                _ = shutdown.recv() => {
                    info!("Shutting down enforcement loop");
                    break;
                }
            }
        }
    }

    async fn report(&self, summary: &PassSummary) {
        self.health.set_healthy(components::ENFORCER).await;

        if summary.enforced > 0 && summary.metrics_errors == summary.enforced {
            self.health
                .set_degraded(components::METRICS_SERVICE, "all usage lookups failed")
                .await;
        } else {
            self.health.set_healthy(components::METRICS_SERVICE).await;
        }
    }
}
