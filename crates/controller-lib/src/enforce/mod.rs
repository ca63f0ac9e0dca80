//! Enforcement pass orchestration
//!
//! One pass lists pods, derives soft limits from annotations, fetches live
//! usage, and terminates pods whose usage exceeds their limits. Failures are
//! per-pod: logged, counted, and skipped; one pod never affects its siblings.

mod r#loop;

pub use r#loop::{EnforcementLoop, LoopConfig};

use crate::decision::exceeds;
use crate::error::Error;
use crate::limits::LimitDeriver;
use crate::models::{UsageSample, Workload, WorkloadRef};
use crate::observability::ControllerMetrics;
use crate::usage::aggregate_usage;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use async_trait::async_trait;

/// Lists the pods under enforcement, with annotations and per-container hard
/// limits populated.
#[async_trait]
pub trait WorkloadLister: Send + Sync {
    async fn list(&self) -> Result<Vec<Workload>, Error>;
}

/// Fetches per-container usage samples for one pod.
#[async_trait]
pub trait MetricsClient: Send + Sync {
    async fn usage(&self, workload: &WorkloadRef) -> Result<Vec<UsageSample>, Error>;
}

/// Deletes a pod. Fire-and-forget per pod; no rollback.
#[async_trait]
pub trait WorkloadTerminator: Send + Sync {
    async fn terminate(&self, workload: &WorkloadRef) -> Result<(), Error>;
}

/// Records the "exceeded soft limit, terminating" event against a pod.
/// Best effort; implementations log and swallow their own failures.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn exceeded(&self, workload: &Workload);
}

/// Outcome counters for one enforcement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Pods listed for evaluation.
    pub evaluated: usize,
    /// Pods with at least one enforceable soft limit.
    pub enforced: usize,
    /// Pods whose usage exceeded a limit.
    pub exceeded: usize,
    /// Pods successfully terminated.
    pub terminated: usize,
    /// Pods skipped because usage was unavailable.
    pub metrics_errors: usize,
    /// Exceeded pods whose deletion failed.
    pub termination_errors: usize,
}

/// Runs enforcement passes against a set of collaborators.
///
/// Owns the limit deriver (and through it the percentage-literal cache, the
/// only state surviving across passes).
pub struct Enforcer {
    lister: Arc<dyn WorkloadLister>,
    metrics: Arc<dyn MetricsClient>,
    terminator: Arc<dyn WorkloadTerminator>,
    recorder: Option<Arc<dyn EventRecorder>>,
    deriver: LimitDeriver,
    stats: ControllerMetrics,
}

impl Enforcer {
    pub fn new(
        lister: Arc<dyn WorkloadLister>,
        metrics: Arc<dyn MetricsClient>,
        terminator: Arc<dyn WorkloadTerminator>,
        stats: ControllerMetrics,
    ) -> Self {
        Self {
            lister,
            metrics,
            terminator,
            recorder: None,
            deriver: LimitDeriver::new(),
            stats,
        }
    }

    /// Attach an event recorder for termination notices.
    pub fn with_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Run one enforcement pass over the current pod set.
    ///
    /// Only a list failure aborts the pass; every per-pod failure is counted
    /// in the summary and skipped.
    pub async fn run_pass(&self) -> Result<PassSummary, Error> {
        let pods = self.lister.list().await?;

        let mut summary = PassSummary {
            evaluated: pods.len(),
            ..PassSummary::default()
        };
        self.stats.add_pods_evaluated(pods.len() as u64);

        for pod in &pods {
            self.evaluate(pod, &mut summary).await;
        }

        Ok(summary)
    }

    async fn evaluate(&self, pod: &Workload, summary: &mut PassSummary) {
        let soft = self.deriver.derive(pod);
        if !soft.annotated {
            return;
        }
        if soft.limits.is_empty() {
            debug!(
                pod = %pod.workload_ref(),
                "soft-limit annotations present but nothing enforceable"
            );
            return;
        }
        summary.enforced += 1;

        let reference = pod.workload_ref();
        let samples = match self.metrics.usage(&reference).await {
            Ok(samples) => samples,
            Err(error) => {
                warn!(pod = %reference, %error, "skipping pod, usage unavailable");
                summary.metrics_errors += 1;
                self.stats.inc_metrics_errors();
                return;
            }
        };

        let usage = aggregate_usage(&samples);
        if !exceeds(&soft.limits, &usage) {
            return;
        }
        summary.exceeded += 1;
        self.stats.inc_pods_exceeded();
        info!(pod = %reference, "soft limit exceeded, terminating pod");

        if let Some(recorder) = &self.recorder {
            recorder.exceeded(pod).await;
        }

        match self.terminator.terminate(&reference).await {
            Ok(()) => {
                summary.terminated += 1;
                self.stats.inc_pods_terminated();
            }
            Err(error) => {
                warn!(pod = %reference, %error, "failed to terminate pod");
                summary.termination_errors += 1;
                self.stats.inc_termination_errors();
            }
        }
    }
}
