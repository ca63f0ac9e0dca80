//! Prometheus metrics for the enforcement loop
//!
//! Counters and a pass-duration histogram, registered once process-wide and
//! exposed on the binary's `/metrics` endpoint.

use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};
use std::sync::OnceLock;

/// Histogram buckets for enforcement pass duration (in seconds). A pass makes
/// one API call per enforced pod, so durations span well past a second.
const PASS_DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ControllerMetricsInner> = OnceLock::new();

struct ControllerMetricsInner {
    pass_duration_seconds: Histogram,
    passes_total: IntCounter,
    pods_evaluated_total: IntCounter,
    pods_exceeded_total: IntCounter,
    pods_terminated_total: IntCounter,
    list_errors_total: IntCounter,
    metrics_errors_total: IntCounter,
    termination_errors_total: IntCounter,
}

impl ControllerMetricsInner {
    fn new() -> Self {
        Self {
            pass_duration_seconds: register_histogram!(
                "soft_limit_pass_duration_seconds",
                "Time spent running one enforcement pass",
                PASS_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register pass_duration_seconds"),

            passes_total: register_int_counter!(
                "soft_limit_passes_total",
                "Total number of enforcement passes started"
            )
            .expect("Failed to register passes_total"),

            pods_evaluated_total: register_int_counter!(
                "soft_limit_pods_evaluated_total",
                "Total number of pods listed for evaluation"
            )
            .expect("Failed to register pods_evaluated_total"),

            pods_exceeded_total: register_int_counter!(
                "soft_limit_pods_exceeded_total",
                "Total number of pods whose usage exceeded their soft limits"
            )
            .expect("Failed to register pods_exceeded_total"),

            pods_terminated_total: register_int_counter!(
                "soft_limit_pods_terminated_total",
                "Total number of pods successfully terminated"
            )
            .expect("Failed to register pods_terminated_total"),

            list_errors_total: register_int_counter!(
                "soft_limit_list_errors_total",
                "Total number of passes aborted by a pod list failure"
            )
            .expect("Failed to register list_errors_total"),

            metrics_errors_total: register_int_counter!(
                "soft_limit_metrics_errors_total",
                "Total number of pods skipped because usage was unavailable"
            )
            .expect("Failed to register metrics_errors_total"),

            termination_errors_total: register_int_counter!(
                "soft_limit_termination_errors_total",
                "Total number of failed pod terminations"
            )
            .expect("Failed to register termination_errors_total"),
        }
    }
}

/// Controller metrics for Prometheus exposition.
///
/// A lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct ControllerMetrics {
    _private: (),
}

impl Default for ControllerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ControllerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ControllerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record the duration of one enforcement pass
    pub fn observe_pass_duration(&self, duration_secs: f64) {
        self.inner().pass_duration_seconds.observe(duration_secs);
    }

    pub fn inc_passes(&self) {
        self.inner().passes_total.inc();
    }

    pub fn add_pods_evaluated(&self, count: u64) {
        self.inner().pods_evaluated_total.inc_by(count);
    }

    pub fn inc_pods_exceeded(&self) {
        self.inner().pods_exceeded_total.inc();
    }

    pub fn inc_pods_terminated(&self) {
        self.inner().pods_terminated_total.inc();
    }

    pub fn inc_list_errors(&self) {
        self.inner().list_errors_total.inc();
    }

    pub fn inc_metrics_errors(&self) {
        self.inner().metrics_errors_total.inc();
    }

    pub fn inc_termination_errors(&self) {
        self.inner().termination_errors_total.inc();
    }
}
