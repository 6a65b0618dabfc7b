//! Observability infrastructure for the serving pipeline
//!
//! Prometheus metrics for inference latency, prediction counts, model
//! loads, and rejected batch rows. Structured logging goes through
//! `tracing` at the call sites.

use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};
use std::sync::OnceLock;

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServingMetricsInner> = OnceLock::new();

struct ServingMetricsInner {
    inference_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounter,
    model_loads_total: IntCounter,
    rows_rejected_total: IntCounter,
}

impl ServingMetricsInner {
    fn new() -> Self {
        Self {
            inference_latency_seconds: register_histogram!(
                "pricer_inference_latency_seconds",
                "Time spent in the inference pipeline per request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            predictions_total: register_int_counter!(
                "pricer_predictions_total",
                "Total number of prices predicted, counting each batch row"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter!(
                "pricer_prediction_errors_total",
                "Total number of failed prediction requests"
            )
            .expect("Failed to register prediction_errors_total"),

            model_loads_total: register_int_counter!(
                "pricer_model_loads_total",
                "Total number of model artifact load attempts"
            )
            .expect("Failed to register model_loads_total"),

            rows_rejected_total: register_int_counter!(
                "pricer_rows_rejected_total",
                "Total number of batch rows excluded by validation"
            )
            .expect("Failed to register rows_rejected_total"),
        }
    }
}

/// Serving metrics handle for Prometheus exposition.
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ServingMetrics {
    _private: (),
}

impl Default for ServingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServingMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServingMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServingMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner().inference_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, count: u64) {
        self.inner().predictions_total.inc_by(count);
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    pub fn inc_model_loads(&self) {
        self.inner().model_loads_total.inc();
    }

    pub fn inc_rows_rejected(&self, count: u64) {
        self.inner().rows_rejected_total.inc_by(count);
    }
}
