use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the scoring series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scores_computed_total", "Scores computed, by mode.");
        describe_counter!(
            "calibration_fallback_total",
            "Adaptive scores that used the fallback curve constants."
        );
        describe_counter!(
            "calibration_record_failures_total",
            "Raw magnitudes that could not be persisted."
        );
        describe_counter!(
            "weights_fallback_total",
            "Scoring calls that fell back to the built-in weight vector."
        );
        describe_counter!("ideas_rejected_total", "Ideas rejected by intake validation.");
        describe_counter!(
            "extraction_failures_total",
            "Ideas for which the model returned no usable parameters."
        );
        describe_histogram!("score_raw_magnitude", "Raw pre-sigmoid magnitudes.");
    });
}
