//! Prometheus metrics for the hlx client.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means a duplicate
//! metric name, which is a programming error caught on first use.

use hlx_transport::{Endpoint, RequestObserver, RequestOutcome};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::time::Duration;

use crate::error::TelemetryResult;

/// Requests sent, by endpoint and how they ended.
pub static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hlx_requests_total",
        "Total requests sent to the exchange API",
        &["endpoint", "outcome"]
    )
    .unwrap()
});

/// Request round-trip latency in milliseconds.
pub static REQUEST_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "hlx_request_latency_ms",
        "Request round-trip latency in milliseconds",
        &["endpoint"],
        vec![10.0, 25.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Exchange actions, by action type and result label.
pub static ACTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "hlx_actions_total",
        "Total exchange actions by result",
        &["action", "result"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn request(endpoint: &str, outcome: &str, latency_ms: f64) {
        REQUESTS_TOTAL.with_label_values(&[endpoint, outcome]).inc();
        REQUEST_LATENCY_MS
            .with_label_values(&[endpoint])
            .observe(latency_ms);
    }

    pub fn action(action: &str, result: &str) {
        ACTIONS_TOTAL.with_label_values(&[action, result]).inc();
    }

    /// Everything in the default registry, in text exposition format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Feeds transport and gateway events into the collectors above.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusObserver;

impl RequestObserver for PrometheusObserver {
    fn observe(&self, endpoint: Endpoint, outcome: RequestOutcome, latency: Duration) {
        Metrics::request(
            endpoint.as_str(),
            outcome.as_str(),
            latency.as_secs_f64() * 1000.0,
        );
    }

    fn observe_action(&self, action: &'static str, result: &'static str) {
        Metrics::action(action, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_counts_requests() {
        let observer = PrometheusObserver;
        let before = REQUESTS_TOTAL.with_label_values(&["info", "timeout"]).get();
        observer.observe(
            Endpoint::Info,
            RequestOutcome::Timeout,
            Duration::from_millis(12),
        );
        assert_eq!(
            REQUESTS_TOTAL.with_label_values(&["info", "timeout"]).get(),
            before + 1
        );
    }

    #[test]
    fn test_observer_counts_actions() {
        let observer = PrometheusObserver;
        let before = ACTIONS_TOTAL.with_label_values(&["order", "rejected"]).get();
        observer.observe_action("order", "rejected");
        assert_eq!(
            ACTIONS_TOTAL.with_label_values(&["order", "rejected"]).get(),
            before + 1
        );
    }

    #[test]
    fn test_render_includes_collectors() {
        Metrics::action("cancel", "ok");
        let text = Metrics::render().unwrap();
        assert!(text.contains("hlx_actions_total"));
    }
}
