//! Prometheus metrics for the HTTP server.
//!
//! Every `MetricsRegistry` owns its own recorder rather than installing a
//! global one, so several servers (and tests) can live in one process.
//! Request latency is exported as a histogram with fixed buckets.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram, with_local_recorder};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use tracing::warn;

pub const REQUESTS_TOTAL: &str = "euclids_window_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "euclids_window_request_duration_seconds";
pub const ACTIVE_REQUESTS: &str = "euclids_window_active_requests";

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0];

#[derive(Clone)]
pub struct MetricsRegistry {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION_SECONDS.to_string()), LATENCY_BUCKETS)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Invalid latency buckets, exporting a summary instead");
                PrometheusBuilder::new()
            });
        let recorder = builder.build_recorder();
        let handle = recorder.handle();
        Self { recorder: Arc::new(recorder), handle }
    }

    /// Count one finished request and record its latency.
    pub fn record_request(&self, method: &str, endpoint: &str, status: u16, elapsed: Duration) {
        let (method, endpoint) = (method.to_string(), endpoint.to_string());
        with_local_recorder(self.recorder.as_ref(), || {
            counter!(
                REQUESTS_TOTAL,
                "method" => method.clone(),
                "endpoint" => endpoint.clone(),
                "status" => status.to_string()
            )
            .increment(1);
            histogram!(REQUEST_DURATION_SECONDS, "method" => method, "endpoint" => endpoint)
                .record(elapsed.as_secs_f64());
        });
    }

    /// Mark a request as in flight until the returned guard is dropped.
    pub fn track_active(&self) -> ActiveRequest {
        self.add_active(1.0);
        ActiveRequest { registry: self.clone() }
    }

    fn add_active(&self, delta: f64) {
        with_local_recorder(self.recorder.as_ref(), || {
            let active = gauge!(ACTIVE_REQUESTS);
            if delta >= 0.0 {
                active.increment(delta);
            } else {
                active.decrement(-delta);
            }
        });
    }

    /// Text exposition format, as served on `/metrics`.
    pub fn render_prometheus(&self) -> String {
        self.handle.render()
    }

    /// Drain histogram buckets on an interval so memory stays flat even when
    /// nobody scrapes `/metrics`. Needs a running tokio runtime.
    pub fn spawn_upkeep(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                handle.run_upkeep();
            }
        })
    }
}

/// In-flight marker; decrements the active-requests gauge on drop, including
/// when the request future is cancelled.
pub struct ActiveRequest {
    registry: MetricsRegistry,
}

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        self.registry.add_active(-1.0);
    }
}
