//! HTTP request instruments

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;
use std::time::Duration;

/// Request counter and latency histogram, following the HTTP semantic
/// conventions for attribute names.
#[derive(Clone)]
pub struct RequestMetrics {
    requests: Counter<u64>,
    duration: Histogram<f64>,
}

impl RequestMetrics {
    pub fn new(meter: &Meter) -> Self {
        let requests = meter
            .u64_counter("http.server.requests")
            .with_description("Number of HTTP requests handled")
            .build();

        let duration = meter
            .f64_histogram("http.server.request.duration")
            .with_description("Duration of HTTP requests")
            .with_unit("s")
            .build();

        Self { requests, duration }
    }

    /// Record one handled request
    pub fn record(&self, method: &str, route: &str, status: u16, elapsed: Duration) {
        let attributes = [
            KeyValue::new("http.request.method", method.to_string()),
            KeyValue::new("http.route", route.to_string()),
            KeyValue::new("http.response.status_code", i64::from(status)),
        ];
        self.requests.add(1, &attributes);
        self.duration.record(elapsed.as_secs_f64(), &attributes);
    }
}
