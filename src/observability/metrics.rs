//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_requests_total` (counter): requests by method, status
//! - `gatekeeper_request_duration_seconds` (histogram): latency distribution
//! - `gatekeeper_rate_limited_total` (counter): requests rejected with 429
//! - `gatekeeper_auth_failures_total` (counter): rejected tokens by reason
//! - `gatekeeper_rate_buckets` (gauge): identities currently tracked
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, duration: Duration) {
    counter!(
        "gatekeeper_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gatekeeper_request_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("gatekeeper_rate_limited_total").increment(1);
}

pub fn record_auth_failure(reason: &'static str) {
    counter!("gatekeeper_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_tracked_identities(count: usize) {
    gauge!("gatekeeper_rate_buckets").set(count as f64);
}
