//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the Pila server:
//! - HTTP request metrics (latency, counts, errors)
//! - Authentication failures
//! - Tickets by `(step, status)` (collected dynamically)
//!
//! Queue engine counters live in `pila_core::metrics` and are registered here.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

use pila_core::TicketState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pila_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pila_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pila_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pila_auth_failures_total", "Total authentication failures"),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Ticket Metrics
// =============================================================================

/// Tickets by current state (collected dynamically).
pub static TICKETS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("pila_tickets_by_state", "Current ticket count by step and status"),
        &["step", "status"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Tickets
    registry
        .register(Box::new(TICKETS_BY_STATE.clone()))
        .unwrap();

    // Queue engine
    for metric in pila_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh gauges from current queue state.
///
/// Called before encoding so every state is reported, including empty ones.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    match state.queue().stats() {
        Ok(stats) => {
            for ticket_state in TicketState::ALL {
                let step = ticket_state.step();
                let status = ticket_state.status();
                TICKETS_BY_STATE
                    .with_label_values(&[step.to_string().as_str(), status.as_str()])
                    .set(stats.count(step, status));
            }
        }
        Err(e) => tracing::warn!("Failed to collect ticket counts: {}", e),
    }
}

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace ticket ids with a placeholder).
pub fn normalize_path(path: &str) -> String {
    // Applied twice: adjacent numeric segments share a slash.
    let once = NUMERIC_SEGMENT.replace_all(path, "/{id}$1");
    NUMERIC_SEGMENT.replace_all(&once, "/{id}$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_ticket_id() {
        assert_eq!(normalize_path("/api/v1/tickets/12345"), "/api/v1/tickets/{id}");
    }

    #[test]
    fn test_normalize_path_numeric_middle() {
        assert_eq!(
            normalize_path("/api/v1/tickets/12/history/3"),
            "/api/v1/tickets/{id}/history/{id}"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/teller/no-show"), "/api/v1/teller/no-show");
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("pila_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_queue_metrics() {
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        TICKETS_BY_STATE.with_label_values(&["1", "waiting"]).set(0);
        pila_core::metrics::CLAIM_CONFLICTS.inc_by(0);
        pila_core::metrics::TICKETS_ISSUED
            .with_label_values(&["regular"])
            .inc_by(0);

        let output = encode_metrics();
        assert!(output.contains("pila_http_requests_in_flight"));
        assert!(output.contains("pila_tickets_by_state"));
        assert!(output.contains("pila_claim_conflicts_total"));
        assert!(output.contains("pila_tickets_issued_total"));
    }
}
