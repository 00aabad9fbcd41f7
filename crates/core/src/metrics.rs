//! Prometheus metrics for the queue engine.
//!
//! This module provides metrics for:
//! - Ticket issuing, by lane
//! - Teller actions (claims, completions, no-shows, overrides)
//! - Queue pulls and claim races
//! - Wait and service durations
//! - Audit writer throughput

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Tickets
// =============================================================================

/// Tickets issued total by lane.
pub static TICKETS_ISSUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pila_tickets_issued_total", "Total tickets issued"),
        &["lane"], // "priority", "regular"
    )
    .unwrap()
});

/// State transitions applied, by step the ticket was at and event.
pub static TICKET_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pila_ticket_transitions_total",
            "Total ticket state transitions",
        ),
        &["step", "event"], // event: "claim", "complete", "no_show", "override"
    )
    .unwrap()
});

// =============================================================================
// Queue selection
// =============================================================================

/// Grab requests by result.
pub static GRAB_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pila_grab_results_total", "Total grab-next requests"),
        &["step", "result"], // "claimed", "empty", "conflict"
    )
    .unwrap()
});

/// Claims lost to another teller.
pub static CLAIM_CONFLICTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pila_claim_conflicts_total",
        "Total claims lost to a concurrent teller",
    )
    .unwrap()
});

// =============================================================================
// Durations
// =============================================================================

/// Time a ticket spent in service at a step.
pub static SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pila_service_duration_seconds",
            "Time between a teller claiming a ticket and finishing the step",
        )
        .buckets(vec![
            30.0, 60.0, 120.0, 300.0, 600.0, 900.0, 1800.0, 3600.0,
        ]),
        &["step"],
    )
    .unwrap()
});

/// Time a ticket waited before being claimed at a step.
pub static WAIT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pila_wait_duration_seconds",
            "Time a ticket waited before being claimed",
        )
        .buckets(vec![
            60.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0, 7200.0, 14400.0,
        ]),
        &["step"],
    )
    .unwrap()
});

// =============================================================================
// Audit
// =============================================================================

/// Audit events handled by the background writer.
pub static AUDIT_EVENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pila_audit_events_total", "Audit events handled by the writer"),
        &["result"], // "written", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TICKETS_ISSUED.clone()),
        Box::new(TICKET_TRANSITIONS.clone()),
        Box::new(GRAB_RESULTS.clone()),
        Box::new(CLAIM_CONFLICTS.clone()),
        Box::new(SERVICE_DURATION.clone()),
        Box::new(WAIT_DURATION.clone()),
        Box::new(AUDIT_EVENTS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        TICKETS_ISSUED.with_label_values(&["regular"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "pila_tickets_issued_total"));
    }
}
