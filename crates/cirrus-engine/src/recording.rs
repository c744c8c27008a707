// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without a recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

use cirrus_core::{ReplaceOutcome, ServiceKind, TriggerKind};

/// Register all Cirrus metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "cirrus_triples_total",
        "Triples collected, by service and outcome"
    );
    describe_counter!(
        "cirrus_resources_written_total",
        "Resource records written to the inventory store"
    );
    describe_counter!(
        "cirrus_resources_removed_total",
        "Resource records removed by reconciliation"
    );
    describe_histogram!(
        "cirrus_run_duration_seconds",
        "Wall-clock duration of an orchestration run"
    );
    describe_gauge!("cirrus_triples_in_flight", "Triples currently claimed by a run");
    describe_counter!(
        "cirrus_assume_role_total",
        "Role assumptions, by outcome"
    );
}

/// Record the outcome of one triple (`success`, or a failure kind).
pub fn record_triple(service: ServiceKind, outcome: &str) {
    metrics::counter!(
        "cirrus_triples_total",
        "service" => service.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record what one reconciling write did.
pub fn record_replace(service: ServiceKind, outcome: ReplaceOutcome) {
    metrics::counter!("cirrus_resources_written_total", "service" => service.to_string())
        .increment(outcome.written as u64);
    metrics::counter!("cirrus_resources_removed_total", "service" => service.to_string())
        .increment(outcome.removed as u64);
}

pub fn record_run_duration(trigger: TriggerKind, seconds: f64) {
    metrics::histogram!("cirrus_run_duration_seconds", "trigger" => trigger.to_string())
        .record(seconds);
}

pub fn set_in_flight(count: usize) {
    metrics::gauge!("cirrus_triples_in_flight").set(count as f64);
}
