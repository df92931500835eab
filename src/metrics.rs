//! Observability metrics for replica administration
//!
//! Prometheus-compatible metrics covering:
//! - Unload RPC dispatch and failures
//! - Replica deletion outcomes
//! - Forced metadata repairs
//! - Convergence wait durations

use std::time::Duration;

/// Record an unload request dispatched to a node
pub fn record_unload_request(node: &str) {
    metrics::counter!(
        "shoal_unload_requests_total",
        "node" => node.to_string(),
    )
    .increment(1);
}

/// Record an unload request that failed or timed out
pub fn record_unload_failure(node: &str, error_type: &str) {
    metrics::counter!(
        "shoal_unload_failures_total",
        "node" => node.to_string(),
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

/// Record a replica deletion reaching a terminal state
pub fn record_replica_deletion(collection: &str, outcome: &str) {
    metrics::counter!(
        "shoal_replica_deletions_total",
        "collection" => collection.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

/// Record a forced removal of a replica's metadata entry
pub fn record_forced_repair(collection: &str) {
    metrics::counter!(
        "shoal_forced_repairs_total",
        "collection" => collection.to_string(),
    )
    .increment(1);
}

/// Record how long a convergence wait took and how it ended
pub fn record_convergence_wait(outcome: &str, duration: Duration) {
    metrics::histogram!(
        "shoal_convergence_wait_seconds",
        "outcome" => outcome.to_string(),
    )
    .record(duration.as_secs_f64());
}
