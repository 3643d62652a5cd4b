//! Observability setup: structured logging and sharding metrics.
//!
//! The library only records through the `metrics` facade; installing an
//! exporter is left to the host process.

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber with structured logging.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shardline=debug"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

/// Record one routing decision.
/// `route_type` is one of: "standard", "table_broadcast", "database_broadcast".
pub fn record_route(route_type: &str, unit_count: usize, success: bool) {
    metrics::counter!(
        "shardline_route_total",
        "type" => route_type.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
    if success {
        metrics::histogram!("shardline_route_units", "type" => route_type.to_string())
            .record(unit_count as f64);
    }
}

/// Record a consistency-check run. `outcome` is "ok" or the name of the
/// check that rejected the rule, e.g. "binding_groups".
pub fn record_rule_check(outcome: &str) {
    metrics::counter!("shardline_rule_check_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a rule reload attempt.
pub fn record_rule_reload(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    metrics::counter!("shardline_rule_reload_total", "outcome" => outcome).increment(1);
}

/// Record the size of a freshly built topology.
pub fn record_topology_size(sharding_tables: usize, data_sources: usize) {
    metrics::gauge!("shardline_topology_sharding_tables").set(sharding_tables as f64);
    metrics::gauge!("shardline_topology_data_sources").set(data_sources as f64);
}
