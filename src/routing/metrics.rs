//! Prometheus metrics for the routing core.
//!
//! Metrics cover:
//! - Cache performance (hits, misses, errors per collection)
//! - Invalidations issued by the coherence manager
//! - Query routing (pinned vs fan-out)
//! - Health probes (successes, failures, per-shard status)
//! - Read/write latency on the request path
//!
//! # Safety
//!
//! All metrics are registered to a custom registry with the "shardroute"
//! prefix to avoid name collisions with other libraries using the default
//! Prometheus registry. Registration errors are handled gracefully — if a
//! metric fails to register, an unregistered fallback is used instead of
//! panicking.

use once_cell::sync::Lazy;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Registry, TextEncoder,
};
use tracing::warn;

/// Custom Prometheus registry for shardroute metrics.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    Registry::new_custom(Some("shardroute".to_string()), None).unwrap_or_else(|_| Registry::new())
});

/// Declare an IntCounterVec metric with labels.
macro_rules! define_counter_vec {
    ($name:ident, $metric_name:expr, $help:expr, [$($label:expr),+ $(,)?]) => {
        #[doc = $help]
        pub static $name: Lazy<IntCounterVec> = Lazy::new(|| {
            register_int_counter_vec_safe(&REGISTRY, $metric_name, $help, &[$($label),+])
        });
    };
}

/// Declare an IntGaugeVec metric with labels.
macro_rules! define_gauge_vec {
    ($name:ident, $metric_name:expr, $help:expr, [$($label:expr),+ $(,)?]) => {
        #[doc = $help]
        pub static $name: Lazy<IntGaugeVec> = Lazy::new(|| {
            register_int_gauge_vec_safe(&REGISTRY, $metric_name, $help, &[$($label),+])
        });
    };
}

/// Declare a HistogramVec metric with labels and buckets.
macro_rules! define_histogram_vec {
    ($name:ident, $metric_name:expr, $help:expr, [$($label:expr),+ $(,)?], [$($bucket:expr),+ $(,)?]) => {
        #[doc = $help]
        pub static $name: Lazy<HistogramVec> = Lazy::new(|| {
            register_histogram_vec_safe(
                &REGISTRY,
                $metric_name,
                $help,
                &[$($label),+],
                vec![$($bucket),+],
            )
        });
    };
}

// =============================================================================
// Cache Metrics
// =============================================================================

define_counter_vec!(
    CACHE_HITS,
    "cache_hits_total",
    "Cache-aside read hits",
    ["collection"]
);

define_counter_vec!(
    CACHE_MISSES,
    "cache_misses_total",
    "Cache-aside read misses",
    ["collection"]
);

define_counter_vec!(
    CACHE_ERRORS,
    "cache_errors_total",
    "Cache operations that failed and degraded to the store",
    ["operation"]
);

define_counter_vec!(
    CACHE_INVALIDATIONS,
    "cache_invalidations_total",
    "Partition-scoped invalidations issued after writes",
    ["collection"]
);

// =============================================================================
// Routing Metrics
// =============================================================================

define_counter_vec!(
    QUERY_ROUTES,
    "query_routes_total",
    "Queries resolved to shards, labeled pinned or fanout",
    ["collection", "route"]
);

// =============================================================================
// Health Metrics
// =============================================================================

define_counter_vec!(
    PROBES,
    "health_probes_total",
    "Health probes by outcome",
    ["outcome"]
);

define_gauge_vec!(
    SHARD_STATUS,
    "shard_status",
    "Shard status (0=unknown, 1=active, 2=degraded, 3=unreachable)",
    ["shard"]
);

define_gauge_vec!(
    SHARD_DOCUMENT_ESTIMATE,
    "shard_document_estimate",
    "Best-effort document count per shard",
    ["shard"]
);

// =============================================================================
// Latency Metrics
// =============================================================================

define_histogram_vec!(
    READ_DURATION_SECONDS,
    "read_duration_seconds",
    "Coherent read latency, labeled by cache outcome",
    ["collection", "outcome"],
    [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
);

define_histogram_vec!(
    WRITE_DURATION_SECONDS,
    "write_duration_seconds",
    "Write plus invalidation latency",
    ["collection"],
    [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
);

// =============================================================================
// Safe Registration Helpers
// =============================================================================
//
// Registration failures (duplicate names, invalid help strings) degrade to
// unregistered metrics instead of panicking at first use.

fn register_int_counter_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> IntCounterVec {
    let counter = IntCounterVec::new(prometheus::opts!(name, help), labels)
        .expect("metric name/help should be valid");
    match registry.register(Box::new(counter.clone())) {
        Ok(()) => counter,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntCounterVec metric, using unregistered fallback");
            counter
        }
    }
}

fn register_int_gauge_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> IntGaugeVec {
    let gauge = IntGaugeVec::new(prometheus::opts!(name, help), labels)
        .expect("metric name/help should be valid");
    match registry.register(Box::new(gauge.clone())) {
        Ok(()) => gauge,
        Err(e) => {
            warn!(name, error = %e, "Failed to register IntGaugeVec metric, using unregistered fallback");
            gauge
        }
    }
}

fn register_histogram_vec_safe(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
    buckets: Vec<f64>,
) -> HistogramVec {
    let histogram = HistogramVec::new(HistogramOpts::new(name, help).buckets(buckets), labels)
        .expect("metric name/help should be valid");
    match registry.register(Box::new(histogram.clone())) {
        Ok(()) => histogram,
        Err(e) => {
            warn!(name, error = %e, "Failed to register HistogramVec metric, using unregistered fallback");
            histogram
        }
    }
}

/// Gather all registered metric families.
pub fn gather_metrics() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

/// Render all registered metrics in the Prometheus text format.
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&REGISTRY.gather())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_gather() {
        CACHE_HITS.with_label_values(&["users"]).inc();
        CACHE_MISSES.with_label_values(&["users"]).inc();
        SHARD_STATUS.with_label_values(&["0"]).set(1);

        let families = gather_metrics();
        assert!(!families.is_empty());

        let rendered = render_metrics();
        assert!(rendered.contains("shardroute_cache_hits_total"));
    }
}
