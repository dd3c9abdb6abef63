//! Background shard health monitoring.
//!
//! The monitor probes each shard's replica set on a fixed interval and
//! publishes the results to an in-process snapshot. Request-path code
//! reads the snapshot through non-blocking accessors and never awaits a
//! probe: a slow or hung probe must not add latency to foreground reads
//! or writes.
//!
//! # Status Machine
//!
//! Per shard: `unknown → active ⇄ degraded → unreachable`, driven purely
//! by the latest probe result. There is no manual override and no
//! hysteresis beyond "last probe wins" — simple and auditable, at the
//! cost of being noisy under flapping.
//!
//! - `active`: primary reachable and at least one healthy secondary
//! - `degraded`: primary reachable, no healthy secondary
//! - `unreachable`: primary not reachable, or the probe itself failed
//!
//! A failed probe marks the shard `unreachable` rather than leaving the
//! last known-good state in place, to avoid masking real outages. A probe
//! failure for one shard never affects the records of other shards and
//! never stops the next scheduled cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::routing::background::TaskRegistry;
use crate::routing::config::RoutingConfig;
use crate::routing::error::{RoutingError, RoutingResult};
use crate::routing::metrics;
use crate::routing::traits::{DocumentStore, ReplicaMember};

/// Health status of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardStatus {
    /// Not yet probed.
    Unknown,
    /// Primary reachable and at least one healthy secondary.
    Active,
    /// Primary reachable but no healthy secondary.
    Degraded,
    /// Primary not reachable, or the probe failed.
    Unreachable,
}

impl ShardStatus {
    /// Numeric value for the status gauge.
    fn as_gauge_value(&self) -> i64 {
        match self {
            ShardStatus::Unknown => 0,
            ShardStatus::Active => 1,
            ShardStatus::Degraded => 2,
            ShardStatus::Unreachable => 3,
        }
    }
}

impl std::fmt::Display for ShardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShardStatus::Unknown => write!(f, "unknown"),
            ShardStatus::Active => write!(f, "active"),
            ShardStatus::Degraded => write!(f, "degraded"),
            ShardStatus::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Snapshot of one shard's health.
///
/// Created and refreshed by the monitor; read-only everywhere else.
/// Expires implicitly by being overwritten on the next probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardHealthRecord {
    pub shard_index: u32,
    pub status: ShardStatus,
    pub members: Vec<ReplicaMember>,
    /// Best-effort document count; observability only, may be stale.
    pub document_count_estimate: Option<u64>,
    pub last_checked: DateTime<Utc>,
}

impl ShardHealthRecord {
    fn unknown(shard_index: u32) -> Self {
        Self {
            shard_index,
            status: ShardStatus::Unknown,
            members: Vec::new(),
            document_count_estimate: None,
            last_checked: Utc::now(),
        }
    }
}

/// Add +/- 15% pseudo-random jitter to a probe interval.
///
/// Prevents every process in the fleet from probing the store at exactly
/// the same moment after a synchronized deploy or restart.
fn with_jitter(base: Duration) -> Duration {
    let jitter_factor = 0.85 + fastrand::f64() * 0.30;
    Duration::from_secs_f64(base.as_secs_f64() * jitter_factor)
}

/// Periodic background monitor for shard and replica health.
///
/// Owns the only long-lived mutable state in the routing core (the latest
/// health snapshot) and is its sole writer.
pub struct ShardHealthMonitor {
    store: Arc<dyn DocumentStore>,
    shard_count: u32,
    shard_interval: Duration,
    replica_interval: Duration,
    probe_timeout: Duration,
    snapshot: Arc<DashMap<u32, ShardHealthRecord>>,
    registry: Mutex<TaskRegistry>,
}

impl ShardHealthMonitor {
    /// Create a monitor. Probing does not begin until [`start`] is called.
    ///
    /// [`start`]: ShardHealthMonitor::start
    pub fn new(store: Arc<dyn DocumentStore>, config: &RoutingConfig) -> Self {
        let snapshot = Arc::new(DashMap::new());
        for shard in 0..config.shard_count {
            snapshot.insert(shard, ShardHealthRecord::unknown(shard));
        }
        Self {
            store,
            shard_count: config.shard_count,
            shard_interval: config.shard_monitor_interval,
            replica_interval: config.replica_monitor_interval,
            probe_timeout: config.probe_timeout,
            snapshot,
            registry: Mutex::new(TaskRegistry::new()),
        }
    }

    /// Start the probe loops.
    ///
    /// Two periodic tasks are spawned: a replica-set-level loop (status
    /// classification) and a slower shard-level loop (document count
    /// estimates). Both are cancellable via [`shutdown`].
    ///
    /// [`shutdown`]: ShardHealthMonitor::shutdown
    pub async fn start(self: &Arc<Self>) {
        let mut registry = self.registry.lock().await;

        let monitor = Arc::clone(self);
        registry.spawn_periodic(
            "replica_probe",
            with_jitter(self.replica_interval),
            move || {
                let monitor = Arc::clone(&monitor);
                async move {
                    monitor.probe_all_replica_sets().await;
                }
            },
        );

        let monitor = Arc::clone(self);
        registry.spawn_periodic("shard_probe", with_jitter(self.shard_interval), move || {
            let monitor = Arc::clone(&monitor);
            async move {
                monitor.refresh_all_document_estimates().await;
            }
        });
    }

    /// Stop the probe loops and wait for them to exit.
    pub async fn shutdown(&self) {
        self.registry.lock().await.shutdown_all().await;
    }

    /// Whether the probe loops are running.
    pub async fn is_running(&self) -> bool {
        let registry = self.registry.lock().await;
        !registry.health_check().is_empty() && registry.all_running()
    }

    /// The latest health snapshot, ordered by shard index.
    ///
    /// Non-blocking: returns whatever the last probe cycle published.
    /// Shards not yet probed report [`ShardStatus::Unknown`].
    pub fn snapshot(&self) -> Vec<ShardHealthRecord> {
        let mut records: Vec<ShardHealthRecord> = self
            .snapshot
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.shard_index);
        records
    }

    /// The latest record for one shard, if the index is valid.
    pub fn shard_health(&self, shard: u32) -> Option<ShardHealthRecord> {
        self.snapshot.get(&shard).map(|entry| entry.value().clone())
    }

    /// Probe one shard now and publish the result.
    ///
    /// This is the probe the background loop runs; it is public so
    /// operators and tests can force a refresh. Request-path code should
    /// read [`snapshot`] instead.
    ///
    /// [`snapshot`]: ShardHealthMonitor::snapshot
    pub async fn check_health(&self, shard: u32) -> RoutingResult<ShardHealthRecord> {
        if shard >= self.shard_count {
            return Err(RoutingError::UnknownShard(shard));
        }
        let record = self.probe_replica_set(shard).await;
        Ok(record)
    }

    /// Probe every shard's replica set. One shard's failure never blocks
    /// or corrupts the others.
    async fn probe_all_replica_sets(&self) {
        for shard in 0..self.shard_count {
            self.probe_replica_set(shard).await;
        }
    }

    async fn probe_replica_set(&self, shard: u32) -> ShardHealthRecord {
        let probe = tokio::time::timeout(self.probe_timeout, self.store.replica_set_status(shard));

        let (status, members) = match probe.await {
            Ok(Ok(replica_status)) => {
                let status = if !replica_status.primary_healthy() {
                    ShardStatus::Unreachable
                } else if replica_status.healthy_secondaries() >= 1 {
                    ShardStatus::Active
                } else {
                    ShardStatus::Degraded
                };
                metrics::PROBES.with_label_values(&["ok"]).inc();
                (status, replica_status.members)
            }
            Ok(Err(e)) => {
                warn!(shard, error = %e, "Replica probe failed, marking shard unreachable");
                metrics::PROBES.with_label_values(&["error"]).inc();
                (ShardStatus::Unreachable, Vec::new())
            }
            Err(_) => {
                warn!(
                    shard,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "Replica probe timed out, marking shard unreachable"
                );
                metrics::PROBES.with_label_values(&["timeout"]).inc();
                (ShardStatus::Unreachable, Vec::new())
            }
        };

        // Carry the previous document estimate forward; the slower
        // shard-level loop refreshes it.
        let document_count_estimate = self
            .snapshot
            .get(&shard)
            .and_then(|r| r.document_count_estimate);

        let record = ShardHealthRecord {
            shard_index: shard,
            status,
            members,
            document_count_estimate,
            last_checked: Utc::now(),
        };

        metrics::SHARD_STATUS
            .with_label_values(&[&shard.to_string()])
            .set(status.as_gauge_value());
        debug!(shard, %status, "Published shard health record");

        self.snapshot.insert(shard, record.clone());
        record
    }

    /// Refresh best-effort document counts. Failures are logged and the
    /// previous estimate is kept; counts are never correctness-bearing.
    async fn refresh_all_document_estimates(&self) {
        for shard in 0..self.shard_count {
            let probe =
                tokio::time::timeout(self.probe_timeout, self.store.estimated_document_count(shard));
            match probe.await {
                Ok(Ok(count)) => {
                    if let Some(mut record) = self.snapshot.get_mut(&shard) {
                        record.document_count_estimate = Some(count);
                    }
                    metrics::SHARD_DOCUMENT_ESTIMATE
                        .with_label_values(&[&shard.to_string()])
                        .set(count as i64);
                }
                Ok(Err(e)) => {
                    debug!(shard, error = %e, "Document count probe failed, keeping previous estimate");
                }
                Err(_) => {
                    debug!(shard, "Document count probe timed out, keeping previous estimate");
                }
            }
        }
    }
}
