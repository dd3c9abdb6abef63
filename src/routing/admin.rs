//! Read-only operator surface.
//!
//! Everything here is backed by the monitor's cached snapshot and the
//! metrics registry; nothing triggers a synchronous probe or touches the
//! request path. Consuming services expose these over whatever transport
//! they already serve (HTTP handlers, admin RPCs).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SNAPSHOT_STALE_AFTER_MS;
use crate::routing::documents::Collection;
use crate::routing::health::{ShardHealthMonitor, ShardStatus};
use crate::routing::metrics;
use crate::routing::shard::{Query, ShardRouter};
use crate::routing::traits::ReplicaMember;

/// One shard's health as reported to operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardHealthSummary {
    pub shard_index: u32,
    pub status: ShardStatus,
    pub members: Vec<ReplicaMember>,
    pub healthy_members: usize,
    pub document_count_estimate: Option<u64>,
    pub last_checked: DateTime<Utc>,
    /// True when the record is older than the staleness threshold,
    /// usually meaning the monitor is not running.
    pub stale: bool,
}

/// Read-only status and routing-resolution API.
pub struct AdminApi {
    monitor: Arc<ShardHealthMonitor>,
    router: ShardRouter,
}

impl AdminApi {
    pub fn new(monitor: Arc<ShardHealthMonitor>, router: ShardRouter) -> Self {
        Self { monitor, router }
    }

    /// List every shard with its latest health record.
    pub fn list_shards(&self) -> Vec<ShardHealthSummary> {
        self.monitor
            .snapshot()
            .into_iter()
            .map(summarize)
            .collect()
    }

    /// Health for one shard, or every shard when `shard` is `None`.
    pub fn shard_health(&self, shard: Option<u32>) -> Vec<ShardHealthSummary> {
        match shard {
            Some(index) => self
                .monitor
                .shard_health(index)
                .map(summarize)
                .into_iter()
                .collect(),
            None => self.list_shards(),
        }
    }

    /// Resolve which shard(s) would serve a query, without executing it.
    pub fn resolve_shards(&self, collection: &Collection, query: &Query) -> Vec<u32> {
        let shards = self.router.shards_for_query(collection, query);
        let route = if shards.len() == 1 { "pinned" } else { "fanout" };
        metrics::QUERY_ROUTES
            .with_label_values(&[collection.name(), route])
            .inc();
        shards
    }

    /// Render the Prometheus metrics for scraping.
    pub fn metrics_text(&self) -> String {
        metrics::render_metrics()
    }
}

fn summarize(record: crate::routing::health::ShardHealthRecord) -> ShardHealthSummary {
    let age_ms = Utc::now()
        .signed_duration_since(record.last_checked)
        .num_milliseconds();
    ShardHealthSummary {
        shard_index: record.shard_index,
        status: record.status,
        healthy_members: record.members.iter().filter(|m| m.healthy).count(),
        members: record.members,
        document_count_estimate: record.document_count_estimate,
        last_checked: record.last_checked,
        stale: age_ms > SNAPSHOT_STALE_AFTER_MS as i64,
    }
}
