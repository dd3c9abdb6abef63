//! Partition-to-shard mapping and query routing.
//!
//! A partition maps to exactly one shard via `partition_index % shard_count`,
//! a pure function of the partition index. Query routing is conservative by
//! design: a query that pins the collection's partition key by equality is
//! sent to the single owning shard, and anything else fans out to every
//! shard. Querying extra shards is a performance cost; skipping a shard
//! that might hold matching data is a correctness bug.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::routing::config::RoutingConfig;
use crate::routing::documents::Collection;
use crate::routing::error::{RoutingError, RoutingResult};
use crate::routing::partition::Partition;
use crate::routing::strategy::PartitionStrategy;

/// A query shape, as far as routing is concerned.
///
/// Routing only needs to know which fields are constrained by equality and
/// whether any other constraints exist; the store driver executes the
/// actual query.
#[derive(Debug, Clone, Default)]
pub struct Query {
    equality: BTreeMap<String, Value>,
    /// Fields constrained by something other than equality (ranges,
    /// existence checks). These never pin a partition.
    non_equality_fields: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality constraint.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equality.insert(field.into(), value.into());
        self
    }

    /// Add a non-equality constraint (range, existence, regex). Only the
    /// field name matters for routing.
    pub fn constraint(mut self, field: impl Into<String>) -> Self {
        self.non_equality_fields.push(field.into());
        self
    }

    /// The equality value for a field, if the field is pinned and the
    /// value is a string.
    pub fn equality_str(&self, field: &str) -> Option<&str> {
        self.equality.get(field).and_then(Value::as_str)
    }

    /// All equality constraints, for the store driver.
    pub fn equality(&self) -> &BTreeMap<String, Value> {
        &self.equality
    }
}

/// Maps partitions to shards and resolves the shard set for a query.
///
/// Pure functions plus static configuration; no mutable state.
#[derive(Debug, Clone)]
pub struct ShardRouter {
    shard_count: u32,
    strategy: PartitionStrategy,
}

impl ShardRouter {
    /// Build a router from validated configuration.
    pub fn new(config: &RoutingConfig) -> RoutingResult<Self> {
        if config.shard_count == 0 {
            return Err(RoutingError::Config("shard_count must be positive".into()));
        }
        Ok(Self {
            shard_count: config.shard_count,
            strategy: PartitionStrategy::new(config)?,
        })
    }

    /// The configured shard count.
    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// The shard owning a partition: `partition.index % shard_count`.
    pub fn shard_for(&self, partition: &Partition) -> u32 {
        partition.index % self.shard_count
    }

    /// Every shard index, in order. Used for fan-out and by the health
    /// monitor's probe loop.
    pub fn all_shards(&self) -> Vec<u32> {
        (0..self.shard_count).collect()
    }

    /// Resolve which shard(s) must be consulted for a query.
    ///
    /// Returns a single shard when the query pins the collection's
    /// partition key by equality; otherwise every shard. When message
    /// time buckets are enabled, a recipient equality alone no longer
    /// pins a partition — the query must also pin `sent_bucket`
    /// (year-month, e.g. `2026-08`) to stay on one shard.
    pub fn shards_for_query(&self, collection: &Collection, query: &Query) -> Vec<u32> {
        let key_field = PartitionStrategy::key_field(collection);
        let Some(key_value) = query.equality_str(key_field) else {
            return self.all_shards();
        };

        let partition_key =
            if matches!(collection, Collection::Messages) && self.strategy.message_time_buckets() {
                match query.equality_str("sent_bucket") {
                    Some(bucket) => format!("{}:{}", key_value, bucket),
                    // Bucketed keys span many partitions for one recipient.
                    None => return self.all_shards(),
                }
            } else {
                key_value.to_string()
            };

        let partition = self
            .strategy
            .partition_for_key(collection.clone(), &partition_key);
        vec![self.shard_for(&partition)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(buckets: bool) -> ShardRouter {
        ShardRouter::new(&RoutingConfig {
            message_time_buckets: buckets,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_shard_for_is_modulo() {
        let router = router(false);
        for index in 0..10 {
            let partition = Partition {
                collection: Collection::Users,
                index,
            };
            assert_eq!(router.shard_for(&partition), index % 3);
        }
    }

    #[test]
    fn test_shard_mapping_stable_across_instances() {
        let a = router(false);
        let b = router(false);
        let partition = Partition {
            collection: Collection::Messages,
            index: 7,
        };
        assert_eq!(a.shard_for(&partition), b.shard_for(&partition));
        assert_eq!(a.shard_for(&partition), 1);
    }

    #[test]
    fn test_pinned_query_routes_to_single_shard() {
        let router = router(false);
        let query = Query::new().eq("to", "u123");
        let shards = router.shards_for_query(&Collection::Messages, &query);
        assert_eq!(shards.len(), 1);
    }

    #[test]
    fn test_unpinned_query_fans_out() {
        let router = router(false);
        let query = Query::new().constraint("sent_at");
        let shards = router.shards_for_query(&Collection::Messages, &query);
        assert_eq!(shards, vec![0, 1, 2]);
    }

    #[test]
    fn test_equality_on_non_key_field_fans_out() {
        let router = router(false);
        let query = Query::new().eq("from", "u999");
        let shards = router.shards_for_query(&Collection::Messages, &query);
        assert_eq!(shards, vec![0, 1, 2]);
    }

    #[test]
    fn test_bucketed_recipient_query_fans_out_without_bucket() {
        let router = router(true);
        let query = Query::new().eq("to", "u123");
        assert_eq!(
            router.shards_for_query(&Collection::Messages, &query),
            vec![0, 1, 2]
        );

        let pinned = Query::new().eq("to", "u123").eq("sent_bucket", "2026-08");
        assert_eq!(
            router
                .shards_for_query(&Collection::Messages, &pinned)
                .len(),
            1
        );
    }
}
