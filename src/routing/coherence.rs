//! Cache-aside reads and write-scoped invalidation.
//!
//! The coherence manager is the only request-path component that performs
//! I/O, and the only component permitted to decide cache-key shape. Keys
//! are `<collection>:<partitionIndex>:<fingerprint>`, so a write to
//! partition P can delete every entry whose key encodes P without touching
//! unrelated partitions.
//!
//! # Coherence Guarantee
//!
//! After [`write`] returns successfully, any subsequent [`read`] for the
//! same collection and partition observes either the new value or a cache
//! miss — never a cached value from before the write. Invalidation runs
//! before the write is acknowledged to the caller, not asynchronously
//! after.
//!
//! # Degraded Mode
//!
//! The cache is a performance layer, never a correctness dependency.
//! Cache failures on the read path fall back to the loader with a warning
//! and no cache write; invalidation failures after a store write are
//! logged and swallowed, because the store, not the cache, is the source
//! of truth.
//!
//! [`write`]: CacheCoherenceManager::write
//! [`read`]: CacheCoherenceManager::read

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::constants::MAX_FINGERPRINT_LEN;
use crate::routing::config::RoutingConfig;
use crate::routing::documents::{Collection, Document};
use crate::routing::error::RoutingResult;
use crate::routing::metrics;
use crate::routing::partition::Partition;
use crate::routing::replication::{OperationKind, ReplicationCoordinator};
use crate::routing::shard::ShardRouter;
use crate::routing::strategy::PartitionStrategy;
use crate::routing::traits::{CacheClient, ReadOptions};

/// Data class of a cached value, selecting its TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataClass {
    /// Hot metadata: point lookups, profile records. Minutes.
    HotMetadata,
    /// List/aggregate views: inbox pages, member lists. Tens of minutes.
    ListView,
}

/// Everything a read loader needs to execute against the store.
#[derive(Debug, Clone, Copy)]
pub struct ReadContext {
    /// The shard owning the partition being read.
    pub shard: u32,
    /// Replica options decided before the operation started.
    pub options: ReadOptions,
}

/// Everything a write mutator needs to execute against the store.
#[derive(Debug, Clone, Copy)]
pub struct WriteContext {
    /// The shard owning the partition being written.
    pub shard: u32,
    /// Always the primary; the system has no way to reconcile divergent
    /// writes.
    pub options: ReadOptions,
}

/// Wraps reads and writes with partition-scoped cache coherence.
pub struct CacheCoherenceManager {
    strategy: PartitionStrategy,
    router: ShardRouter,
    replication: ReplicationCoordinator,
    cache: Arc<dyn CacheClient>,
    hot_metadata_ttl: Duration,
    list_view_ttl: Duration,
}

impl CacheCoherenceManager {
    /// Build a manager from validated configuration and an injected cache
    /// client.
    pub fn new(config: &RoutingConfig, cache: Arc<dyn CacheClient>) -> RoutingResult<Self> {
        Ok(Self {
            strategy: PartitionStrategy::new(config)?,
            router: ShardRouter::new(config)?,
            replication: ReplicationCoordinator::new(config.read_preference),
            cache,
            hot_metadata_ttl: config.hot_metadata_ttl,
            list_view_ttl: config.list_view_ttl,
        })
    }

    /// Compose the cache key for a partition and query fingerprint.
    pub fn cache_key(&self, partition: &Partition, fingerprint: &str) -> String {
        let fingerprint: String = fingerprint.chars().take(MAX_FINGERPRINT_LEN).collect();
        format!("{}:{}:{}", partition.collection, partition.index, fingerprint)
    }

    /// The invalidation prefix covering every fingerprint in a partition.
    pub fn invalidation_prefix(&self, partition: &Partition) -> String {
        format!("{}:{}:", partition.collection, partition.index)
    }

    fn ttl_for(&self, class: DataClass) -> Duration {
        match class {
            DataClass::HotMetadata => self.hot_metadata_ttl,
            DataClass::ListView => self.list_view_ttl,
        }
    }

    /// Cache-aside read.
    ///
    /// Resolves the partition for `partition_key`, checks the cache under
    /// `(collection, partition, fingerprint)`, and on a miss calls
    /// `loader` with the owning shard and the configured read preference,
    /// storing the result with the TTL for `class`.
    ///
    /// Cache failures are non-fatal: the read silently degrades to the
    /// loader with a warning, and no cache write is attempted. Loader
    /// (store) failures propagate unchanged.
    pub async fn read<T, F, Fut>(
        &self,
        collection: Collection,
        partition_key: &str,
        fingerprint: &str,
        class: DataClass,
        loader: F,
    ) -> RoutingResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(ReadContext) -> Fut,
        Fut: Future<Output = RoutingResult<T>>,
    {
        let started = Instant::now();
        let partition = self.strategy.partition_for_key(collection, partition_key);
        let key = self.cache_key(&partition, fingerprint);
        let collection_label = partition.collection.name().to_string();

        let mut cache_usable = true;
        match self.cache.get(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                Ok(decoded) => {
                    metrics::CACHE_HITS.with_label_values(&[&collection_label]).inc();
                    metrics::READ_DURATION_SECONDS
                        .with_label_values(&[&collection_label, "hit"])
                        .observe(started.elapsed().as_secs_f64());
                    return Ok(decoded);
                }
                Err(e) => {
                    // Shape drift between deploys: treat as a miss and
                    // overwrite with the freshly loaded value.
                    warn!(key = %key, error = %e, "Cached value failed to decode, reloading");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed, falling back to store");
                metrics::CACHE_ERRORS.with_label_values(&["get"]).inc();
                cache_usable = false;
            }
        }

        metrics::CACHE_MISSES.with_label_values(&[&collection_label]).inc();

        let context = ReadContext {
            shard: self.router.shard_for(&partition),
            options: ReadOptions {
                replica_target: self.replication.route_for(OperationKind::Read),
            },
        };
        let value = loader(context).await?;

        if cache_usable {
            match serde_json::to_value(&value) {
                Ok(encoded) => {
                    if let Err(e) = self.cache.set(&key, &encoded, self.ttl_for(class)).await {
                        warn!(key = %key, error = %e, "Cache populate failed");
                        metrics::CACHE_ERRORS.with_label_values(&["set"]).inc();
                    }
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Value not cacheable, skipping populate");
                }
            }
        }

        metrics::READ_DURATION_SECONDS
            .with_label_values(&[&collection_label, if cache_usable { "miss" } else { "bypass" }])
            .observe(started.elapsed().as_secs_f64());
        Ok(value)
    }

    /// Execute a write against the primary, then invalidate the written
    /// document's partition before returning.
    ///
    /// Store failures propagate to the caller without retry and without
    /// invalidation (nothing was written). Invalidation failures are
    /// logged and swallowed.
    pub async fn write<T, F, Fut>(&self, doc: &Document, mutator: F) -> RoutingResult<T>
    where
        F: FnOnce(WriteContext) -> Fut,
        Fut: Future<Output = RoutingResult<T>>,
    {
        self.write_rekeyed(doc, None, mutator).await
    }

    /// Like [`write`], for the rare case where the write changes the
    /// document's partition key: both the pre-write and post-write
    /// partitions are invalidated.
    ///
    /// [`write`]: CacheCoherenceManager::write
    pub async fn write_rekeyed<T, F, Fut>(
        &self,
        before: &Document,
        after: Option<&Document>,
        mutator: F,
    ) -> RoutingResult<T>
    where
        F: FnOnce(WriteContext) -> Fut,
        Fut: Future<Output = RoutingResult<T>>,
    {
        let started = Instant::now();
        let pre_partition = self.strategy.partition_for(before);
        let collection_label = pre_partition.collection.name().to_string();

        let context = WriteContext {
            shard: self.router.shard_for(&pre_partition),
            options: ReadOptions {
                replica_target: self.replication.route_for(OperationKind::Write),
            },
        };

        let value = mutator(context).await?;

        // Invalidate before acknowledging the write: a concurrent reader
        // must observe either the new value or a miss, never the old
        // cached value.
        self.invalidate_partition(&pre_partition).await;
        if let Some(after) = after {
            let post_partition = self.strategy.partition_for(after);
            if post_partition != pre_partition {
                self.invalidate_partition(&post_partition).await;
            }
        }

        metrics::WRITE_DURATION_SECONDS
            .with_label_values(&[&collection_label])
            .observe(started.elapsed().as_secs_f64());
        Ok(value)
    }

    /// Drop every cache entry scoped to a partition. Best-effort.
    pub async fn invalidate_partition(&self, partition: &Partition) {
        let prefix = self.invalidation_prefix(partition);
        match self.cache.delete_by_prefix(&prefix).await {
            Ok(removed) => {
                metrics::CACHE_INVALIDATIONS
                    .with_label_values(&[partition.collection.name()])
                    .inc();
                debug!(%partition, removed, "Invalidated partition cache entries");
            }
            Err(e) => {
                warn!(%partition, error = %e, "Partition invalidation failed, cache may serve stale entries until TTL");
                metrics::CACHE_ERRORS.with_label_values(&["invalidate"]).inc();
            }
        }
    }

    /// The strategy used for partition resolution.
    pub fn strategy(&self) -> &PartitionStrategy {
        &self.strategy
    }

    /// The router used for shard resolution.
    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    /// The replica-routing coordinator.
    pub fn replication(&self) -> &ReplicationCoordinator {
        &self.replication
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::memory::MemoryCache;

    fn manager() -> CacheCoherenceManager {
        CacheCoherenceManager::new(&RoutingConfig::default(), Arc::new(MemoryCache::new())).unwrap()
    }

    #[test]
    fn test_cache_key_shape() {
        let manager = manager();
        let partition = Partition {
            collection: Collection::Messages,
            index: 4,
        };
        assert_eq!(
            manager.cache_key(&partition, "inbox:page1"),
            "messages:4:inbox:page1"
        );
        assert_eq!(manager.invalidation_prefix(&partition), "messages:4:");
    }

    #[test]
    fn test_cache_key_derivable_from_invalidation_prefix() {
        // Every key must start with the prefix used for invalidation.
        let manager = manager();
        let partition = Partition {
            collection: Collection::Users,
            index: 9,
        };
        let key = manager.cache_key(&partition, "profile");
        assert!(key.starts_with(&manager.invalidation_prefix(&partition)));
    }

    #[test]
    fn test_fingerprint_truncated() {
        let manager = manager();
        let partition = Partition {
            collection: Collection::Users,
            index: 0,
        };
        let long = "x".repeat(10_000);
        let key = manager.cache_key(&partition, &long);
        assert!(key.len() <= "users:0:".len() + MAX_FINGERPRINT_LEN);
    }
}
