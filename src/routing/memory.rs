//! In-memory store and cache fakes for testing.
//!
//! These provide full-featured in-memory implementations of the
//! [`DocumentStore`] and [`CacheClient`] traits for comprehensive testing
//! without external dependencies, including switches for injecting
//! failures and probe delays.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::routing::documents::Collection;
use crate::routing::error::{RoutingError, RoutingResult};
use crate::routing::shard::Query;
use crate::routing::traits::{
    CacheClient, DocumentStore, ReadOptions, ReplicaMember, ReplicaRole, ReplicaSetStatus,
};

/// Whether a document matches a query's equality constraints.
fn matches(doc: &Value, query: &Query) -> bool {
    query
        .equality()
        .iter()
        .all(|(field, expected)| doc.get(field) == Some(expected))
}

/// A healthy three-member replica set for a shard.
fn healthy_replica_set(shard: u32) -> ReplicaSetStatus {
    ReplicaSetStatus {
        members: vec![
            ReplicaMember {
                name: format!("shard{}-a", shard),
                role: ReplicaRole::Primary,
                healthy: true,
            },
            ReplicaMember {
                name: format!("shard{}-b", shard),
                role: ReplicaRole::Secondary,
                healthy: true,
            },
            ReplicaMember {
                name: format!("shard{}-c", shard),
                role: ReplicaRole::Secondary,
                healthy: true,
            },
        ],
    }
}

/// In-memory document store.
///
/// Documents live in per-(shard, collection) vectors. Replica topology
/// defaults to a healthy three-member set per shard and can be overridden
/// per shard to simulate degraded or unreachable states.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<(u32, String), Vec<Value>>>,
    replica_status: RwLock<HashMap<u32, ReplicaSetStatus>>,
    probe_delays: RwLock<HashMap<u32, Duration>>,
    failing_probes: RwLock<HashMap<u32, bool>>,
    /// Fail every data operation, simulating a store outage.
    fail_all: AtomicBool,
    /// Count of write operations, for asserting primary-only routing.
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a full store outage.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Override a shard's replica topology.
    pub async fn set_replica_status(&self, shard: u32, status: ReplicaSetStatus) {
        self.replica_status.write().await.insert(shard, status);
    }

    /// Make health probes for a shard fail.
    pub async fn set_probe_failing(&self, shard: u32, failing: bool) {
        self.failing_probes.write().await.insert(shard, failing);
    }

    /// Delay health probes for a shard, to simulate a hung driver.
    pub async fn set_probe_delay(&self, shard: u32, delay: Duration) {
        self.probe_delays.write().await.insert(shard, delay);
    }

    /// Number of write operations executed.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Documents stored for a (shard, collection), for assertions.
    pub async fn documents(&self, shard: u32, collection: &Collection) -> Vec<Value> {
        self.data
            .read()
            .await
            .get(&(shard, collection.name().to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn check_available(&self) -> RoutingResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(RoutingError::Store("store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        shard: u32,
        collection: &Collection,
        query: &Query,
        _options: ReadOptions,
    ) -> RoutingResult<Option<Value>> {
        self.check_available()?;
        let data = self.data.read().await;
        Ok(data
            .get(&(shard, collection.name().to_string()))
            .and_then(|docs| docs.iter().find(|doc| matches(doc, query)).cloned()))
    }

    async fn find(
        &self,
        shard: u32,
        collection: &Collection,
        query: &Query,
        _options: ReadOptions,
    ) -> RoutingResult<Vec<Value>> {
        self.check_available()?;
        let data = self.data.read().await;
        Ok(data
            .get(&(shard, collection.name().to_string()))
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches(doc, query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, shard: u32, collection: &Collection, doc: Value) -> RoutingResult<()> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.data
            .write()
            .await
            .entry((shard, collection.name().to_string()))
            .or_default()
            .push(doc);
        Ok(())
    }

    async fn update_one(
        &self,
        shard: u32,
        collection: &Collection,
        query: &Query,
        update: Value,
    ) -> RoutingResult<u64> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.write().await;
        let Some(docs) = data.get_mut(&(shard, collection.name().to_string())) else {
            return Ok(0);
        };
        for doc in docs.iter_mut() {
            if matches(doc, query) {
                if let (Some(target), Some(fields)) = (doc.as_object_mut(), update.as_object()) {
                    for (field, value) in fields {
                        target.insert(field.clone(), value.clone());
                    }
                }
                return Ok(1);
            }
        }
        Ok(0)
    }

    async fn delete(
        &self,
        shard: u32,
        collection: &Collection,
        query: &Query,
    ) -> RoutingResult<u64> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.write().await;
        let Some(docs) = data.get_mut(&(shard, collection.name().to_string())) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !matches(doc, query));
        Ok((before - docs.len()) as u64)
    }

    async fn replica_set_status(&self, shard: u32) -> RoutingResult<ReplicaSetStatus> {
        let delay = self.probe_delays.read().await.get(&shard).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self
            .failing_probes
            .read()
            .await
            .get(&shard)
            .copied()
            .unwrap_or(false)
        {
            return Err(RoutingError::ProbeFailed {
                shard,
                reason: "connection refused".into(),
            });
        }
        Ok(self
            .replica_status
            .read()
            .await
            .get(&shard)
            .cloned()
            .unwrap_or_else(|| healthy_replica_set(shard)))
    }

    async fn estimated_document_count(&self, shard: u32) -> RoutingResult<u64> {
        self.check_available()?;
        let data = self.data.read().await;
        Ok(data
            .iter()
            .filter(|((s, _), _)| *s == shard)
            .map(|(_, docs)| docs.len() as u64)
            .sum())
    }
}

/// In-memory cache with TTL tracking and a kill switch.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Value, Instant)>>,
    /// Fail every cache operation, simulating a cache outage.
    fail_all: AtomicBool,
    gets: AtomicU64,
    sets: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a full cache outage.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Number of `get` calls observed.
    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls observed.
    pub fn set_count(&self) -> u64 {
        self.sets.load(Ordering::SeqCst)
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, expires)| *expires > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> RoutingResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(RoutingError::CacheUnavailable("cache unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get(&self, key: &str) -> RoutingResult<Option<Value>> {
        self.check_available()?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.read().await;
        Ok(entries.get(key).and_then(|(value, expires)| {
            if *expires > Instant::now() {
                Some(value.clone())
            } else {
                None
            }
        }))
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> RoutingResult<()> {
        self.check_available()?;
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> RoutingResult<u64> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    async fn exists(&self, key: &str) -> RoutingResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
