//! Collaborator traits for the document store and cache tier.
//!
//! These traits abstract the external store and cache, allowing for:
//! - Different backend drivers behind the same routing core
//! - Easier testing with in-memory fakes
//! - Clear separation between routing decisions and I/O
//!
//! Both collaborators must tolerate being unreachable: every operation
//! returns a `Result` rather than panicking, and the routing core decides
//! whether the failure is fatal (store) or degradable (cache).
//!
//! # Available Implementations
//!
//! - [`MemoryStore`](super::memory::MemoryStore) / [`MemoryCache`](super::memory::MemoryCache):
//!   in-memory fakes with failure injection, for tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::routing::documents::Collection;
use crate::routing::error::RoutingResult;
use crate::routing::replication::ReplicaTarget;
use crate::routing::shard::Query;

/// Options for read operations, consumed by the store driver.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// The replica target decided by the `ReplicationCoordinator` before
    /// the operation started.
    pub replica_target: ReplicaTarget,
}

/// Role of a replica-set member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaRole {
    Primary,
    Secondary,
}

/// One member of a shard's replica set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaMember {
    pub name: String,
    pub role: ReplicaRole,
    pub healthy: bool,
}

/// Replica-set topology for one shard, as reported by the store driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicaSetStatus {
    pub members: Vec<ReplicaMember>,
}

impl ReplicaSetStatus {
    /// Whether the primary is reachable.
    pub fn primary_healthy(&self) -> bool {
        self.members
            .iter()
            .any(|m| m.role == ReplicaRole::Primary && m.healthy)
    }

    /// Number of healthy secondaries.
    pub fn healthy_secondaries(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.role == ReplicaRole::Secondary && m.healthy)
            .count()
    }
}

/// Driver for the replicated document store.
///
/// The store accepts a collection name and an untyped document shape;
/// typed records are serialized at the routing layer. Shard selection is
/// the router's job — every method here addresses a single shard.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find a single document matching the query on the given shard.
    async fn find_one(
        &self,
        shard: u32,
        collection: &Collection,
        query: &Query,
        options: ReadOptions,
    ) -> RoutingResult<Option<Value>>;

    /// Find all documents matching the query on the given shard.
    async fn find(
        &self,
        shard: u32,
        collection: &Collection,
        query: &Query,
        options: ReadOptions,
    ) -> RoutingResult<Vec<Value>>;

    /// Insert a document on the given shard. Always executes on the
    /// primary.
    async fn insert(&self, shard: u32, collection: &Collection, doc: Value) -> RoutingResult<()>;

    /// Update the first document matching the query. Always executes on
    /// the primary. Returns the number of documents modified.
    async fn update_one(
        &self,
        shard: u32,
        collection: &Collection,
        query: &Query,
        update: Value,
    ) -> RoutingResult<u64>;

    /// Delete documents matching the query. Always executes on the
    /// primary. Returns the number of documents removed.
    async fn delete(&self, shard: u32, collection: &Collection, query: &Query)
        -> RoutingResult<u64>;

    /// Replica-set topology for a shard. Used by the health monitor only;
    /// request-path code reads the cached snapshot instead.
    async fn replica_set_status(&self, shard: u32) -> RoutingResult<ReplicaSetStatus>;

    /// Best-effort document count for a shard. Observability only; may be
    /// stale and must never be used for correctness.
    async fn estimated_document_count(&self, shard: u32) -> RoutingResult<u64>;
}

/// Client for the external cache tier.
///
/// Cache keys are plain delimited strings of the form
/// `<collection>:<partitionIndex>:<fingerprint>`; the coherence manager is
/// the only component that decides key shape.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Fetch a cached value.
    async fn get(&self, key: &str) -> RoutingResult<Option<Value>>;

    /// Store a value with an explicit TTL.
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> RoutingResult<()>;

    /// Delete every entry whose key starts with `prefix`. Returns the
    /// number of entries removed.
    async fn delete_by_prefix(&self, prefix: &str) -> RoutingResult<u64>;

    /// Whether a key is present (and unexpired).
    async fn exists(&self, key: &str) -> RoutingResult<bool>;
}
