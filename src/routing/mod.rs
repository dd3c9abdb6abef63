//! Partitioning, shard-routing, and cache-coherence core.
//!
//! Every service in the messaging backend must independently agree on one
//! question: which partition and shard owns this key? This module answers
//! it with pure functions over static configuration, then layers replica
//! routing, cache coherence, and background health monitoring on top.
//!
//! # Architecture
//!
//! ```text
//!   caller (route handler, worker)
//!        │
//!        ▼
//!   ┌──────────────────┐   partition key    ┌──────────────────┐
//!   │ PartitionStrategy│ ─────────────────▶ │ PartitionAssigner │
//!   └──────────────────┘    (per collection) │  (FNV-1a mod N)  │
//!        │                                  └──────────────────┘
//!        ▼
//!   ┌──────────────────┐   index % shards   ┌──────────────────┐
//!   │   ShardRouter    │ ─────────────────▶ │  shard 0..S-1    │
//!   └──────────────────┘                    └──────────────────┘
//!        │
//!        ▼
//!   ┌──────────────────────┐  read pref     ┌──────────────────────┐
//!   │ReplicationCoordinator│ ─────────────▶ │ CacheCoherenceManager │
//!   └──────────────────────┘                │  cache-aside reads,   │
//!                                           │  write + invalidate   │
//!                                           └──────────────────────┘
//!   ┌──────────────────┐
//!   │ShardHealthMonitor│  background probes → cached snapshot → AdminApi
//!   └──────────────────┘
//! ```
//!
//! Partition assignment, shard mapping, and replica routing are pure and
//! side-effect-free: independently constructed instances in different
//! processes agree without coordination. The health monitor owns the only
//! long-lived mutable state and runs off the request path.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shardroute::routing::{MemoryCache, MemoryStore, RoutingConfig, RoutingCore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RoutingConfig::from_env()?;
//!     let core = RoutingCore::new(config, Arc::new(MemoryStore::new()), Arc::new(MemoryCache::new()))?;
//!     core.start().await;
//!     // ... serve traffic through core.coherence() ...
//!     core.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod background;
pub mod coherence;
mod config;
pub mod documents;
mod error;
pub mod health;
pub mod memory;
pub mod metrics;
pub mod partition;
pub mod replication;
pub mod shard;
pub mod strategy;
pub mod traits;

use std::sync::Arc;

pub use admin::{AdminApi, ShardHealthSummary};
pub use background::{TaskRegistry, TaskStatus};
pub use coherence::{CacheCoherenceManager, DataClass, ReadContext, WriteContext};
pub use config::RoutingConfig;
pub use documents::{
    Collection, ContactRecord, Document, GroupRecord, MessageRecord, UserRecord,
};
pub use error::{RoutingError, RoutingResult};
pub use health::{ShardHealthMonitor, ShardHealthRecord, ShardStatus};
pub use memory::{MemoryCache, MemoryStore};
pub use partition::{Partition, PartitionAssigner, fnv1a_hash64};
pub use replication::{OperationKind, ReadPreference, ReplicaTarget, ReplicationCoordinator};
pub use shard::{Query, ShardRouter};
pub use strategy::PartitionStrategy;
pub use traits::{
    CacheClient, DocumentStore, ReadOptions, ReplicaMember, ReplicaRole, ReplicaSetStatus,
};

/// Explicitly constructed routing core with injected collaborators.
///
/// Owns the health monitor's lifecycle so tests can substitute fakes and
/// shutdown is deterministic. The store and cache are shared, long-lived
/// clients opened once per process and injected here.
pub struct RoutingCore {
    config: RoutingConfig,
    store: Arc<dyn DocumentStore>,
    coherence: CacheCoherenceManager,
    monitor: Arc<ShardHealthMonitor>,
    admin: AdminApi,
}

impl RoutingCore {
    /// Build the core. Fails fast on invalid configuration.
    pub fn new(
        config: RoutingConfig,
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn CacheClient>,
    ) -> RoutingResult<Self> {
        config.validate()?;
        let coherence = CacheCoherenceManager::new(&config, cache)?;
        let monitor = Arc::new(ShardHealthMonitor::new(Arc::clone(&store), &config));
        let admin = AdminApi::new(Arc::clone(&monitor), ShardRouter::new(&config)?);
        Ok(Self {
            config,
            store,
            coherence,
            monitor,
            admin,
        })
    }

    /// Start the background health monitor.
    pub async fn start(&self) {
        self.monitor.start().await;
    }

    /// Stop the background health monitor and wait for its loops to exit.
    pub async fn shutdown(&self) {
        self.monitor.shutdown().await;
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Request-path entry point: coherent reads and writes.
    pub fn coherence(&self) -> &CacheCoherenceManager {
        &self.coherence
    }

    pub fn strategy(&self) -> &PartitionStrategy {
        self.coherence.strategy()
    }

    pub fn router(&self) -> &ShardRouter {
        self.coherence.router()
    }

    pub fn replication(&self) -> &ReplicationCoordinator {
        self.coherence.replication()
    }

    pub fn monitor(&self) -> &Arc<ShardHealthMonitor> {
        &self.monitor
    }

    /// Operator-facing read-only surface.
    pub fn admin(&self) -> &AdminApi {
        &self.admin
    }
}
