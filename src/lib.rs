//! # shardroute
//! Partitioning, shard-routing, and cache-coherence core for a messaging
//! backend.
//!
//! Across the backend's services (API gateway, metadata service, block
//! service, async workers) the same problem recurs: a small set of entity
//! collections must be deterministically mapped to partitions and shards,
//! reads must be steered toward replicas while writes go to the
//! authoritative copy, and a cache tier must stay coherent with the
//! underlying store without being invalidated too broadly or too narrowly.
//! This crate is that shared layer.
//!
//! # Goals
//! - Globally consistent routing: every service instance computes the same
//!   partition and shard for a key, with no coordination
//! - Cache coherence scoped to exactly the partitions a write touched
//! - Health monitoring that never blocks foreground traffic
//! - Leverage best in class libraries such as [Tokio](https://tokio.rs/)
//!   and [tracing](https://docs.rs/tracing)
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shardroute::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RoutingConfig::from_env()?;
//!     let core = RoutingCore::new(
//!         config,
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(MemoryCache::new()),
//!     )?;
//!     core.start().await;
//!
//!     // Where does user-42's data live?
//!     let partition = core
//!         .strategy()
//!         .partition_for_key(Collection::Users, "user-42");
//!     let shard = core.router().shard_for(&partition);
//!     println!("user-42 -> partition {} on shard {}", partition.index, shard);
//!
//!     core.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! The store and cache are abstracted behind the
//! [`DocumentStore`](routing::DocumentStore) and
//! [`CacheClient`](routing::CacheClient) traits; production services plug
//! in their real drivers, tests use the in-memory implementations.

pub mod constants;
pub mod routing;
pub mod telemetry;

/// Convenience re-exports for consumers.
pub mod prelude {
    pub use crate::routing::{
        CacheClient, CacheCoherenceManager, Collection, DataClass, Document, DocumentStore,
        MemoryCache, MemoryStore, OperationKind, Partition, PartitionAssigner, PartitionStrategy,
        Query, ReadPreference, ReplicaTarget, ReplicationCoordinator, RoutingConfig, RoutingCore,
        RoutingError, RoutingResult, ShardHealthMonitor, ShardHealthRecord, ShardRouter,
        ShardStatus,
    };
    pub use crate::telemetry::{LogFormat, init_logging};
}
