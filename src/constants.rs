//! Centralized configuration constants.
//!
//! This module consolidates the defaults and limits used throughout the
//! routing core. Having them in one place makes it easier to:
//!
//! - Understand the routing contract at a glance
//! - Update values consistently
//! - Document the rationale for each constant
//!
//! # Categories
//!
//! - **Topology Constants**: partition and shard counts
//! - **Monitor Constants**: health-probe intervals and timeouts
//! - **Cache Constants**: TTLs per data class and key layout

// =============================================================================
// Topology Constants
// =============================================================================

/// Default number of logical partitions per collection.
///
/// Changing this value on a live deployment without a full re-partitioning
/// procedure makes previously written data unreachable by the new formula.
/// Treat it as effectively immutable configuration.
pub const DEFAULT_PARTITION_COUNT: u32 = 10;

/// Default number of physical shards.
///
/// A partition maps to shard `partition_index % shard_count`. The same
/// reshard hazard as [`DEFAULT_PARTITION_COUNT`] applies.
pub const DEFAULT_SHARD_COUNT: u32 = 3;

// =============================================================================
// Monitor Constants
// =============================================================================

/// Default interval between shard-level health probes.
pub const DEFAULT_SHARD_MONITOR_INTERVAL_MS: u64 = 60_000;

/// Default interval between replica-set-level health probes.
///
/// Replica membership changes (elections, secondaries falling behind) are
/// faster-moving than shard-level load, so this runs at twice the rate.
pub const DEFAULT_REPLICA_MONITOR_INTERVAL_MS: u64 = 30_000;

/// Default timeout for a single health probe.
///
/// A hung store driver must never stall the probe loop past this bound.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

/// Snapshot entries older than this are reported as stale by the admin
/// surface. The monitor itself never blocks on refresh.
pub const SNAPSHOT_STALE_AFTER_MS: u64 = 180_000;

// =============================================================================
// Cache Constants
// =============================================================================

/// Default TTL for hot metadata entries (point lookups, profile records).
pub const DEFAULT_HOT_METADATA_TTL_SECS: u64 = 300;

/// Default TTL for list/aggregate views (inbox pages, member lists).
pub const DEFAULT_LIST_VIEW_TTL_SECS: u64 = 1_800;

/// Separator used in cache keys: `<collection>:<partition>:<fingerprint>`.
///
/// Every cache key must be derivable from its `(collection, partition)` pair
/// so a write to partition P can invalidate by prefix without enumerating
/// unrelated partitions.
pub const CACHE_KEY_SEPARATOR: char = ':';

/// Maximum accepted length for a query fingerprint, to keep cache keys
/// bounded when callers fingerprint raw query bodies.
pub const MAX_FINGERPRINT_LEN: usize = 256;
