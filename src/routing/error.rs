//! Error types for the routing core.
//!
//! # Error Handling Patterns
//!
//! This crate uses two error handling patterns based on operation criticality:
//!
//! ## Fail-Fast (Propagate Errors)
//!
//! Used for operations where failure indicates a serious problem:
//! - Store reads and writes on the request path
//! - Configuration loading at startup
//!
//! The core never retries a failed store operation internally: retrying a
//! write blindly risks duplicate side effects, and retry policy belongs to
//! the caller or a higher-level resilience layer.
//!
//! ## Best-Effort (Log and Continue)
//!
//! Used for operations where partial failure is acceptable:
//! - Cache lookups and populations (fall back to the store)
//! - Cache invalidation after a write (the store is the source of truth)
//! - Health probes (the shard is marked unreachable, the loop continues)
//! - Document count estimates (observability only)
//!
//! ## Guidelines
//!
//! - **Write path**: Always fail-fast to prevent silent data loss
//! - **Cache path**: Always best-effort; a cache outage must never look
//!   like a data outage
//! - **Background probes**: Best-effort with logging for observability

use std::time::Duration;

use thiserror::Error;

/// Result type for routing operations.
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Errors produced by the routing core.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Invalid configuration detected at startup. Never recoverable at
    /// runtime; the process should refuse to start.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The cache tier failed or is unreachable. Non-fatal by contract:
    /// callers degrade to direct store access.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// The document store rejected or failed an operation. Fatal for the
    /// specific operation; propagated to the caller without retry.
    #[error("store error: {0}")]
    Store(String),

    /// A store operation exceeded its deadline.
    #[error("store operation timed out after {0:?}")]
    StoreTimeout(Duration),

    /// A health probe failed. Recorded as `unreachable` status and retried
    /// on the next scheduled interval.
    #[error("health probe failed for shard {shard}: {reason}")]
    ProbeFailed { shard: u32, reason: String },

    /// A shard index outside `[0, shard_count)` was requested.
    #[error("unknown shard index {0}")]
    UnknownShard(u32),

    /// A cached or stored value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RoutingError {
    /// Returns true if this error is non-fatal for the request path.
    ///
    /// Cache errors degrade to direct store access; probe errors only
    /// affect the health snapshot.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            RoutingError::CacheUnavailable(_) | RoutingError::ProbeFailed { .. }
        )
    }

    /// Returns true if this error indicates a startup misconfiguration.
    pub fn is_config(&self) -> bool {
        matches!(self, RoutingError::Config(_))
    }
}
