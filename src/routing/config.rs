//! Configuration for the routing core.
//!
//! Configuration is environment-driven with validated defaults. Topology
//! values (`partition_count`, `shard_count`) are effectively immutable:
//! partition assignment and shard mapping are pure functions of these
//! counts, so changing either on a live deployment strands previously
//! written data under the old formula.
//!
//! # Reshard Hazard
//!
//! This layer deliberately does not implement data migration. Changing
//! `PARTITION_COUNT` or `SHARD_COUNT` requires a full external
//! re-partitioning procedure (runbook precondition) before the new values
//! are rolled out. The config only validates that the counts are positive.

use std::time::Duration;

use crate::constants::{
    DEFAULT_HOT_METADATA_TTL_SECS, DEFAULT_LIST_VIEW_TTL_SECS, DEFAULT_PARTITION_COUNT,
    DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_REPLICA_MONITOR_INTERVAL_MS, DEFAULT_SHARD_COUNT,
    DEFAULT_SHARD_MONITOR_INTERVAL_MS,
};
use crate::routing::error::{RoutingError, RoutingResult};
use crate::routing::replication::ReadPreference;

/// Configuration for the routing core.
///
/// Construct via [`Default`], [`RoutingConfig::from_env`], or struct update
/// syntax in tests:
///
/// ```rust
/// use shardroute::routing::RoutingConfig;
///
/// let config = RoutingConfig {
///     partition_count: 16,
///     shard_count: 4,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Number of logical partitions per collection. Must be > 0.
    pub partition_count: u32,

    /// Number of physical shards. Must be > 0.
    pub shard_count: u32,

    /// Read preference for read operations. Writes always target the
    /// primary regardless of this setting.
    pub read_preference: ReadPreference,

    /// Interval between shard-level health probes.
    pub shard_monitor_interval: Duration,

    /// Interval between replica-set-level health probes.
    pub replica_monitor_interval: Duration,

    /// Timeout applied to each individual health probe.
    pub probe_timeout: Duration,

    /// TTL for hot-metadata cache entries (point lookups).
    pub hot_metadata_ttl: Duration,

    /// TTL for list/aggregate-view cache entries.
    pub list_view_ttl: Duration,

    /// Include a year-month bucket in message partition keys.
    ///
    /// Keeps any one partition from growing unbounded for very active
    /// recipients, at the cost of fanning out recipient-only queries.
    /// Disabled by default.
    pub message_time_buckets: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            partition_count: DEFAULT_PARTITION_COUNT,
            shard_count: DEFAULT_SHARD_COUNT,
            read_preference: ReadPreference::SecondaryPreferred,
            shard_monitor_interval: Duration::from_millis(DEFAULT_SHARD_MONITOR_INTERVAL_MS),
            replica_monitor_interval: Duration::from_millis(DEFAULT_REPLICA_MONITOR_INTERVAL_MS),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            hot_metadata_ttl: Duration::from_secs(DEFAULT_HOT_METADATA_TTL_SECS),
            list_view_ttl: Duration::from_secs(DEFAULT_LIST_VIEW_TTL_SECS),
            message_time_buckets: false,
        }
    }
}

impl RoutingConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables (all optional, falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `PARTITION_COUNT` | 10 |
    /// | `SHARD_COUNT` | 3 |
    /// | `READ_PREFERENCE` | `secondary-preferred` |
    /// | `SHARD_MONITOR_INTERVAL_MS` | 60000 |
    /// | `REPLICA_MONITOR_INTERVAL_MS` | 30000 |
    /// | `PROBE_TIMEOUT_MS` | 5000 |
    /// | `HOT_METADATA_TTL_SECS` | 300 |
    /// | `LIST_VIEW_TTL_SECS` | 1800 |
    /// | `MESSAGE_TIME_BUCKETS` | false |
    ///
    /// Returns a configuration error for unparseable or out-of-range
    /// values. This is a startup-time failure; it must never be retried
    /// or swallowed at runtime.
    pub fn from_env() -> RoutingResult<Self> {
        let defaults = Self::default();

        let partition_count: i64 = parse_env("PARTITION_COUNT", defaults.partition_count as i64)?;
        if partition_count <= 0 {
            return Err(RoutingError::Config(format!(
                "PARTITION_COUNT must be positive, got {}",
                partition_count
            )));
        }

        let shard_count: i64 = parse_env("SHARD_COUNT", defaults.shard_count as i64)?;
        if shard_count <= 0 {
            return Err(RoutingError::Config(format!(
                "SHARD_COUNT must be positive, got {}",
                shard_count
            )));
        }

        let read_preference = match std::env::var("READ_PREFERENCE") {
            Ok(raw) => raw
                .parse::<ReadPreference>()
                .map_err(|e| RoutingError::Config(format!("Invalid READ_PREFERENCE: {}", e)))?,
            Err(_) => defaults.read_preference,
        };

        let shard_monitor_interval = Duration::from_millis(parse_env(
            "SHARD_MONITOR_INTERVAL_MS",
            DEFAULT_SHARD_MONITOR_INTERVAL_MS,
        )?);

        let replica_monitor_interval = Duration::from_millis(parse_env(
            "REPLICA_MONITOR_INTERVAL_MS",
            DEFAULT_REPLICA_MONITOR_INTERVAL_MS,
        )?);

        let probe_timeout =
            Duration::from_millis(parse_env("PROBE_TIMEOUT_MS", DEFAULT_PROBE_TIMEOUT_MS)?);

        let hot_metadata_ttl = Duration::from_secs(parse_env(
            "HOT_METADATA_TTL_SECS",
            DEFAULT_HOT_METADATA_TTL_SECS,
        )?);

        let list_view_ttl =
            Duration::from_secs(parse_env("LIST_VIEW_TTL_SECS", DEFAULT_LIST_VIEW_TTL_SECS)?);

        let message_time_buckets = std::env::var("MESSAGE_TIME_BUCKETS")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(defaults.message_time_buckets);

        let config = Self {
            partition_count: partition_count as u32,
            shard_count: shard_count as u32,
            read_preference,
            shard_monitor_interval,
            replica_monitor_interval,
            probe_timeout,
            hot_metadata_ttl,
            list_view_ttl,
            message_time_buckets,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Configuration errors are fatal at startup and never recoverable at
    /// runtime.
    pub fn validate(&self) -> RoutingResult<()> {
        if self.partition_count == 0 {
            return Err(RoutingError::Config(
                "partition_count must be positive".into(),
            ));
        }
        if self.shard_count == 0 {
            return Err(RoutingError::Config("shard_count must be positive".into()));
        }
        if self.probe_timeout >= self.replica_monitor_interval {
            return Err(RoutingError::Config(format!(
                "probe_timeout ({:?}) must be shorter than replica_monitor_interval ({:?})",
                self.probe_timeout, self.replica_monitor_interval
            )));
        }
        if self.hot_metadata_ttl.is_zero() || self.list_view_ttl.is_zero() {
            return Err(RoutingError::Config("cache TTLs must be positive".into()));
        }
        Ok(())
    }
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> RoutingResult<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| RoutingError::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RoutingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.partition_count, 10);
        assert_eq!(config.shard_count, 3);
        assert_eq!(config.read_preference, ReadPreference::SecondaryPreferred);
    }

    #[test]
    fn test_zero_partition_count_rejected() {
        let config = RoutingConfig {
            partition_count: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_zero_shard_count_rejected() {
        let config = RoutingConfig {
            shard_count: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_probe_timeout_must_fit_interval() {
        let config = RoutingConfig {
            probe_timeout: Duration::from_secs(60),
            replica_monitor_interval: Duration::from_secs(30),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
