//! Deterministic partition assignment.
//!
//! Every document is assigned to a logical partition by hashing its
//! partition key with FNV-1a (64-bit) and reducing modulo the configured
//! partition count. The same key must map to the same partition on every
//! service instance, across restarts, with no coordination: routing
//! consistency cluster-wide depends on it.
//!
//! FNV-1a is used instead of `std::collections::hash_map::DefaultHasher`
//! because SipHash is keyed per process, which would silently desynchronize
//! routing across instances.

use serde::{Deserialize, Serialize};

use crate::routing::documents::Collection;
use crate::routing::error::{RoutingError, RoutingResult};

const FNV_OFFSET: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

/// FNV-1a 64-bit hash.
///
/// Stable by construction: no seeding, no per-process state.
pub fn fnv1a_hash64(data: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A logical partition within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// The collection this partition belongs to.
    pub collection: Collection,
    /// Partition index in `[0, partition_count)`.
    pub index: u32,
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.index)
    }
}

/// Maps partition keys to partition indexes.
///
/// Pure function plus static configuration; holds no mutable state and is
/// safe to construct independently in every process.
#[derive(Debug, Clone)]
pub struct PartitionAssigner {
    partition_count: u32,
}

impl PartitionAssigner {
    /// Create an assigner for the given partition count.
    ///
    /// `partition_count == 0` is a configuration error, raised here at
    /// startup rather than at call time.
    pub fn new(partition_count: u32) -> RoutingResult<Self> {
        if partition_count == 0 {
            return Err(RoutingError::Config(
                "partition_count must be positive".into(),
            ));
        }
        Ok(Self { partition_count })
    }

    /// The configured partition count.
    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }

    /// Hash a partition key to a partition index.
    ///
    /// An empty key maps to partition 0 deterministically, so callers
    /// without a usable key degrade to "everything in bucket 0" instead
    /// of erroring.
    pub fn hash_to_partition(&self, key: &str) -> u32 {
        if key.is_empty() {
            return 0;
        }
        (fnv1a_hash64(key.as_bytes()) % self.partition_count as u64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_vectors() {
        // Reference values for the unseeded FNV-1a 64-bit function. These
        // must never change: partition assignment across the fleet depends
        // on them.
        assert_eq!(fnv1a_hash64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_hash64(b"user-42"), 0x32c6d7a54d35dacb);
    }

    #[test]
    fn test_hash_to_partition_deterministic() {
        let a = PartitionAssigner::new(10).unwrap();
        let b = PartitionAssigner::new(10).unwrap();
        for key in ["user-42", "u123", "alice", "g-7"] {
            assert_eq!(a.hash_to_partition(key), b.hash_to_partition(key));
        }
    }

    #[test]
    fn test_user_42_maps_to_partition_9() {
        let assigner = PartitionAssigner::new(10).unwrap();
        assert_eq!(assigner.hash_to_partition("user-42"), 9);
    }

    #[test]
    fn test_empty_key_maps_to_partition_zero() {
        let assigner = PartitionAssigner::new(10).unwrap();
        assert_eq!(assigner.hash_to_partition(""), 0);
    }

    #[test]
    fn test_zero_partition_count_is_config_error() {
        assert!(PartitionAssigner::new(0).unwrap_err().is_config());
    }

    #[test]
    fn test_partition_index_in_range() {
        let assigner = PartitionAssigner::new(7).unwrap();
        for i in 0..1000 {
            let index = assigner.hash_to_partition(&format!("key-{}", i));
            assert!(index < 7);
        }
    }
}
