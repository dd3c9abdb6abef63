//! Replica-routing decisions.
//!
//! The coordinator decides, per operation, whether to target the primary
//! or allow a secondary. It performs no I/O: the decision is computed
//! before the operation starts, handed to the store driver, and must not
//! change mid-operation.
//!
//! Writes target the primary unconditionally. The system has no mechanism
//! to reconcile divergent writes, so there are no exceptions to this rule.
//! Reads use a single process-wide preference rather than a per-query one,
//! keeping the contract simple and auditable.

use serde::{Deserialize, Serialize};

/// Where a read is allowed to land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadPreference {
    /// Always read from the primary.
    Primary,
    /// Prefer a secondary, falling back to the primary. Scales read
    /// throughput at the cost of possible replication lag.
    SecondaryPreferred,
}

impl std::str::FromStr for ReadPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(ReadPreference::Primary),
            "secondary-preferred" | "secondary_preferred" | "secondarypreferred" => {
                Ok(ReadPreference::SecondaryPreferred)
            }
            other => Err(format!(
                "unknown read preference '{}', expected 'primary' or 'secondary-preferred'",
                other
            )),
        }
    }
}

impl std::fmt::Display for ReadPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadPreference::Primary => write!(f, "primary"),
            ReadPreference::SecondaryPreferred => write!(f, "secondary-preferred"),
        }
    }
}

/// The kind of store operation being routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

/// The routing decision handed to the store driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaTarget {
    /// Must execute on the primary.
    Primary,
    /// May execute on a healthy secondary, falling back to the primary.
    SecondaryPreferred,
}

/// Chooses the replica target per operation.
#[derive(Debug, Clone)]
pub struct ReplicationCoordinator {
    read_preference: ReadPreference,
}

impl ReplicationCoordinator {
    pub fn new(read_preference: ReadPreference) -> Self {
        Self { read_preference }
    }

    /// The configured read preference.
    pub fn read_preference(&self) -> ReadPreference {
        self.read_preference
    }

    /// Route an operation to a replica target.
    ///
    /// Writes always return [`ReplicaTarget::Primary`], regardless of the
    /// configured read preference.
    pub fn route_for(&self, kind: OperationKind) -> ReplicaTarget {
        match kind {
            OperationKind::Write => ReplicaTarget::Primary,
            OperationKind::Read => match self.read_preference {
                ReadPreference::Primary => ReplicaTarget::Primary,
                ReadPreference::SecondaryPreferred => ReplicaTarget::SecondaryPreferred,
            },
        }
    }
}
