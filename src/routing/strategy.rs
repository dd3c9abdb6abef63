//! Per-collection partition-key extraction.
//!
//! # Key Policy
//!
//! | Collection | Partition key | Rationale |
//! |------------|---------------|-----------|
//! | `users` | user id | point lookups by id dominate |
//! | `messages` | recipient id (+ optional year-month bucket) | the dominant read is "get my messages"; partitioning by recipient keeps one inbox on one shard |
//! | `groups` | group code | stable for the group's lifetime |
//! | `contacts` | owning user id | one user's contact list in one partition |
//! | anything else | document id | safe fallback |
//!
//! Changing any of these rules silently reshapes all future routing:
//! documents written under the old rule become unreachable by key-pinned
//! queries under the new one. Treat this table as part of the on-disk
//! contract.
//!
//! The optional year-month bucket for messages keeps a very active
//! recipient's partition from growing unbounded, at the cost of fanning
//! out recipient-only queries (see `ShardRouter`). It is off by default.

use crate::routing::config::RoutingConfig;
use crate::routing::documents::{Collection, Document};
use crate::routing::error::RoutingResult;
use crate::routing::partition::{Partition, PartitionAssigner};

/// Composes per-collection key extraction with the partition assigner.
///
/// Pure function plus static configuration; independently constructed
/// instances agree without coordination.
#[derive(Debug, Clone)]
pub struct PartitionStrategy {
    assigner: PartitionAssigner,
    message_time_buckets: bool,
}

impl PartitionStrategy {
    /// Build a strategy from validated configuration.
    pub fn new(config: &RoutingConfig) -> RoutingResult<Self> {
        Ok(Self {
            assigner: PartitionAssigner::new(config.partition_count)?,
            message_time_buckets: config.message_time_buckets,
        })
    }

    /// The underlying assigner.
    pub fn assigner(&self) -> &PartitionAssigner {
        &self.assigner
    }

    /// Extract the partition key for a document.
    pub fn partition_key_for(&self, doc: &Document) -> String {
        match doc {
            Document::Users(u) => u.id.clone(),
            Document::Messages(m) => {
                if self.message_time_buckets {
                    format!("{}:{}", m.to, m.sent_at.format("%Y-%m"))
                } else {
                    m.to.clone()
                }
            }
            Document::Groups(g) => g.code.clone(),
            Document::Contacts(c) => c.owner.clone(),
            Document::Raw { id, .. } => id.clone(),
        }
    }

    /// Resolve the partition a document belongs to.
    pub fn partition_for(&self, doc: &Document) -> Partition {
        let key = self.partition_key_for(doc);
        Partition {
            collection: doc.collection(),
            index: self.assigner.hash_to_partition(&key),
        }
    }

    /// Resolve a partition from a bare key, for callers that know the
    /// partition key without holding a full document (query routing,
    /// admin resolution).
    pub fn partition_for_key(&self, collection: Collection, key: &str) -> Partition {
        Partition {
            collection,
            index: self.assigner.hash_to_partition(key),
        }
    }

    /// The document field whose equality filter pins a partition for the
    /// given collection.
    pub fn key_field(collection: &Collection) -> &'static str {
        match collection {
            Collection::Users => "id",
            Collection::Messages => "to",
            Collection::Groups => "code",
            Collection::Contacts => "owner",
            Collection::Other(_) => "id",
        }
    }

    /// Whether message keys carry a time bucket. When enabled, an equality
    /// filter on `to` alone no longer pins a partition.
    pub fn message_time_buckets(&self) -> bool {
        self.message_time_buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::documents::{ContactRecord, GroupRecord, MessageRecord, UserRecord};
    use chrono::{TimeZone, Utc};

    fn strategy(buckets: bool) -> PartitionStrategy {
        PartitionStrategy::new(&RoutingConfig {
            message_time_buckets: buckets,
            ..Default::default()
        })
        .unwrap()
    }

    fn message(to: &str) -> Document {
        Document::Messages(MessageRecord {
            id: "m-1".into(),
            from: "u-9".into(),
            to: to.into(),
            ciphertext: "AAAA".into(),
            sent_at: Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_users_partition_by_own_id() {
        let doc = Document::Users(UserRecord {
            id: "user-42".into(),
            username: "alice".into(),
            identity_key: "AQ==".into(),
            created_at: Utc::now(),
        });
        assert_eq!(strategy(false).partition_key_for(&doc), "user-42");
    }

    #[test]
    fn test_messages_partition_by_recipient() {
        assert_eq!(strategy(false).partition_key_for(&message("u123")), "u123");
    }

    #[test]
    fn test_messages_time_bucket_appends_year_month() {
        assert_eq!(
            strategy(true).partition_key_for(&message("u123")),
            "u123:2026-08"
        );
    }

    #[test]
    fn test_groups_partition_by_code() {
        let doc = Document::Groups(GroupRecord {
            id: "g-1".into(),
            code: "JOINME".into(),
            name: "friends".into(),
            owner: "u-1".into(),
            created_at: Utc::now(),
        });
        assert_eq!(strategy(false).partition_key_for(&doc), "JOINME");
    }

    #[test]
    fn test_contacts_partition_by_owner() {
        let doc = Document::Contacts(ContactRecord {
            id: "c-1".into(),
            owner: "u-7".into(),
            contact_id: "u-8".into(),
            alias: None,
        });
        assert_eq!(strategy(false).partition_key_for(&doc), "u-7");
    }

    #[test]
    fn test_unknown_collection_falls_back_to_id() {
        let doc = Document::Raw {
            name: "sessions".into(),
            id: "s-3".into(),
            body: serde_json::json!({}),
        };
        assert_eq!(strategy(false).partition_key_for(&doc), "s-3");
    }

    #[test]
    fn test_partition_for_matches_bare_key_resolution() {
        let strategy = strategy(false);
        let doc = message("u123");
        let from_doc = strategy.partition_for(&doc);
        let from_key = strategy.partition_for_key(Collection::Messages, "u123");
        assert_eq!(from_doc, from_key);
    }
}
