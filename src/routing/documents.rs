//! Typed document records for the routed collections.
//!
//! The source system accepted untyped document shapes per collection name;
//! here each routed collection gets an explicit record type, with a raw
//! fallback for collections the routing layer has no schema for. Message
//! bodies are opaque ciphertext: this layer never sees plaintext.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A routed entity collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Collection {
    Users,
    Messages,
    Groups,
    Contacts,
    /// A collection without a dedicated key-extraction rule. Partitioned
    /// by document id.
    Other(String),
}

impl Collection {
    /// The collection name as stored in the document store.
    pub fn name(&self) -> &str {
        match self {
            Collection::Users => "users",
            Collection::Messages => "messages",
            Collection::Groups => "groups",
            Collection::Contacts => "contacts",
            Collection::Other(name) => name,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for Collection {
    fn from(s: String) -> Self {
        match s.as_str() {
            "users" => Collection::Users,
            "messages" => Collection::Messages,
            "groups" => Collection::Groups,
            "contacts" => Collection::Contacts,
            _ => Collection::Other(s),
        }
    }
}

impl From<Collection> for String {
    fn from(c: Collection) -> Self {
        c.name().to_string()
    }
}

impl From<&str> for Collection {
    fn from(s: &str) -> Self {
        Collection::from(s.to_string())
    }
}

/// A registered user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    /// Public identity key, base64-encoded.
    pub identity_key: String,
    pub created_at: DateTime<Utc>,
}

/// An encrypted message. The body is ciphertext end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub from: String,
    /// Recipient user id. This is the partition key: the dominant read
    /// pattern is "get my messages", so messages co-locate by recipient,
    /// not sender.
    pub to: String,
    pub ciphertext: String,
    pub sent_at: DateTime<Utc>,
}

/// A messaging group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    /// Invite/join code; stable for the group's lifetime and used as the
    /// partition key.
    pub code: String,
    pub name: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

/// A contact-list entry, owned by `owner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    /// Owning user id; partition key, so one user's contact list lives in
    /// one partition.
    pub owner: String,
    pub contact_id: String,
    pub alias: Option<String>,
}

/// A document belonging to one of the routed collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "collection", rename_all = "snake_case")]
pub enum Document {
    Users(UserRecord),
    Messages(MessageRecord),
    Groups(GroupRecord),
    Contacts(ContactRecord),
    /// Untyped fallback for collections without a schema here.
    Raw {
        name: String,
        id: String,
        body: serde_json::Value,
    },
}

impl Document {
    /// The collection this document belongs to.
    pub fn collection(&self) -> Collection {
        match self {
            Document::Users(_) => Collection::Users,
            Document::Messages(_) => Collection::Messages,
            Document::Groups(_) => Collection::Groups,
            Document::Contacts(_) => Collection::Contacts,
            Document::Raw { name, .. } => Collection::from(name.as_str()),
        }
    }

    /// The document's own identifier.
    pub fn id(&self) -> &str {
        match self {
            Document::Users(u) => &u.id,
            Document::Messages(m) => &m.id,
            Document::Groups(g) => &g.id,
            Document::Contacts(c) => &c.id,
            Document::Raw { id, .. } => id,
        }
    }

    /// Serialize to the untyped shape the store driver accepts.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Document::Users(u) => serde_json::to_value(u).unwrap_or_default(),
            Document::Messages(m) => serde_json::to_value(m).unwrap_or_default(),
            Document::Groups(g) => serde_json::to_value(g).unwrap_or_default(),
            Document::Contacts(c) => serde_json::to_value(c).unwrap_or_default(),
            Document::Raw { body, .. } => body.clone(),
        }
    }
}
