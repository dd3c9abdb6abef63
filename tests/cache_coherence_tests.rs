//! Tests for cache-aside reads, write-scoped invalidation, and degraded
//! mode when the cache tier is down.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use serde_json::{Value, json};
use shardroute::routing::{
    CacheCoherenceManager, Collection, ContactRecord, DataClass, Document, DocumentStore,
    MemoryCache,
    MemoryStore, Query, RoutingConfig, RoutingError, UserRecord,
};

fn user_doc(id: &str) -> Document {
    Document::Users(UserRecord {
        id: id.into(),
        username: format!("name-{}", id),
        identity_key: "AQ==".into(),
        created_at: Utc::now(),
    })
}

struct Fixture {
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
    manager: CacheCoherenceManager,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let manager =
        CacheCoherenceManager::new(&RoutingConfig::default(), cache.clone()).unwrap();
    Fixture {
        store,
        cache,
        manager,
    }
}

/// Write a user document through the coherence manager.
async fn write_user(fixture: &Fixture, doc: &Document) {
    let store = fixture.store.clone();
    let value = doc.to_value();
    fixture
        .manager
        .write(doc, |ctx| {
            let store = store.clone();
            async move { store.insert(ctx.shard, &Collection::Users, value).await }
        })
        .await
        .unwrap();
}

/// Read a user profile through the coherence manager, counting loader calls.
async fn read_user(fixture: &Fixture, id: &str, loads: &Arc<AtomicU32>) -> Value {
    let store = fixture.store.clone();
    let loads = loads.clone();
    let query = Query::new().eq("id", id);
    fixture
        .manager
        .read(
            Collection::Users,
            id,
            "profile",
            DataClass::HotMetadata,
            |ctx| {
                let store = store.clone();
                async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    store
                        .find_one(ctx.shard, &Collection::Users, &query, ctx.options)
                        .await?
                        .ok_or_else(|| RoutingError::Store("document not found".into()))
                }
            },
        )
        .await
        .unwrap()
}

// ============================================================================
// Cache-Aside Basics
// ============================================================================

#[tokio::test]
async fn test_first_read_misses_second_read_hits() {
    let fixture = fixture();
    let doc = user_doc("user-42");
    write_user(&fixture, &doc).await;

    let loads = Arc::new(AtomicU32::new(0));
    let first = read_user(&fixture, "user-42", &loads).await;
    assert_eq!(first["username"], "name-user-42");
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    let second = read_user(&fixture, "user-42", &loads).await;
    assert_eq!(second, first);
    // Served from cache: the loader did not run again.
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Coherence Law
// ============================================================================

#[tokio::test]
async fn test_write_invalidates_before_acknowledging() {
    let fixture = fixture();
    let doc = user_doc("user-42");
    write_user(&fixture, &doc).await;

    // Warm the cache.
    let loads = Arc::new(AtomicU32::new(0));
    read_user(&fixture, "user-42", &loads).await;
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    // Mutate through the manager.
    let store = fixture.store.clone();
    fixture
        .manager
        .write(&doc, |ctx| {
            let store = store.clone();
            async move {
                store
                    .update_one(
                        ctx.shard,
                        &Collection::Users,
                        &Query::new().eq("id", "user-42"),
                        json!({"username": "renamed"}),
                    )
                    .await
            }
        })
        .await
        .unwrap();

    // The next read must observe the new value, never the pre-write
    // cached one.
    let after = read_user(&fixture, "user-42", &loads).await;
    assert_eq!(after["username"], "renamed");
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_invalidation_is_scoped_to_written_partition() {
    let fixture = fixture();

    // "user-42" -> partition 9, "u123" -> partition 8: distinct cache
    // prefixes, so writing one must not evict the other.
    let hot = user_doc("user-42");
    let cold = user_doc("u123");
    write_user(&fixture, &hot).await;
    write_user(&fixture, &cold).await;

    let loads = Arc::new(AtomicU32::new(0));
    read_user(&fixture, "user-42", &loads).await;
    read_user(&fixture, "u123", &loads).await;
    assert_eq!(loads.load(Ordering::SeqCst), 2);

    // Rewrite only user-42.
    write_user(&fixture, &hot).await;

    // u123 is still cached; user-42 reloads.
    read_user(&fixture, "u123", &loads).await;
    assert_eq!(loads.load(Ordering::SeqCst), 2);
    read_user(&fixture, "user-42", &loads).await;
    assert_eq!(loads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rekeyed_write_invalidates_both_partitions() {
    let fixture = fixture();

    // Contacts partition by owner; transferring a contact between owners
    // moves it to another partition.
    let before = Document::Contacts(ContactRecord {
        id: "c-1".into(),
        owner: "user-42".into(),
        contact_id: "u-9".into(),
        alias: None,
    });
    let after = Document::Contacts(ContactRecord {
        id: "c-1".into(),
        owner: "u123".into(),
        contact_id: "u-9".into(),
        alias: None,
    });

    // Warm both owners' contact-list views.
    let loads = Arc::new(AtomicU32::new(0));
    for owner in ["user-42", "u123"] {
        let store = fixture.store.clone();
        let loads = loads.clone();
        fixture
            .manager
            .read::<Vec<Value>, _, _>(
                Collection::Contacts,
                owner,
                "contact-list",
                DataClass::ListView,
                |ctx| {
                    let store = store.clone();
                    let query = Query::new().eq("owner", owner);
                    async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        store
                            .find(ctx.shard, &Collection::Contacts, &query, ctx.options)
                            .await
                    }
                },
            )
            .await
            .unwrap();
    }
    assert_eq!(loads.load(Ordering::SeqCst), 2);
    assert_eq!(fixture.cache.len().await, 2);

    let store = fixture.store.clone();
    let value = after.to_value();
    fixture
        .manager
        .write_rekeyed(&before, Some(&after), |ctx| {
            let store = store.clone();
            async move { store.insert(ctx.shard, &Collection::Contacts, value).await }
        })
        .await
        .unwrap();

    // Both owners' cached views are gone.
    assert_eq!(fixture.cache.len().await, 0);
}

// ============================================================================
// Degraded Mode
// ============================================================================

#[tokio::test]
async fn test_read_falls_back_when_cache_is_down() {
    let fixture = fixture();
    let doc = user_doc("user-42");
    write_user(&fixture, &doc).await;

    fixture.cache.set_fail_all(true);

    let loads = Arc::new(AtomicU32::new(0));
    let first = read_user(&fixture, "user-42", &loads).await;
    assert_eq!(first["id"], "user-42");

    // Every read hits the store while the cache is down.
    read_user(&fixture, "user-42", &loads).await;
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_write_succeeds_when_invalidation_fails() {
    let fixture = fixture();
    fixture.cache.set_fail_all(true);

    let doc = user_doc("user-42");
    write_user(&fixture, &doc).await;

    // The document reached the store despite the cache outage.
    let stored = fixture
        .store
        .documents(0, &Collection::Users)
        .await;
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_store_failure_propagates_without_invalidation() {
    let fixture = fixture();
    let doc = user_doc("user-42");
    write_user(&fixture, &doc).await;

    // Warm the cache, then break the store.
    let loads = Arc::new(AtomicU32::new(0));
    read_user(&fixture, "user-42", &loads).await;
    fixture.store.set_fail_all(true);

    let store = fixture.store.clone();
    let result = fixture
        .manager
        .write(&doc, |ctx| {
            let store = store.clone();
            async move {
                store
                    .insert(ctx.shard, &Collection::Users, json!({"id": "user-42"}))
                    .await
            }
        })
        .await;
    assert!(result.is_err());
}
