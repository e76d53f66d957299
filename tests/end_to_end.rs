//! End-to-end tests through the `Db` facade

use areadb::storage::{Consistency, MockStore, Operation};
use areadb::{Db, DbConfig, ErrorKind, MemoryStore, TypeEntry};
use serde_json::{json, Value};
use std::collections::HashSet;

fn memory_db() -> Db {
    Db::new(Box::new(MemoryStore::new()), DbConfig::default())
}

fn type_names(types: &[TypeEntry]) -> HashSet<&str> {
    types.iter().map(|t| t.name.as_str()).collect()
}

#[tokio::test]
async fn test_token_to_list_scenario() -> areadb::Result<()> {
    let db = memory_db();

    let token = db.issue_token("user1", 60).await?;
    let session = db.resolve_token(&token.id).await?;
    assert_eq!(session.area().as_str(), "user1");

    let created = db
        .create(&session, "person", json!({"name": "Alice", "age": 44}))
        .await?;
    let id = created["id"].as_str().expect("id is a string").to_string();
    assert_eq!(created, json!({"id": id, "name": "Alice", "age": 44}));

    let listed = db.list(&session, "person", &json!({"eq": {"age": 44}})).await?;
    assert_eq!(listed, vec![created.clone()]);

    db.destroy(&session, "person", &json!({"id": id})).await?;
    assert!(db.list(&session, "person", &Value::Null).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_list_types_deduplicates() -> areadb::Result<()> {
    let db = memory_db();
    let session = db.issue_token("user1", 60).await?.session;

    for _ in 0..3 {
        db.create(&session, "person", json!({"name": "p"})).await?;
    }
    for _ in 0..2 {
        db.create(&session, "item", json!({"sku": "i"})).await?;
    }

    let types = db.list_types(&session).await?;
    assert_eq!(types.len(), 2);
    assert_eq!(type_names(&types), HashSet::from(["person", "item"]));
    Ok(())
}

#[tokio::test]
async fn test_areas_are_isolated() -> areadb::Result<()> {
    let db = memory_db();
    let alice = db.issue_token("alice", 60).await?.session;
    let bob = db.issue_token("bob", 60).await?.session;
    // "alice" is a prefix of this area's name
    let alice2 = db.issue_token("alice2", 60).await?.session;

    let secret = db.create(&alice, "note", json!({"text": "secret"})).await?;
    db.create(&alice2, "note", json!({"text": "other"})).await?;

    assert!(db.list(&bob, "note", &Value::Null).await?.is_empty());
    assert!(db.list_types(&bob).await?.is_empty());
    assert_eq!(db.list(&alice, "note", &Value::Null).await?, vec![secret.clone()]);
    assert_eq!(db.list_types(&alice).await?.len(), 1);

    let err = db.read(&bob, "note", &secret).await.unwrap_err();
    assert_eq!(err.code(), "G002");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_generated_ids_are_unique() -> areadb::Result<()> {
    let db = memory_db();
    let session = db.issue_token("bulk", 60).await?.session;

    let mut ids = HashSet::new();
    for n in 0..10_000 {
        let created = db.create(&session, "row", json!({"n": n})).await?;
        let id = created["id"].as_str().expect("id is a string").to_string();
        assert_eq!(id.len(), 32);
        ids.insert(id);
    }
    assert_eq!(ids.len(), 10_000);
    Ok(())
}

#[tokio::test]
async fn test_listing_spans_store_pages() -> areadb::Result<()> {
    let mut config = DbConfig::default();
    config.scan.page_size = 3;
    let db = Db::new(Box::new(MemoryStore::new()), config);
    let session = db.issue_token("user1", 60).await?.session;

    for n in 0..10 {
        db.create(&session, "person", json!({"n": n})).await?;
    }
    db.create(&session, "item", json!({})).await?;

    let found = db.list(&session, "person", &json!({"ge": {"n": 0}})).await?;
    assert_eq!(found.len(), 10);
    assert_eq!(db.list_types(&session).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_stale_listings() -> areadb::Result<()> {
    let store = MemoryStore::with_consistency(Consistency::StaleListings);
    let db = Db::new(Box::new(store.clone()), DbConfig::default());
    let session = db.issue_token("user1", 60).await?.session;

    let kept = db.create(&session, "person", json!({"name": "kept"})).await?;
    let gone = db.create(&session, "person", json!({"name": "gone"})).await?;
    let item = db.create(&session, "item", json!({})).await?;
    db.destroy(&session, "person", &gone).await?;
    db.destroy(&session, "item", &item).await?;

    // the deleted key is still listed but its value is skipped
    assert_eq!(db.list(&session, "person", &Value::Null).await?, vec![kept]);
    // the emptied type lingers in the catalog
    assert_eq!(
        type_names(&db.list_types(&session).await?),
        HashSet::from(["person", "item"])
    );

    store.converge();
    assert_eq!(
        type_names(&db.list_types(&session).await?),
        HashSet::from(["person"])
    );
    Ok(())
}

#[tokio::test]
async fn test_replace_then_read() -> areadb::Result<()> {
    let db = memory_db();
    let session = db.issue_token("user1", 60).await?.session;

    // without a prior value
    let fresh = json!({"id": "0011", "name": "new"});
    db.replace(&session, "person", fresh.clone()).await?;
    assert_eq!(db.read(&session, "person", &json!({"id": "0011"})).await?, fresh);

    // over an existing value
    let created = db.create(&session, "person", json!({"name": "old", "age": 1})).await?;
    let replaced = json!({"id": created["id"], "name": "newer"});
    db.replace(&session, "person", replaced.clone()).await?;
    assert_eq!(db.read(&session, "person", &created).await?, replaced);
    Ok(())
}

#[tokio::test]
async fn test_destroy_twice() -> areadb::Result<()> {
    let db = memory_db();
    let session = db.issue_token("user1", 60).await?.session;

    let created = db.create(&session, "person", json!({})).await?;
    db.destroy(&session, "person", &created).await?;
    db.destroy(&session, "person", &created).await?;
    Ok(())
}

#[tokio::test]
async fn test_create_with_id_writes_nothing() -> areadb::Result<()> {
    let store = MockStore::new();
    let db = Db::new(Box::new(store.clone()), DbConfig::default());
    let session = db.issue_token("user1", 60).await?.session;
    let puts = store.calls(Operation::Put);

    let err = db
        .create(&session, "person", json!({"id": "mine", "name": "x"}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "A002");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(store.calls(Operation::Put), puts);
    Ok(())
}

#[tokio::test]
async fn test_unknown_and_expired_tokens() -> areadb::Result<()> {
    let store = MemoryStore::new();
    let db = Db::new(Box::new(store.clone()), DbConfig::default());

    let err = db.resolve_token("ffffffffffffffffffffffffffffffff").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let token = db.issue_token("hidden-area", 60).await?;
    store.advance(chrono::Duration::seconds(120));
    let err = db.resolve_token(&token.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(!err.to_string().contains("hidden-area"));
    Ok(())
}

#[tokio::test]
async fn test_store_failures_surface_per_operation() -> areadb::Result<()> {
    let store = MockStore::new();
    let db = Db::new(Box::new(store.clone()), DbConfig::default());
    let session = db.issue_token("user1", 60).await?.session;
    let target = json!({"id": "abc"});

    store.fail(Operation::Put);
    assert_eq!(db.create(&session, "t", json!({})).await.unwrap_err().code(), "A003");
    assert_eq!(db.replace(&session, "t", target.clone()).await.unwrap_err().code(), "U002");
    assert_eq!(db.issue_token("user1", 60).await.unwrap_err().code(), "GT003");

    store.fail(Operation::Delete);
    assert_eq!(db.destroy(&session, "t", &target).await.unwrap_err().code(), "D002");

    store.fail(Operation::Get);
    assert_eq!(db.read(&session, "t", &target).await.unwrap_err().code(), "G004");
    assert_eq!(db.resolve_token("abc").await.unwrap_err().code(), "ST005");

    store.fail(Operation::List);
    assert_eq!(db.list(&session, "t", &Value::Null).await.unwrap_err().code(), "L002");
    assert_eq!(db.list_types(&session).await.unwrap_err().code(), "LS002");

    for op in [Operation::Put, Operation::Delete, Operation::Get, Operation::List] {
        store.heal(op);
    }
    assert!(db.list(&session, "t", &Value::Null).await?.is_empty());
    Ok(())
}
