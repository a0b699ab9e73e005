//! Integration tests for the storage components
//!
//! These tests verify that snapshot-backed storage survives a reopen and
//! that change events are routed between contexts the way the session
//! layer depends on.

use std::path::PathBuf;
use std::time::Duration;

use common::storage::{SharedStorage, StorageConfig};
use tokio::time::timeout;
use uuid::Uuid;

fn temp_snapshot_path() -> PathBuf {
    std::env::temp_dir().join(format!("yessgo-storage-{}.json", Uuid::new_v4()))
}

/// Test that a snapshot-backed store persists entries across a reopen
#[test]
fn test_snapshot_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let path = temp_snapshot_path();
    let config = StorageConfig {
        snapshot_path: Some(path.clone()),
        event_capacity: 64,
    };

    {
        let storage = SharedStorage::open(&config)?;
        let context = storage.context();
        context.set("token", "tok1");
        context.set("user", r#"{"id":"u1"}"#);
        context.set("scratch", "gone");
        context.remove("scratch");
    }

    // Reopen from the snapshot file, as after a restart
    let storage = SharedStorage::open(&config)?;
    let context = storage.context();
    assert_eq!(context.get("token"), Some("tok1".to_string()));
    assert_eq!(context.get("user"), Some(r#"{"id":"u1"}"#.to_string()));
    assert_eq!(context.get("scratch"), None);

    std::fs::remove_file(&path)?;
    Ok(())
}

/// Test that a corrupt snapshot file opens as empty storage
#[test]
fn test_corrupt_snapshot_starts_empty() -> Result<(), Box<dyn std::error::Error>> {
    let path = temp_snapshot_path();
    std::fs::write(&path, "not json at all")?;

    let config = StorageConfig {
        snapshot_path: Some(path.clone()),
        event_capacity: 64,
    };

    let storage = SharedStorage::open(&config)?;
    assert_eq!(storage.context().get("token"), None);

    std::fs::remove_file(&path)?;
    Ok(())
}

/// Test that changes made in one context reach the others, but never the
/// writer itself
#[tokio::test]
async fn test_cross_context_event_delivery() -> Result<(), Box<dyn std::error::Error>> {
    let storage = SharedStorage::in_memory();
    let tab_a = storage.context();
    let tab_b = storage.context();

    let mut a_events = tab_a.subscribe();
    let mut b_events = tab_b.subscribe();

    tab_a.set("token", "tok1");

    let event = timeout(Duration::from_secs(1), b_events.recv()).await?.unwrap();
    assert_eq!(event.key, "token");
    assert_eq!(event.new_value, Some("tok1".to_string()));

    // The writing context gets nothing back for its own write
    tab_b.set("user", r#"{"id":"u1"}"#);
    let event = timeout(Duration::from_secs(1), a_events.recv()).await?.unwrap();
    assert_eq!(event.key, "user");

    // Removal is delivered as an absent value
    tab_a.remove("token");
    let event = timeout(Duration::from_secs(1), b_events.recv()).await?.unwrap();
    assert_eq!(event.key, "token");
    assert_eq!(event.new_value, None);

    Ok(())
}

/// Test that untracked writes never produce events but are readable
#[tokio::test]
async fn test_untracked_writes_are_silent() -> Result<(), Box<dyn std::error::Error>> {
    let storage = SharedStorage::in_memory();
    let tab = storage.context();
    let mut events = tab.subscribe();

    storage.set_untracked("token", "tok1");
    storage.remove_untracked("token");
    storage.set_untracked("user", r#"{"id":"u1"}"#);

    assert_eq!(tab.get("user"), Some(r#"{"id":"u1"}"#.to_string()));

    let delivery = timeout(Duration::from_millis(100), events.recv()).await;
    assert!(delivery.is_err(), "untracked writes must not emit events");

    Ok(())
}
