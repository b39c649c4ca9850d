use super::*;
use crate::test_helpers::{session_for, user};

// =============================================================================
// MemorySessionStore
// =============================================================================

#[test]
fn memory_store_round_trips_and_clears() {
    let store = MemorySessionStore::default();
    assert!(store.load().unwrap().is_none());

    let session = session_for(user("u1", "a@b.com"));
    store.save(&session).unwrap();
    assert_eq!(store.load().unwrap(), Some(session));

    store.clear().unwrap();
    assert!(store.load().unwrap().is_none());
}

// =============================================================================
// FileSessionStore
// =============================================================================

#[test]
fn file_store_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(dir.path().join("session.json"));
    assert!(store.load().unwrap().is_none());
}

#[test]
fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");
    let mut session = session_for(user("u1", "a@b.com"));
    session.expires_at = Some(1_700_000_000);

    FileSessionStore::new(path.clone()).save(&session).unwrap();
    let loaded = FileSessionStore::new(path).load().unwrap();
    assert_eq!(loaded, Some(session));
}

#[test]
fn file_store_clear_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(dir.path().join("session.json"));
    store.save(&session_for(user("u1", "a@b.com"))).unwrap();

    store.clear().unwrap();
    store.clear().unwrap();
    assert!(!store.path().exists());
}

#[test]
fn file_store_corrupt_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "not json").unwrap();

    let err = FileSessionStore::new(path).load().unwrap_err();
    assert!(matches!(err, BackendError::Store(_)));
}

// =============================================================================
// store_for
// =============================================================================

#[test]
fn store_for_uses_file_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let mut config = BackendConfig::new("https://proj.example.co", "anon");
    config.session_file = Some(path.clone());

    store_for(&config).save(&session_for(user("u1", "a@b.com"))).unwrap();
    assert!(path.exists());
}

#[test]
fn store_for_defaults_to_memory() {
    let config = BackendConfig::new("https://proj.example.co", "anon");
    let store = store_for(&config);
    store.save(&session_for(user("u1", "a@b.com"))).unwrap();
    assert_eq!(store.load().unwrap().unwrap().user.id, "u1");
}
