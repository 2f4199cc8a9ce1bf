//! Secret store contract tests.
//!
//! Covers the structural guarantees the rotation protocol leans on: the
//! single pending slot, atomic promotion, and optimistic-concurrency
//! conflicts under racing writers.

mod support;
use support::Test;

use std::sync::Arc;
use std::thread;

use keyturn::core::store::{FilesystemStore, MemoryStore, SecretStore};
use keyturn::core::version::{Credential, SecretVersion};
use keyturn::error::{Error, StoreError};
use keyturn::{RotationToken, SecretId, Stage};

fn pending(token: &str) -> SecretVersion {
    SecretVersion::pending(
        Credential::new(format!("user-{token}"), format!("secret-{token}")),
        RotationToken::new(token),
    )
}

fn id() -> SecretId {
    SecretId::new("db-prod")
}

// --- Pending slot ---

#[test]
fn test_single_pending_slot_per_secret() {
    let store = MemoryStore::new();
    store.put(&id(), pending("t1")).unwrap();

    let err = store.put(&id(), pending("t2")).unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::AlreadyPending(_))));

    // Distinct secrets rotate independently.
    store.put(&SecretId::new("broker-sasl"), pending("t2")).unwrap();
}

#[test]
fn test_put_same_token_is_an_upsert() {
    let store = MemoryStore::new();
    let first = store.put(&id(), pending("t1")).unwrap();

    let mut retry = pending("t1");
    retry.applied_at = Some(chrono::Utc::now());
    let second = store.put(&id(), retry).unwrap();

    assert_eq!(first, second);
    let stored = store.get(&id(), Stage::Pending).unwrap();
    assert!(stored.is_applied());
}

// --- Promotion atomicity ---

#[test]
fn test_promotion_race_one_winner() {
    let store = Arc::new(MemoryStore::new());
    let vid = store.put(&id(), pending("t1")).unwrap();

    // Two callers race to finish the same rotation.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = Arc::clone(&store);
        let vid = vid.clone();
        handles.push(thread::spawn(move || {
            store.promote_and_demote(&id(), &vid).is_ok()
        }));
    }
    let outcomes: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Exactly one success and one conflict; never zero or two currents.
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    assert_eq!(store.list_by_stage(&id(), Stage::Current).unwrap().len(), 1);
    assert_eq!(store.list_by_stage(&id(), Stage::Pending).unwrap().len(), 0);
}

#[test]
fn test_promote_and_demote_is_one_step() {
    let store = MemoryStore::new();
    let v1 = store.put(&id(), pending("t1")).unwrap();
    store.promote_and_demote(&id(), &v1).unwrap();
    let v2 = store.put(&id(), pending("t2")).unwrap();
    store.promote_and_demote(&id(), &v2).unwrap();

    // No observable state ever has zero or two currents.
    assert_eq!(store.list_by_stage(&id(), Stage::Current).unwrap().len(), 1);
    assert_eq!(store.list_by_stage(&id(), Stage::Previous).unwrap().len(), 1);
    assert_eq!(
        store.get(&id(), Stage::Current).unwrap().version_id,
        v2
    );
}

#[test]
fn test_promote_unknown_version_conflicts() {
    let store = MemoryStore::new();
    store.put(&id(), pending("t1")).unwrap();

    let err = store
        .promote_and_demote(&id(), &"not-a-version".into())
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Conflict(_))));
}

// --- Filesystem backend ---

#[test]
fn test_fs_state_survives_process_boundary() {
    let env = Test::new();
    let dir = env.dir.path().join("store");

    let vid = {
        let store = FilesystemStore::open(dir.clone()).unwrap();
        store.put(&id(), pending("t1")).unwrap()
    };

    let store = FilesystemStore::open(dir).unwrap();
    let got = store.get(&id(), Stage::Pending).unwrap();
    assert_eq!(got.version_id, vid);
    assert_eq!(got.token, RotationToken::new("t1"));
}

#[test]
fn test_fs_concurrent_writers_conflict_not_clobber() {
    let env = Test::new();
    let dir = env.dir.path().join("store");

    let a = FilesystemStore::open(dir.clone()).unwrap();
    let b = FilesystemStore::open(dir).unwrap();

    let vid = a.put(&id(), pending("t1")).unwrap();
    b.promote_and_demote(&id(), &vid).unwrap();

    // Writer `a` lost the race; its follow-up sees the new state rather
    // than silently resurrecting the old one.
    let err = a.promote_and_demote(&id(), &vid).unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Conflict(_))));
    assert_eq!(a.list_by_stage(&id(), Stage::Current).unwrap().len(), 1);
}

#[test]
fn test_fs_unknown_secret_not_found() {
    let env = Test::new();
    let store = FilesystemStore::open(env.dir.path().join("store")).unwrap();
    let err = store.get(&SecretId::new("nope"), Stage::Current).unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::NotFound(_))));
}

// --- Retire ---

#[test]
fn test_retire_rejects_non_previous_stages() {
    let store = MemoryStore::new();
    let v1 = store.put(&id(), pending("t1")).unwrap();

    // Pending cannot be retired.
    assert!(store.retire(&id(), &v1).is_err());

    store.promote_and_demote(&id(), &v1).unwrap();
    // Current cannot be retired either.
    assert!(store.retire(&id(), &v1).is_err());

    let v2 = store.put(&id(), pending("t2")).unwrap();
    store.promote_and_demote(&id(), &v2).unwrap();
    store.retire(&id(), &v1).unwrap();

    let deprecated = store.list_by_stage(&id(), Stage::Deprecated).unwrap();
    assert_eq!(deprecated.len(), 1);
    assert_eq!(deprecated[0].version_id, v1);
}
