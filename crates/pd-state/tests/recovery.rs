//! Snapshot recovery tests
//!
//! Damaged primaries, failing writes and failing mirrors.

use std::fs;

use pd_core::{DrawPlan, EligibilityFilter, Participant, TicketNumber};
use pd_state::{
    BlobStore, DirectoryMirror, MirrorOutcome, SessionSnapshot, SnapshotStore, StoreConfig,
    StoreError,
};

// ═══════════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════════

fn roster(n: usize) -> Vec<Participant> {
    let filter = EligibilityFilter::default();
    (1..=n)
        .map(|i| {
            Participant::new(
                TicketNumber::padded(&i.to_string(), 3),
                format!("Peserta {}", i),
                format!("08{:09}", i),
                &filter,
            )
        })
        .collect()
}

fn session() -> SessionSnapshot {
    SessionSnapshot::new("Recovery Test", roster(20), DrawPlan::new(vec![]))
}

struct FailingMirror;

impl BlobStore for FailingMirror {
    fn label(&self) -> String {
        "failing".to_string()
    }

    fn put(&self, _name: &str, _bytes: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("remote unavailable")))
    }

    fn get(&self, _name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECOVERY
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_truncated_primary_falls_back_to_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(StoreConfig::in_dir(dir.path()));

    let mut snap = session();
    snap.touch();
    store.save(&snap).unwrap();
    snap.pool.pop();
    snap.eligible.pop();
    snap.touch();
    store.save(&snap).unwrap();

    // Simulate a torn write of the primary copy
    let primary = store.primary_path();
    let bytes = fs::read(&primary).unwrap();
    fs::write(&primary, &bytes[..bytes.len() / 2]).unwrap();

    let recovered = store.load_latest().unwrap().unwrap();
    assert_eq!(recovered.sequence, 2);
    assert_eq!(recovered.pool, snap.pool);
}

#[test]
fn test_all_copies_corrupt_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        history_limit: 1,
        ..StoreConfig::in_dir(dir.path())
    };
    let store = SnapshotStore::new(config);

    let mut snap = session();
    snap.touch();
    store.save(&snap).unwrap();

    fs::write(store.primary_path(), b"{").unwrap();
    for entry in fs::read_dir(store.history_dir()).unwrap() {
        fs::write(entry.unwrap().path(), b"not json").unwrap();
    }

    assert!(matches!(
        store.load_latest(),
        Err(StoreError::NoValidSnapshot)
    ));
}

#[test]
fn test_unwritable_directory_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the snapshot directory should be
    let blocker = dir.path().join("blocked");
    fs::write(&blocker, b"").unwrap();

    let config = StoreConfig {
        retries: 2,
        ..StoreConfig::in_dir(&blocker)
    };
    let store = SnapshotStore::new(config);

    match store.save(&session()) {
        Err(StoreError::WriteFailed { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected WriteFailed, got {:?}", other.map(|r| r.path)),
    }
}

#[test]
fn test_mirror_failure_does_not_block_local_save() {
    let dir = tempfile::tempdir().unwrap();
    let store =
        SnapshotStore::new(StoreConfig::in_dir(dir.path())).with_mirror(Box::new(FailingMirror));

    let mut snap = session();
    snap.touch();
    let report = store.save(&snap).unwrap();

    assert!(matches!(report.mirror, MirrorOutcome::Failed { .. }));
    assert_eq!(store.load_latest().unwrap().unwrap(), snap);
}

#[test]
fn test_directory_mirror_receives_copy() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        mirror_dir: Some(dir.path().join("mirror")),
        ..StoreConfig::in_dir(dir.path().join("local"))
    };
    let store = SnapshotStore::new(config);

    let mut snap = session();
    snap.touch();
    let report = store.save(&snap).unwrap();

    let MirrorOutcome::Mirrored { name } = report.mirror else {
        panic!("mirror was not written");
    };
    assert!(name.starts_with("Recovery-Test_"));

    let mirror = DirectoryMirror::new(dir.path().join("mirror"));
    let copy = mirror.get(&name).unwrap().unwrap();
    assert_eq!(copy, fs::read(store.primary_path()).unwrap());
}

#[test]
fn test_clear_removes_every_copy() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(StoreConfig::in_dir(dir.path()));

    let mut snap = session();
    for _ in 0..3 {
        snap.touch();
        store.save(&snap).unwrap();
    }

    assert_eq!(store.clear().unwrap(), 4);
    assert!(!store.exists());
    assert!(store.load_latest().unwrap().is_none());
}
