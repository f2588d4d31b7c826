//! Upload De-duplication Guard Tests
//!
//! An archive whose key already exists in an unversioned bucket is not
//! uploaded again. When versioning is on, or when either probe fails, the
//! upload goes ahead: an extra copy is preferred over a missed backup.

mod common;

use common::fixtures::*;
use etcd_backup::snapshot::{upload_snapshot, UploadOutcome};
use etcd_backup::BackupError;
use std::sync::atomic::Ordering;

const KEY: &str = "cluster-a/2024-06-01T12:00:00Z_etcd.zip";

fn archive_in(layout: &TestLayout) -> std::path::PathBuf {
    layout.write_backup("2024-06-01T12:00:00Z_etcd.zip", b"new archive bytes")
}

#[tokio::test]
async fn test_new_key_is_uploaded_under_folder() {
    let layout = test_layout();
    let store = MemoryObjectStore::new("snapshots");

    let outcome = upload_snapshot(&store, "cluster-a", &archive_in(&layout)).await.unwrap();

    assert_eq!(outcome, UploadOutcome::Uploaded { key: KEY.to_string() });
    assert_eq!(store.content(KEY).unwrap(), b"new archive bytes");
    assert_eq!(store.put_count(), 1);
}

#[tokio::test]
async fn test_existing_key_in_unversioned_bucket_is_skipped() {
    let layout = test_layout();
    let store = MemoryObjectStore::new("snapshots");
    store.insert(KEY, b"original");

    let outcome = upload_snapshot(&store, "cluster-a", &archive_in(&layout)).await.unwrap();

    assert_eq!(outcome, UploadOutcome::SkippedExisting { key: KEY.to_string() });
    assert_eq!(store.put_count(), 0, "no network write expected");
    assert_eq!(store.content(KEY).unwrap(), b"original");
}

#[tokio::test]
async fn test_existing_key_in_versioned_bucket_is_uploaded() {
    let layout = test_layout();
    let store = MemoryObjectStore::new("snapshots");
    store.insert(KEY, b"original");
    store.set_versioning(Ok(true));

    let outcome = upload_snapshot(&store, "cluster-a", &archive_in(&layout)).await.unwrap();

    assert_eq!(outcome.key(), KEY);
    assert!(matches!(outcome, UploadOutcome::Uploaded { .. }));
    assert_eq!(store.put_count(), 1);
}

#[tokio::test]
async fn test_versioning_probe_error_uploads_anyway() {
    let layout = test_layout();
    let store = MemoryObjectStore::new("snapshots");
    store.insert(KEY, b"original");
    store.set_versioning(Err("AccessDenied"));

    let outcome = upload_snapshot(&store, "cluster-a", &archive_in(&layout)).await.unwrap();

    assert!(matches!(outcome, UploadOutcome::Uploaded { .. }));
    assert_eq!(store.content(KEY).unwrap(), b"new archive bytes");
}

#[tokio::test]
async fn test_existence_probe_error_uploads_anyway() {
    let layout = test_layout();
    let store = MemoryObjectStore::new("snapshots");
    store.insert(KEY, b"original");
    store.fail_stat.store(true, Ordering::SeqCst);

    let outcome = upload_snapshot(&store, "cluster-a", &archive_in(&layout)).await.unwrap();

    assert!(matches!(outcome, UploadOutcome::Uploaded { .. }));
    assert_eq!(store.put_count(), 1);
}

#[tokio::test]
async fn test_exhausted_upload_surfaces_error() {
    let layout = test_layout();
    let store = MemoryObjectStore::new("snapshots");
    store.fail_put.store(true, Ordering::SeqCst);

    let err = upload_snapshot(&store, "", &archive_in(&layout)).await.unwrap_err();
    match err {
        BackupError::Upload { key, .. } => assert_eq!(key, "2024-06-01T12:00:00Z_etcd.zip"),
        other => panic!("unexpected error: {other}"),
    }
}
