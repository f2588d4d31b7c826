//! Retention Enforcer Tests
//!
//! Both tiers delete entries stamped strictly before `reference - retention`
//! and keep everything at or after the cutoff. Unparseable names and
//! directories are skipped, and a single failed deletion never aborts a sweep.

mod common;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use common::fixtures::*;
use etcd_backup::naming::scheduled_name;
use etcd_backup::snapshot::retention::{enforce_local, enforce_named, enforce_remote};
use etcd_backup::storage::LocalTier;
use etcd_backup::BackupError;
use std::sync::atomic::Ordering;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

fn tick() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn name_at(offset: TimeDelta) -> String {
    scheduled_name(tick() + offset)
}

#[tokio::test]
async fn test_scheduled_tick_prunes_only_files_before_cutoff() {
    let layout = test_layout();
    let old = name_at(TimeDelta::minutes(-120));
    let just_old = name_at(TimeDelta::minutes(-61));
    let boundary = name_at(TimeDelta::minutes(-60));
    let recent = name_at(TimeDelta::minutes(-30));

    layout.write_backup(&format!("{}.zip", old), b"zip");
    layout.write_backup(&old, b"raw");
    layout.write_backup(&format!("{}.zip", just_old), b"zip");
    layout.write_backup(&format!("{}.zip", boundary), b"zip");
    layout.write_backup(&format!("{}.zip", recent), b"zip");
    layout.write_backup("c-xyz-backup1.zip", b"manual");
    std::fs::create_dir(layout.backup_file("2020-01-01T00:00:00Z_etcd.d")).unwrap();

    let tier = LocalTier::new(&layout.config.backup_dir);
    let report = enforce_local(&tier, tick(), HOUR).await.unwrap();

    let mut deleted = report.deleted.clone();
    deleted.sort();
    assert_eq!(
        deleted,
        vec![old.clone(), format!("{}.zip", old), format!("{}.zip", just_old)]
    );
    assert!(report.failed.is_empty());
    assert!(report.skipped.contains(&"c-xyz-backup1.zip".to_string()));
    assert!(report.skipped.contains(&"2020-01-01T00:00:00Z_etcd.d".to_string()));

    assert_eq!(
        layout.backup_names(),
        vec![
            "2020-01-01T00:00:00Z_etcd.d".to_string(),
            format!("{}.zip", boundary),
            format!("{}.zip", recent),
            "c-xyz-backup1.zip".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_local_retention_missing_directory_is_an_error() {
    let layout = test_layout();
    let tier = LocalTier::new(layout.dir.path().join("missing"));
    let result = enforce_local(&tier, tick(), HOUR).await;
    assert!(matches!(result, Err(BackupError::Io { .. })));
}

#[tokio::test]
async fn test_remote_retention_uses_full_keys_under_folder() {
    let store = MemoryObjectStore::new("snapshots");
    let old = format!("cluster-a/{}.zip", name_at(TimeDelta::hours(-3)));
    let boundary = format!("cluster-a/{}.zip", name_at(TimeDelta::hours(-1)));
    let recent = format!("cluster-a/{}", name_at(TimeDelta::minutes(-5)));
    let other_folder = format!("cluster-b/{}.zip", name_at(TimeDelta::hours(-3)));
    for key in [&old, &boundary, &recent, &other_folder] {
        store.insert(key, b"zip");
    }
    store.insert("cluster-a/c-xyz-backup1.zip", b"manual");
    store.insert("cluster-a/garbage_etcd.zip", b"junk");

    let report = enforce_remote(&store, "cluster-a", tick(), HOUR).await.unwrap();

    assert_eq!(report.deleted, vec![old.clone()]);
    assert_eq!(report.skipped, vec!["cluster-a/garbage_etcd.zip".to_string()]);
    assert_eq!(
        store.keys(),
        vec![
            boundary,
            recent,
            "cluster-a/c-xyz-backup1.zip".to_string(),
            "cluster-a/garbage_etcd.zip".to_string(),
            other_folder,
        ]
    );
}

#[tokio::test]
async fn test_remote_retention_without_folder() {
    let store = MemoryObjectStore::new("snapshots");
    let old = format!("{}.zip", name_at(TimeDelta::hours(-30)));
    let nested = format!("nested/{}.zip", name_at(TimeDelta::hours(-30)));
    store.insert(&old, b"zip");
    store.insert(&nested, b"zip");

    let report = enforce_remote(&store, "", tick(), Duration::from_secs(24 * 3600))
        .await
        .unwrap();
    assert_eq!(report.deleted, vec![old]);
    assert_eq!(store.keys(), vec![nested]);
}

#[tokio::test]
async fn test_remote_retention_continues_after_failed_removal() {
    let store = MemoryObjectStore::new("snapshots");
    let first = format!("cluster-a/{}.zip", name_at(TimeDelta::hours(-5)));
    let second = format!("cluster-a/{}.zip", name_at(TimeDelta::hours(-4)));
    store.insert(&first, b"zip");
    store.insert(&second, b"zip");
    store.fail_removal_of(&first);

    let report = enforce_remote(&store, "cluster-a", tick(), HOUR).await.unwrap();
    assert_eq!(report.failed, vec![first.clone()]);
    assert_eq!(report.deleted, vec![second]);
    assert_eq!(store.keys(), vec![first.clone()]);

    assert!(matches!(
        report.into_result(),
        Err(BackupError::PartialDeletion { failed }) if failed == vec![first]
    ));
}

#[tokio::test]
async fn test_remote_listing_error_deletes_nothing() {
    let store = MemoryObjectStore::new("snapshots");
    let old = format!("cluster-a/{}.zip", name_at(TimeDelta::hours(-5)));
    store.insert(&old, b"zip");
    store.fail_list.store(true, Ordering::SeqCst);

    let result = enforce_remote(&store, "cluster-a", tick(), HOUR).await;
    assert!(matches!(result, Err(BackupError::List { .. })));
    assert_eq!(store.keys(), vec![old]);
}

#[tokio::test]
async fn test_named_retention_spares_manual_snapshots() {
    let layout = test_layout();
    let day = Duration::from_secs(24 * 3600);

    let old_recurring = layout.write_backup("c-abc123-rl-2024-05-01.zip", b"zip");
    let old_manual = layout.write_backup("c-abc123-ml-before-upgrade.zip", b"zip");
    let new_recurring = layout.write_backup("c-abc123-rl-2024-06-01.zip", b"zip");
    let other_cluster = layout.write_backup("c-def456-rl-2024-05-01.zip", b"zip");
    for path in [&old_recurring, &old_manual, &other_cluster] {
        set_age(path, 2 * day);
    }
    set_age(&new_recurring, HOUR);

    let tier = LocalTier::new(&layout.config.backup_dir);
    let report = enforce_named(&tier, "c-abc123-", Utc::now(), day).await.unwrap();

    assert_eq!(report.deleted, vec!["c-abc123-rl-2024-05-01.zip".to_string()]);
    assert_eq!(report.skipped, vec!["c-abc123-ml-before-upgrade.zip".to_string()]);
    assert!(!old_recurring.exists());
    assert!(old_manual.exists());
    assert!(new_recurring.exists());
    assert!(other_cluster.exists());
}
