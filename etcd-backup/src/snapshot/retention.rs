//! Age-based pruning of both storage tiers.
//!
//! Every sweep is best-effort: entries that cannot be parsed are skipped, and a
//! failed deletion is recorded without stopping the rest of the batch. Entries
//! stamped exactly at the cutoff are kept.

use crate::errors::{BackupError, Result};
use crate::naming::{is_recurring_snapshot, is_scheduled_key, parse_snapshot_time, strip_folder};
use crate::storage::{LocalTier, ObjectKey, ObjectStore};
use chrono::{DateTime, TimeDelta, Utc};
use futures::TryStreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub deleted: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl RetentionReport {
    /// `PartialDeletion` when any deletion failed
    pub fn into_result(self) -> Result<Self> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(BackupError::PartialDeletion {
                failed: self.failed,
            })
        }
    }
}

pub fn cutoff(reference: DateTime<Utc>, retention: Duration) -> DateTime<Utc> {
    let retention = TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX);
    reference
        .checked_sub_signed(retention)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Delete local snapshots whose embedded timestamp is before the cutoff
pub async fn enforce_local(
    tier: &LocalTier,
    reference: DateTime<Utc>,
    retention: Duration,
) -> Result<RetentionReport> {
    let cutoff = cutoff(reference, retention);
    info!(
        "Running local retention in {} (cutoff {})",
        tier.root().display(),
        cutoff
    );

    let mut report = RetentionReport::default();
    for entry in tier.entries().await? {
        if entry.is_dir {
            info!("Skipping directory {}", entry.name);
            report.skipped.push(entry.name);
            continue;
        }

        let created = match parse_snapshot_time(&entry.name) {
            Ok(created) => created,
            Err(e) => {
                info!(name = %entry.name, error = %e, "Skipping file without snapshot timestamp");
                report.skipped.push(entry.name);
                continue;
            }
        };

        if created >= cutoff {
            continue;
        }

        match tier.remove(&entry.name).await {
            Ok(()) => report.deleted.push(entry.name),
            Err(e) => {
                warn!(name = %entry.name, error = %e, "Failed to delete expired snapshot");
                report.failed.push(entry.name);
            }
        }
    }

    Ok(report)
}

/// Delete scheduled snapshots under `folder` whose embedded timestamp is before the cutoff
///
/// The full listing is collected before anything is deleted, so a listing error
/// aborts the sweep with no deletions.
pub async fn enforce_remote(
    store: &dyn ObjectStore,
    folder: &str,
    reference: DateTime<Utc>,
    retention: Duration,
) -> Result<RetentionReport> {
    let cutoff = cutoff(reference, retention);
    let folder = folder.trim_end_matches('/');
    let (prefix, recursive) = if folder.is_empty() {
        (String::new(), false)
    } else {
        (format!("{}/", folder), true)
    };
    info!(
        "Running remote retention in [{}/{}] (cutoff {})",
        store.bucket(),
        prefix,
        cutoff
    );

    let keys: Vec<ObjectKey> = store.list(&prefix, recursive).try_collect().await?;

    let mut report = RetentionReport::default();
    for object in keys {
        if !is_scheduled_key(&object.key) {
            debug!("Ignoring non-scheduled object {}", object.key);
            continue;
        }

        let name = strip_folder(folder, &object.key);
        let created = match parse_snapshot_time(name) {
            Ok(created) => created,
            Err(e) => {
                info!(key = %object.key, error = %e, "Skipping object without snapshot timestamp");
                report.skipped.push(object.key);
                continue;
            }
        };

        if created >= cutoff {
            continue;
        }

        match store.remove(&object.key).await {
            Ok(()) => report.deleted.push(object.key),
            Err(_) => report.failed.push(object.key),
        }
    }

    Ok(report)
}

/// Delete old scheduler-produced local files sharing a cluster prefix
///
/// Uses file modification times and only touches names carrying the recurring
/// marker, so manual snapshots with the same prefix are never pruned.
pub async fn enforce_named(
    tier: &LocalTier,
    prefix: &str,
    reference: DateTime<Utc>,
    retention: Duration,
) -> Result<RetentionReport> {
    let cutoff = cutoff(reference, retention);
    info!(
        "Running named retention for prefix {} (cutoff {})",
        prefix, cutoff
    );

    let mut report = RetentionReport::default();
    for entry in tier.entries().await? {
        if entry.is_dir || !entry.name.starts_with(prefix) {
            continue;
        }
        if !is_recurring_snapshot(&entry.name) {
            debug!("Keeping manual snapshot {}", entry.name);
            report.skipped.push(entry.name);
            continue;
        }
        if DateTime::<Utc>::from(entry.modified) >= cutoff {
            continue;
        }

        match tier.remove(&entry.name).await {
            Ok(()) => report.deleted.push(entry.name),
            Err(e) => {
                warn!(name = %entry.name, error = %e, "Failed to delete expired snapshot");
                report.failed.push(entry.name);
            }
        }
    }

    Ok(report)
}
