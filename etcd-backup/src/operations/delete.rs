use crate::config::BackupConfig;
use crate::errors::{BackupError, Result};
use crate::naming::{match_key, object_key, snapshot_name};
use crate::storage::local::remove_file;
use crate::storage::{ObjectKey, ObjectStore};
use futures::TryStreamExt;
use std::path::PathBuf;
use tracing::info;

/// What a delete command removed from each tier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub local: Vec<PathBuf>,
    pub remote: Vec<String>,
}

/// Delete `name` locally, then from `store` when one is given
///
/// `cleanup` only tidies the raw file left behind after archiving; it never
/// touches the object store.
pub async fn delete_snapshot(
    config: &BackupConfig,
    store: Option<&dyn ObjectStore>,
    name: &str,
    cleanup: bool,
) -> Result<DeleteReport> {
    let name = snapshot_name(name)?;
    let mut report = DeleteReport {
        local: delete_local(config, name, cleanup).await?,
        remote: Vec::new(),
    };
    info!("✓ Removed {} local file(s) for {}", report.local.len(), name);

    if cleanup {
        return Ok(report);
    }
    if let Some(store) = store {
        report.remote = delete_remote(store, &config.s3.folder, name).await?;
        info!("✓ Removed {} object(s) for {}", report.remote.len(), name);
    }
    Ok(report)
}

/// Remove the raw and archived copies of `name`
///
/// With `cleanup`, only the raw file goes, and only once its archive exists.
pub async fn delete_local(config: &BackupConfig, name: &str, cleanup: bool) -> Result<Vec<PathBuf>> {
    let raw = config.snapshot_path(name);
    let archive = config.archive_path(name);

    let targets = if cleanup {
        if !tokio::fs::try_exists(&archive).await.unwrap_or(false) {
            info!(
                "Archive {} not found, keeping {}",
                archive.display(),
                raw.display()
            );
            return Ok(Vec::new());
        }
        vec![raw]
    } else {
        vec![raw, archive]
    };

    let mut removed = Vec::new();
    for path in targets {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            remove_file(&path).await?;
            removed.push(path);
        }
    }
    Ok(removed)
}

/// Remove every object under `folder` that resolves to `name`, compressed or not
pub async fn delete_remote(store: &dyn ObjectStore, folder: &str, name: &str) -> Result<Vec<String>> {
    let requested = object_key(folder, name);
    let listed: Vec<ObjectKey> = store.list(&requested, false).try_collect().await?;

    let mut removed = Vec::new();
    let mut failed = Vec::new();
    for object in listed {
        let Some(resolved) = match_key(&object.key, &requested) else {
            continue;
        };
        match store.remove(&resolved.key).await {
            Ok(()) => removed.push(resolved.key),
            Err(_) => failed.push(resolved.key),
        }
    }

    if !failed.is_empty() {
        return Err(BackupError::PartialDeletion { failed });
    }
    if removed.is_empty() {
        return Err(BackupError::NotFound(format!("snapshot [{}]", requested)));
    }
    Ok(removed)
}
