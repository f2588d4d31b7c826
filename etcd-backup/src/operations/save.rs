use crate::config::BackupConfig;
use crate::errors::Result;
use crate::naming::name_prefix;
use crate::scheduler::RollingBackupScheduler;
use crate::snapshot::cluster_state::ClusterStateSource;
use crate::snapshot::retention::enforce_named;
use crate::snapshot::{upload_snapshot, CreatedSnapshot, CreationPipeline, RetentionReport, SnapshotTool, UploadOutcome};
use crate::storage::{LocalTier, ObjectStoreConnector};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a one-shot save
#[derive(Debug, Clone)]
pub struct OnceReport {
    pub snapshot: CreatedSnapshot,
    pub upload: Option<UploadOutcome>,
    pub named_retention: Option<RetentionReport>,
}

/// Create `name` once, upload it if enabled, then prune older recurring snapshots of the same cluster
///
/// Only creation failures are returned; a failed upload leaves a usable local snapshot.
pub async fn save_once(
    config: Arc<BackupConfig>,
    name: &str,
    tool: Arc<dyn SnapshotTool>,
    connector: &dyn ObjectStoreConnector,
) -> Result<OnceReport> {
    let pipeline = CreationPipeline::new(tool, config.clone());
    let snapshot = pipeline.create(name).await?;

    let mut report = OnceReport {
        snapshot,
        upload: None,
        named_retention: None,
    };

    if config.s3.enabled {
        let uploaded = match connector.connect(&config.s3).await {
            Ok(store) => upload_snapshot(store.as_ref(), &config.s3.folder, &report.snapshot.archive_path).await,
            Err(e) => Err(e),
        };
        match uploaded {
            Ok(outcome) => report.upload = Some(outcome),
            Err(e) => warn!(name, error = %e, "Upload failed, snapshot kept locally"),
        }
    }

    let retention = config.schedule.retention;
    if retention.is_zero() {
        return Ok(report);
    }
    let Some(prefix) = name_prefix(name) else {
        info!("Snapshot {} has no cluster prefix, skipping named retention", name);
        return Ok(report);
    };

    let local = LocalTier::new(config.backup_dir.clone());
    match enforce_named(&local, prefix, Utc::now(), retention).await {
        Ok(named) => report.named_retention = Some(named),
        Err(e) => warn!(name, error = %e, "Named retention failed"),
    }

    Ok(report)
}

/// Run scheduled cycles until interrupted
pub async fn save_rolling(
    config: Arc<BackupConfig>,
    tool: Arc<dyn SnapshotTool>,
    cluster_state: Arc<dyn ClusterStateSource>,
    connector: Arc<dyn ObjectStoreConnector>,
) -> Result<()> {
    config.require_schedule()?;
    RollingBackupScheduler::new(config, tool, cluster_state, connector)
        .run()
        .await
}
