//! Periodic snapshot cycles.
//!
//! One cycle runs to completion, including every retry, before the next tick is
//! awaited, so cycles never overlap.

use crate::config::BackupConfig;
use crate::errors::Result;
use crate::naming::scheduled_name;
use crate::snapshot::cluster_state::{retrieve_and_write_state_file, ClusterStateSource};
use crate::snapshot::retention::{enforce_local, enforce_remote};
use crate::snapshot::{upload_snapshot, CreatedSnapshot, CreationPipeline, RetentionReport, SnapshotTool, UploadOutcome};
use crate::storage::{LocalTier, ObjectStoreConnector};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// What one scheduled cycle achieved beyond creating the snapshot
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: CreatedSnapshot,
    pub local_retention: Option<RetentionReport>,
    pub upload: Option<UploadOutcome>,
    pub remote_retention: Option<RetentionReport>,
}

pub struct RollingBackupScheduler {
    config: Arc<BackupConfig>,
    pipeline: CreationPipeline,
    cluster_state: Arc<dyn ClusterStateSource>,
    connector: Arc<dyn ObjectStoreConnector>,
    local: LocalTier,
}

impl RollingBackupScheduler {
    pub fn new(
        config: Arc<BackupConfig>,
        tool: Arc<dyn SnapshotTool>,
        cluster_state: Arc<dyn ClusterStateSource>,
        connector: Arc<dyn ObjectStoreConnector>,
    ) -> Self {
        Self {
            pipeline: CreationPipeline::new(tool, config.clone()),
            local: LocalTier::new(config.backup_dir.clone()),
            config,
            cluster_state,
            connector,
        }
    }

    /// Tick until Ctrl-C is received
    pub async fn run(&self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Tick until `shutdown` resolves; an in-flight cycle is finished first
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let period = self.config.schedule.creation;
        info!(
            "Starting rolling backups every {} with retention {}",
            humantime::format_duration(period),
            humantime::format_duration(self.config.schedule.retention)
        );

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping rolling backups");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    // Creation failures only end this cycle
                    let _ = self.run_cycle(Utc::now()).await;
                }
            }
        }
    }

    /// One full cycle for the snapshot named after `tick`
    pub async fn run_cycle(&self, tick: DateTime<Utc>) -> Result<CycleReport> {
        let name = scheduled_name(tick);
        info!("Starting scheduled snapshot {}", name);

        let state_path = self.config.state_file_path(&name);
        if let Err(e) =
            retrieve_and_write_state_file(self.cluster_state.as_ref(), &state_path, &self.config.retry)
                .await
        {
            warn!(name = %name, error = %e, "Cluster state not captured, continuing without it");
        }

        let snapshot = match self.pipeline.create(&name).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(name = %name, error = %e, "Scheduled snapshot failed");
                return Err(e);
            }
        };

        let retention = self.config.schedule.retention;
        let local_retention = match enforce_local(&self.local, tick, retention).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Local retention failed");
                None
            }
        };

        let mut report = CycleReport {
            snapshot,
            local_retention,
            upload: None,
            remote_retention: None,
        };

        if !self.config.s3.enabled {
            return Ok(report);
        }

        let store = match self.connector.connect(&self.config.s3).await {
            Ok(store) => store,
            Err(e) => {
                warn!(name = %name, error = %e, "Object store unavailable, keeping snapshot local only");
                return Ok(report);
            }
        };

        match upload_snapshot(store.as_ref(), &self.config.s3.folder, &report.snapshot.archive_path).await {
            Ok(outcome) => report.upload = Some(outcome),
            Err(e) => {
                warn!(name = %name, error = %e, "Upload failed, skipping remote retention");
                return Ok(report);
            }
        }

        match enforce_remote(store.as_ref(), &self.config.s3.folder, tick, retention).await {
            Ok(remote) => report.remote_retention = Some(remote),
            Err(e) => warn!(error = %e, "Remote retention failed"),
        }

        Ok(report)
    }
}
