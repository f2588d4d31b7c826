use super::tool::SnapshotTool;
use crate::archive;
use crate::config::BackupConfig;
use crate::constants::etcd::UNHEALTHY_MARKER;
use crate::errors::{BackupError, Result};
use crate::storage::local::{harden_permissions, remove_file};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Archive produced by a successful creation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSnapshot {
    pub name: String,
    pub archive_path: PathBuf,
    pub bundled_state: bool,
}

/// Health check, save, bundle, archive, cleanup, and harden as one retried unit
pub struct CreationPipeline {
    tool: Arc<dyn SnapshotTool>,
    config: Arc<BackupConfig>,
    max_attempts: u32,
    retry_interval: Duration,
}

impl CreationPipeline {
    pub fn new(tool: Arc<dyn SnapshotTool>, config: Arc<BackupConfig>) -> Self {
        Self {
            max_attempts: config.retry.backup_attempts.max(1),
            retry_interval: config.retry.failure_interval,
            tool,
            config,
        }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Run attempts until one succeeds; the last attempt's error is returned
    pub async fn create(&self, name: &str) -> Result<CreatedSnapshot> {
        let mut attempt = 1;
        loop {
            match self.attempt(name).await {
                Ok(created) => {
                    info!(
                        "✓ Snapshot {} created at {} (attempt {}/{})",
                        name,
                        created.archive_path.display(),
                        attempt,
                        self.max_attempts
                    );
                    return Ok(created);
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(attempt, name, error = %e, "Snapshot attempt failed, retrying");
                    tokio::time::sleep(self.retry_interval).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempt, name, error = %e, "Snapshot creation failed, giving up");
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self, name: &str) -> Result<CreatedSnapshot> {
        debug!("Step 1: Checking endpoint health");
        let health = self.tool.health().await?;
        if !health.success || health.output.contains(UNHEALTHY_MARKER) {
            return Err(BackupError::ToolInvocation {
                action: "endpoint health check".to_string(),
                output: health.output,
            });
        }

        debug!("Step 2: Saving snapshot {}", name);
        let snapshot_path = self.config.snapshot_path(name);
        let saved = self.tool.save(&snapshot_path).await?;
        if !saved.success {
            return Err(BackupError::ToolInvocation {
                action: format!("snapshot save {}", snapshot_path.display()),
                output: saved.output,
            });
        }

        let state_path = self.config.state_file_path(name);
        let bundled_state = tokio::fs::try_exists(&state_path).await.unwrap_or(false);
        let mut members = vec![snapshot_path.clone()];
        if bundled_state {
            debug!("Step 3: Bundling cluster state {}", state_path.display());
            members.push(state_path.clone());
        }

        debug!("Step 4: Archiving {} member(s)", members.len());
        let base = snapshot_path.clone();
        let archive_path = tokio::task::spawn_blocking(move || archive::archive(&base, &members))
            .await
            .map_err(|e| BackupError::Archive {
                path: snapshot_path.clone(),
                reason: e.to_string(),
            })??;

        debug!("Step 5: Removing archived sources");
        if let Err(e) = remove_file(&snapshot_path).await {
            warn!(name, error = %e, "Failed to remove raw snapshot after archiving");
        }
        if bundled_state {
            if let Err(e) = remove_file(&state_path).await {
                warn!(name, error = %e, "Failed to remove cluster state after archiving");
            }
        }

        debug!("Step 6: Hardening {}", archive_path.display());
        harden_permissions(&archive_path)?;

        Ok(CreatedSnapshot {
            name: name.to_string(),
            archive_path,
            bundled_state,
        })
    }
}
