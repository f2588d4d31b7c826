use super::extract_blocking;
use crate::config::BackupConfig;
use crate::errors::{BackupError, Result};
use crate::naming::snapshot_name;
use std::path::PathBuf;
use tracing::info;

/// Unpack the cluster-state member bundled in `<name>.zip` to the temporary state file
pub async fn extract_state_file(config: &BackupConfig, name: &str) -> Result<PathBuf> {
    let name = snapshot_name(name)?;
    let archive = config.archive_path(name);
    if !tokio::fs::try_exists(&archive).await.unwrap_or(false) {
        return Err(BackupError::NotFound(format!("archive {}", archive.display())));
    }

    let member = config.state_file_path(name);
    extract_blocking(&archive, &member, &config.tmp_state_file).await?;

    info!(
        "✓ Extracted cluster state of {} to {}",
        name,
        config.tmp_state_file.display()
    );
    Ok(config.tmp_state_file.clone())
}
