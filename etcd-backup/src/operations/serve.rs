use super::extract_blocking;
use crate::config::BackupConfig;
use crate::errors::{BackupError, Result};
use crate::naming::snapshot_name;
use crate::web::{mutual_tls_config, snapshot_router, SnapshotServer};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::info;

/// Make sure the raw snapshot exists, unpacking its archive when present
pub async fn prepare_served_file(config: &BackupConfig, name: &str) -> Result<PathBuf> {
    let name = snapshot_name(name)?;
    let raw = config.snapshot_path(name);
    let archive = config.archive_path(name);

    if tokio::fs::try_exists(&archive).await.unwrap_or(false) {
        info!("Extracting {} before serving", archive.display());
        extract_blocking(&archive, &raw, &raw).await?;
    }

    if !tokio::fs::try_exists(&raw).await.unwrap_or(false) {
        return Err(BackupError::NotFound(format!("snapshot {}", raw.display())));
    }
    Ok(raw)
}

/// Serve `name` over mutual TLS until the process is terminated
pub async fn serve_snapshot(config: &BackupConfig, name: &str) -> Result<()> {
    config.require_etcd_tls()?;
    let name = snapshot_name(name)?;
    let path = prepare_served_file(config, name).await?;

    let tls = mutual_tls_config(&config.etcd.cacert, &config.etcd.cert, &config.etcd.key)?;
    let ip: IpAddr = config
        .transfer
        .bind_address
        .parse()
        .map_err(|e| BackupError::config(format!("invalid bind address: {}", e)))?;
    let addr = SocketAddr::new(ip, config.transfer.port);

    let server = SnapshotServer::bind(addr, tls, snapshot_router(name, path)).await?;
    server.serve().await
}
