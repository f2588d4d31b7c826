use super::extract_blocking;
use crate::config::BackupConfig;
use crate::errors::{BackupError, Result};
use crate::http::PeerClient;
use crate::naming::{base_name, decompressed_name, object_key, resolve_ambiguous_prefix, snapshot_name};
use crate::storage::{ByteStream, ObjectKey, ObjectStore, PartialFile};
use futures::TryStreamExt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Locate `name` under the folder, download it, and unpack the raw snapshot if archived
///
/// Returns the path of the raw snapshot.
pub async fn download_from_store(
    store: &dyn ObjectStore,
    config: &BackupConfig,
    name: &str,
) -> Result<PathBuf> {
    let requested = object_key(&config.s3.folder, name);
    let listed: Vec<ObjectKey> = store.list(&requested, false).try_collect().await?;
    let resolved = resolve_ambiguous_prefix(listed.iter().map(|o| o.key.as_str()), &requested)?;
    info!("Resolved snapshot {} to [{}/{}]", name, store.bucket(), resolved.key);

    let file_name = base_name(&resolved.key);
    let destination = config.backup_dir.join(file_name);
    let body = store.get(&resolved.key).await?;

    let mut part = PartialFile::create(&destination).await?;
    if let Err(e) = copy_body(body, &mut part).await {
        part.discard().await;
        return Err(e);
    }
    let destination = part.commit().await?;
    info!("✓ Downloaded [{}] to {}", resolved.key, destination.display());

    if !resolved.is_compressed() {
        return Ok(destination);
    }

    let raw = config.snapshot_path(decompressed_name(file_name));
    extract_blocking(&destination, &raw, &raw).await?;
    info!("✓ Extracted {} from {}", raw.display(), destination.display());
    Ok(raw)
}

async fn copy_body(mut body: ByteStream, part: &mut PartialFile) -> Result<()> {
    while let Some(chunk) = body.try_next().await? {
        part.write(&chunk).await?;
    }
    Ok(())
}

/// Pull `name` from the peer configured as the local endpoint
pub async fn download_from_peer(client: &PeerClient, config: &BackupConfig, name: &str) -> Result<PathBuf> {
    let name = snapshot_name(name)?;
    let host = config.transfer.local_endpoint.as_str();
    if host.is_empty() {
        return Err(BackupError::config("local endpoint is required to download from a peer"));
    }

    client
        .fetch(host, config.transfer.port, name, &config.backup_dir)
        .await
        .inspect_err(|e| warn!(name, error = %e, "Peer download failed"))
}
