use crate::constants::paths::{ARTIFACT_MODE, PARTIAL_SUFFIX};
use crate::errors::{BackupError, Result};
use std::fs::Permissions;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// One entry of the flat backup directory
#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub modified: SystemTime,
}

/// The local backup directory
#[derive(Debug, Clone)]
pub struct LocalTier {
    root: PathBuf,
}

impl LocalTier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub async fn entries(&self) -> Result<Vec<LocalEntry>> {
        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(|e| BackupError::io(&self.root, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| BackupError::io(&self.root, e))?
        {
            let path = entry.path();
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| BackupError::io(&path, e))?;
            entries.push(LocalEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                is_dir: metadata.is_dir(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub async fn exists(&self, name: &str) -> bool {
        fs::try_exists(self.path_of(name)).await.unwrap_or(false)
    }

    /// Delete `name`; a file that is already gone is not an error
    pub async fn remove(&self, name: &str) -> Result<()> {
        remove_file(&self.path_of(name)).await
    }
}

pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            info!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} already absent", path.display());
            Ok(())
        }
        Err(e) => Err(BackupError::io(path, e)),
    }
}

/// Restrict an artifact to owner read/write
pub fn harden_permissions(path: &Path) -> Result<()> {
    std::fs::set_permissions(path, Permissions::from_mode(ARTIFACT_MODE))
        .map_err(|e| BackupError::io(path, e))
}

/// Download target staged as `<name>.part` until it is complete
///
/// The staging file is created owner-only. `commit` renames it over the
/// destination; `discard` removes it, so a failed transfer never leaves a
/// file under the snapshot's name.
#[derive(Debug)]
pub struct PartialFile {
    file: File,
    staging: PathBuf,
    destination: PathBuf,
    written: u64,
}

impl PartialFile {
    pub async fn create(destination: &Path) -> Result<Self> {
        let mut staged_name = destination
            .file_name()
            .ok_or_else(|| BackupError::config(format!("{} has no file name", destination.display())))?
            .to_os_string();
        staged_name.push(PARTIAL_SUFFIX);
        let staging = destination.with_file_name(staged_name);

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(ARTIFACT_MODE)
            .open(&staging)
            .await
            .map_err(|e| BackupError::io(&staging, e))?;

        Ok(Self {
            file,
            staging,
            destination: destination.to_path_buf(),
            written: 0,
        })
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| BackupError::io(&self.staging, e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush, move into place, and restrict the result to the owner
    pub async fn commit(self) -> Result<PathBuf> {
        let finished = async {
            self.file
                .sync_all()
                .await
                .map_err(|e| BackupError::io(&self.staging, e))?;
            fs::rename(&self.staging, &self.destination)
                .await
                .map_err(|e| BackupError::io(&self.destination, e))
        }
        .await;

        if let Err(e) = finished {
            self.discard().await;
            return Err(e);
        }
        harden_permissions(&self.destination)?;
        Ok(self.destination)
    }

    pub async fn discard(self) {
        drop(self.file);
        if let Err(e) = fs::remove_file(&self.staging).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.staging.display(), error = %e, "Failed to remove partial download");
            }
        }
    }
}
