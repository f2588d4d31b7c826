use crate::constants::s3::CONTENT_TYPE;
use crate::errors::{BackupError, Result};
use crate::naming::object_key;
use crate::storage::ObjectStore;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { key: String },
    /// Same key already present in an unversioned bucket
    SkippedExisting { key: String },
}

impl UploadOutcome {
    pub fn key(&self) -> &str {
        match self {
            UploadOutcome::Uploaded { key } | UploadOutcome::SkippedExisting { key } => key,
        }
    }
}

/// Upload an archive under `folder`, unless doing so would silently overwrite it
pub async fn upload_snapshot(
    store: &dyn ObjectStore,
    folder: &str,
    archive_path: &Path,
) -> Result<UploadOutcome> {
    let file_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| BackupError::NotFound(format!("file name of {}", archive_path.display())))?;
    let key = object_key(folder, &file_name);

    if store.exists(&key).await {
        match store.versioning_enabled().await {
            Ok(false) => {
                info!(
                    "[{}/{}] already exists and versioning is disabled, skipping upload",
                    store.bucket(),
                    key
                );
                return Ok(UploadOutcome::SkippedExisting { key });
            }
            Ok(true) => debug!("Versioning enabled on [{}], uploading new version", store.bucket()),
            Err(e) => warn!(key, error = %e, "Cannot determine bucket versioning, uploading anyway"),
        }
    }

    store.put(&key, archive_path, CONTENT_TYPE).await?;
    Ok(UploadOutcome::Uploaded { key })
}
