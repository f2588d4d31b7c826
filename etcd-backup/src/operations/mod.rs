//! Entry points for each command: save, delete, download, extract, serve.

pub mod delete;
pub mod download;
pub mod extract;
pub mod save;
pub mod serve;

use crate::archive;
use crate::errors::{BackupError, Result};
use std::path::{Path, PathBuf};

pub use delete::{delete_local, delete_remote, delete_snapshot, DeleteReport};
pub use download::{download_from_peer, download_from_store};
pub use extract::extract_state_file;
pub use save::{save_once, save_rolling, OnceReport};
pub use serve::{prepare_served_file, serve_snapshot};

/// Run `archive::extract_member` off the async runtime
pub(crate) async fn extract_blocking(archive_path: &Path, member: &Path, destination: &Path) -> Result<()> {
    let archive_path = archive_path.to_path_buf();
    let member = member.to_string_lossy().into_owned();
    let destination: PathBuf = destination.to_path_buf();
    let reported = archive_path.clone();

    tokio::task::spawn_blocking(move || archive::extract_member(&archive_path, &member, &destination))
        .await
        .map_err(|e| BackupError::Archive {
            path: reported,
            reason: e.to_string(),
        })?
}
