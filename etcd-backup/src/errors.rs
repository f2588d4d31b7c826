//! Error taxonomy for snapshot lifecycle operations
//!
//! Every failure carries enough context (path, key, attempt count, tool output)
//! to be logged on its own before it is propagated or swallowed.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackupError>;

/// Main error type for snapshot lifecycle operations
#[derive(Debug, Error)]
pub enum BackupError {
    /// Missing or invalid configuration; fatal before any work starts
    #[error("configuration error: {0}")]
    Config(String),

    /// External command failed, exited non-zero, or reported unhealthy
    #[error("{action} failed: {output}")]
    ToolInvocation { action: String, output: String },

    /// Filesystem operation failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Archive container could not be written or read
    #[error("archive error on {}: {reason}", path.display())]
    Archive { path: PathBuf, reason: String },

    /// Object store client could not be constructed
    #[error("failed to connect to object store after {attempts} attempts: {reason}")]
    Connection { attempts: u32, reason: String },

    /// Target bucket does not exist
    #[error("bucket [{0}] does not exist")]
    BucketNotFound(String),

    /// Upload retries exhausted
    #[error("failed to upload [{key}] after {attempts} attempts: {reason}")]
    Upload {
        key: String,
        attempts: u32,
        reason: String,
    },

    /// Object download failed
    #[error("failed to download [{key}]: {reason}")]
    Download { key: String, reason: String },

    /// Listing aborted mid-sequence
    #[error("failed to list objects under [{prefix}]: {reason}")]
    List { prefix: String, reason: String },

    /// Any other object-store request failed
    #[error("object store {operation} failed for [{target}]: {reason}")]
    ObjectStore {
        operation: &'static str,
        target: String,
        reason: String,
    },

    /// Object removal failed
    #[error("failed to remove [{key}]: {reason}")]
    Remove { key: String, reason: String },

    /// Peer transfer failed or returned a non-success status
    #[error("transfer from {url} failed: {reason}")]
    Transfer { url: String, reason: String },

    /// No matching object, file, or archive member
    #[error("{0} not found")]
    NotFound(String),

    /// Unparseable snapshot name
    #[error("cannot parse snapshot name [{name}]: {reason}")]
    Parse { name: String, reason: String },

    /// Certificate or TLS configuration problem
    #[error("TLS error: {0}")]
    Tls(String),

    /// Best-effort batch deletion left some items behind
    #[error("failed to delete {} item(s): {}", failed.len(), failed.join(", "))]
    PartialDeletion { failed: Vec<String> },
}

impl BackupError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
