//! Storage tiers: the local backup directory and an S3-compatible bucket.

pub mod local;
pub mod s3;
pub mod transport;

use crate::config::S3Config;
use crate::errors::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::path::Path;
use std::sync::Arc;

pub use local::{LocalEntry, LocalTier, PartialFile};
pub use s3::{S3Connector, S3Gateway};

/// Lazily produced byte chunks of one object
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Lazily produced keys of a listing; an `Err` item ends the sequence
pub type KeyStream<'a> = BoxStream<'a, Result<ObjectKey>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Capability over one bucket of an object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// Upload a local file, retried up to the configured bound
    async fn put(&self, key: &str, path: &Path, content_type: &str) -> Result<()>;

    async fn get(&self, key: &str) -> Result<ByteStream>;

    fn list<'a>(&'a self, prefix: &'a str, recursive: bool) -> KeyStream<'a>;

    /// `Ok(None)` when the object does not exist
    async fn stat(&self, key: &str) -> Result<Option<ObjectMeta>>;

    async fn versioning_enabled(&self) -> Result<bool>;

    /// Logs failures before returning them so batch callers can simply continue
    async fn remove(&self, key: &str) -> Result<()>;

    /// Best-effort probe; errors count as "does not exist"
    async fn exists(&self, key: &str) -> bool {
        match self.stat(key).await {
            Ok(meta) => meta.is_some(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Existence probe failed");
                false
            }
        }
    }
}

/// Builds a fresh store handle per invocation
#[async_trait]
pub trait ObjectStoreConnector: Send + Sync {
    async fn connect(&self, config: &S3Config) -> Result<Arc<dyn ObjectStore>>;
}
