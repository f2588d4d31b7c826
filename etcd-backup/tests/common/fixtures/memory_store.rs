use async_trait::async_trait;
use bytes::Bytes;
use etcd_backup::config::S3Config;
use etcd_backup::storage::{ByteStream, KeyStream, ObjectKey, ObjectMeta, ObjectStore, ObjectStoreConnector};
use etcd_backup::{BackupError, Result};
use futures::StreamExt;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Object store kept in a map, with switches for injecting failures
pub struct MemoryObjectStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    versioning: Mutex<std::result::Result<bool, String>>,
    failing_removals: Mutex<HashSet<String>>,
    pub fail_put: AtomicBool,
    pub fail_stat: AtomicBool,
    pub fail_list: AtomicBool,
    /// Fail a GET after its first chunk
    pub truncate_get: AtomicBool,
    /// List keys with `:` percent-encoded, as some providers do
    pub encode_listing: AtomicBool,
    pub puts: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Mutex::new(BTreeMap::new()),
            versioning: Mutex::new(Ok(false)),
            failing_removals: Mutex::new(HashSet::new()),
            fail_put: AtomicBool::new(false),
            fail_stat: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            truncate_get: AtomicBool::new(false),
            encode_listing: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, key: &str, content: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), content.to_vec());
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn content(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn set_versioning(&self, state: std::result::Result<bool, &str>) {
        *self.versioning.lock().unwrap() = state.map_err(str::to_string);
    }

    pub fn fail_removal_of(&self, key: &str) {
        self.failing_removals.lock().unwrap().insert(key.to_string());
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, path: &Path, _content_type: &str) -> Result<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(BackupError::Upload {
                key: key.to_string(),
                attempts: 3,
                reason: "connection reset".to_string(),
            });
        }
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| BackupError::io(path, e))?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.insert(key, &content);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<ByteStream> {
        let content = self
            .content(key)
            .ok_or_else(|| BackupError::NotFound(format!("object [{}]", key)))?;
        // Two chunks to exercise streaming writes
        let mid = content.len() / 2;
        let second = if self.truncate_get.load(Ordering::SeqCst) {
            Err(BackupError::Download {
                key: key.to_string(),
                reason: "unexpected EOF".to_string(),
            })
        } else {
            Ok(Bytes::copy_from_slice(&content[mid..]))
        };
        let chunks = vec![Ok(Bytes::copy_from_slice(&content[..mid])), second];
        Ok(futures::stream::iter(chunks).boxed())
    }

    fn list<'a>(&'a self, prefix: &'a str, recursive: bool) -> KeyStream<'a> {
        if self.fail_list.load(Ordering::SeqCst) {
            let failure = BackupError::List {
                prefix: prefix.to_string(),
                reason: "503 Slow Down".to_string(),
            };
            return futures::stream::iter(vec![Err(failure)]).boxed();
        }

        let encode = self.encode_listing.load(Ordering::SeqCst);
        let keys: Vec<Result<ObjectKey>> = self
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| recursive || !key[prefix.len()..].contains('/'))
            .map(|key| {
                let key = if encode { key.replace(':', "%3A") } else { key };
                Ok(ObjectKey {
                    key,
                    last_modified: None,
                })
            })
            .collect();
        futures::stream::iter(keys).boxed()
    }

    async fn stat(&self, key: &str) -> Result<Option<ObjectMeta>> {
        if self.fail_stat.load(Ordering::SeqCst) {
            return Err(BackupError::ObjectStore {
                operation: "stat",
                target: key.to_string(),
                reason: "403 Forbidden".to_string(),
            });
        }
        Ok(self.content(key).map(|content| ObjectMeta {
            key: key.to_string(),
            size: content.len() as u64,
            last_modified: None,
        }))
    }

    async fn versioning_enabled(&self) -> Result<bool> {
        self.versioning
            .lock()
            .unwrap()
            .clone()
            .map_err(|reason| BackupError::ObjectStore {
                operation: "get bucket versioning",
                target: self.bucket.clone(),
                reason,
            })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.failing_removals.lock().unwrap().contains(key) {
            return Err(BackupError::Remove {
                key: key.to_string(),
                reason: "access denied".to_string(),
            });
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Hands out the same in-memory store, or fails to connect
pub struct MemoryConnector {
    pub store: Arc<MemoryObjectStore>,
    pub reachable: AtomicBool,
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryObjectStore>) -> Self {
        Self {
            store,
            reachable: AtomicBool::new(true),
        }
    }

    pub fn unreachable(store: Arc<MemoryObjectStore>) -> Self {
        let connector = Self::new(store);
        connector.reachable.store(false, Ordering::SeqCst);
        connector
    }
}

#[async_trait]
impl ObjectStoreConnector for MemoryConnector {
    async fn connect(&self, _config: &S3Config) -> Result<Arc<dyn ObjectStore>> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(BackupError::Connection {
                attempts: 3,
                reason: "dial tcp: connection refused".to_string(),
            });
        }
        Ok(self.store.clone())
    }
}
