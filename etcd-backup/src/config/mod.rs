pub mod manager;
pub mod secrets;

use crate::constants::{cluster_state, etcd, naming, paths, retries, s3, schedule, transfer};
use crate::errors::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use manager::ConfigLoader;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub backup_dir: PathBuf,
    pub state_dir: PathBuf,
    pub tmp_state_file: PathBuf,
    pub etcd: EtcdConfig,
    pub schedule: ScheduleConfig,
    pub retry: RetryPolicy,
    pub s3: S3Config,
    pub cluster_state: ClusterStateConfig,
    pub transfer: TransferConfig,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(paths::BACKUP_DIR),
            state_dir: PathBuf::from(paths::STATE_DIR),
            tmp_state_file: PathBuf::from(paths::TMP_STATE_FILE),
            etcd: EtcdConfig::default(),
            schedule: ScheduleConfig::default(),
            retry: RetryPolicy::default(),
            s3: S3Config::default(),
            cluster_state: ClusterStateConfig::default(),
            transfer: TransferConfig::default(),
        }
    }
}

impl BackupConfig {
    /// Raw snapshot file for `name`
    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.backup_dir.join(name)
    }

    /// Archived sibling of the raw snapshot
    pub fn archive_path(&self, name: &str) -> PathBuf {
        self.backup_dir
            .join(format!("{}.{}", name, naming::COMPRESSED_EXTENSION))
    }

    /// Cluster-state document bundled with `name`
    pub fn state_file_path(&self, name: &str) -> PathBuf {
        self.state_dir
            .join(format!("{}.{}", name, naming::CLUSTER_STATE_EXTENSION))
    }

    /// Client certificate material needed to talk to etcd or to a peer
    pub fn require_etcd_tls(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("cacert", &self.etcd.cacert),
            ("cert", &self.etcd.cert),
            ("key", &self.etcd.key),
        ]
        .iter()
        .filter(|(_, value)| value.as_os_str().is_empty())
        .map(|(field, _)| *field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BackupError::config(format!(
                "missing required etcd TLS settings: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn require_schedule(&self) -> Result<()> {
        if self.schedule.creation.is_zero() {
            return Err(BackupError::config("creation period must be greater than zero"));
        }
        if self.schedule.retention.is_zero() {
            return Err(BackupError::config("retention period must be greater than zero"));
        }
        if self.retry.backup_attempts == 0 {
            return Err(BackupError::config("backup attempts must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EtcdConfig {
    pub endpoints: String,
    pub cacert: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
    pub etcdctl: PathBuf,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: etcd::DEFAULT_ENDPOINTS.to_string(),
            cacert: PathBuf::new(),
            cert: PathBuf::new(),
            key: PathBuf::new(),
            etcdctl: PathBuf::from(etcd::ETCDCTL_BINARY),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    #[serde(with = "humantime_serde")]
    pub creation: Duration,
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            creation: schedule::CREATION_INTERVAL,
            retention: schedule::RETENTION_PERIOD,
        }
    }
}

/// Fixed-count, fixed-interval retry bounds threaded through every pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub backup_attempts: u32,
    pub s3_attempts: u32,
    pub connect_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub failure_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backup_attempts: retries::BACKUP_ATTEMPTS,
            s3_attempts: retries::S3_ATTEMPTS,
            connect_attempts: retries::CONNECT_ATTEMPTS,
            failure_interval: retries::FAILURE_INTERVAL,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub enabled: bool,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    pub region: String,
    /// Base64-encoded PEM or a path to a PEM file
    pub endpoint_ca: String,
    pub folder: String,
}

impl S3Config {
    /// Static credentials are used only when both halves are present
    pub fn has_static_credentials(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }

    pub fn region_or_default(&self) -> &str {
        if self.region.is_empty() {
            s3::DEFAULT_REGION
        } else {
            &self.region
        }
    }

    pub fn require_bucket(&self) -> Result<()> {
        if self.bucket_name.is_empty() {
            return Err(BackupError::config("s3 bucket name is required"));
        }
        Ok(())
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("endpoint_ca", &!self.endpoint_ca.is_empty())
            .field("folder", &self.folder)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterStateConfig {
    pub kubectl: PathBuf,
    pub kubeconfig: PathBuf,
    pub namespace: String,
    pub configmap: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ClusterStateConfig {
    fn default() -> Self {
        Self {
            kubectl: PathBuf::from(cluster_state::KUBECTL_BINARY),
            kubeconfig: PathBuf::from(cluster_state::KUBECONFIG),
            namespace: cluster_state::NAMESPACE.to_string(),
            configmap: cluster_state::CONFIGMAP.to_string(),
            request_timeout: cluster_state::REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub bind_address: String,
    pub port: u16,
    /// Peer to pull a snapshot from; empty means "not configured"
    pub local_endpoint: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            bind_address: transfer::BIND_ADDRESS.to_string(),
            port: transfer::SERVER_PORT,
            local_endpoint: String::new(),
        }
    }
}
