//! Central repository for default paths, naming conventions, and retry limits
//!
//! Constants are grouped by concern. Most of them are only defaults: every
//! value that an operator may need to tune is also carried by `BackupConfig`.

use std::time::Duration;

/// Local filesystem layout
pub mod paths {
    /// Directory holding raw and archived snapshots
    pub const BACKUP_DIR: &str = "/backup";

    /// Directory where the cluster-state document is written before archiving
    pub const STATE_DIR: &str = "/etc/kubernetes";

    /// Destination of a state file extracted from an archive
    pub const TMP_STATE_FILE: &str = "/tmp/cluster.rkestate";

    /// Owner read/write only, applied to every artifact
    pub const ARTIFACT_MODE: u32 = 0o600;

    /// Appended to a download's file name until it completes
    pub const PARTIAL_SUFFIX: &str = ".part";
}

/// Snapshot naming conventions
pub mod naming {
    /// Extension of archived snapshots (without the dot)
    pub const COMPRESSED_EXTENSION: &str = "zip";

    /// Extension of the bundled cluster-state document
    pub const CLUSTER_STATE_EXTENSION: &str = "rkestate";

    /// Suffix that follows the RFC3339 timestamp in scheduled snapshot names
    pub const SCHEDULED_SUFFIX: &str = "_etcd";

    /// Separator between the embedded timestamp and the rest of the name
    pub const TIMESTAMP_SEPARATOR: char = '_';

    /// Leading cluster identifier, e.g. `c-abc123-`
    pub const NAME_PREFIX_PATTERN: &str = r"^c-[a-z0-9].*?-";

    /// Cluster identifier followed by the recurring marker, e.g. `c-abc123-rl-`
    pub const RECURRING_PATTERN: &str = r"^c-[a-z0-9].*?-r.-";

    /// Object keys produced by the scheduler, compressed or not
    pub const SCHEDULED_KEY_PATTERN: &str = r".+_etcd(|\.zip)$";
}

/// Retry bounds and intervals
pub mod retries {
    use super::Duration;

    /// Total snapshot creation attempts per cycle
    pub const BACKUP_ATTEMPTS: u32 = 4;

    /// Total upload attempts per snapshot
    pub const S3_ATTEMPTS: u32 = 3;

    /// Total attempts to construct an object-store client
    pub const CONNECT_ATTEMPTS: u32 = 3;

    /// Fixed pause between failed attempts
    pub const FAILURE_INTERVAL: Duration = Duration::from_secs(15);
}

/// Scheduling defaults
pub mod schedule {
    use super::Duration;

    /// Interval between scheduled snapshots
    pub const CREATION_INTERVAL: Duration = Duration::from_secs(5 * 60);

    /// Age after which scheduled snapshots are pruned
    pub const RETENTION_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);
}

/// Object store defaults
pub mod s3 {
    /// Public endpoint used with ambient (IAM) credentials
    pub const DEFAULT_ENDPOINT: &str = "s3.amazonaws.com";

    /// Region used when none is configured
    pub const DEFAULT_REGION: &str = "us-east-1";

    /// Content type of uploaded archives
    pub const CONTENT_TYPE: &str = "application/zip";

    /// Endpoint substring of a provider that only supports virtual-hosted addressing
    pub const DNS_ONLY_PROVIDER: &str = "aliyun";
}

/// etcd client defaults
pub mod etcd {
    /// Client endpoint of the local member
    pub const DEFAULT_ENDPOINTS: &str = "127.0.0.1:2379";

    /// Snapshot tool binary
    pub const ETCDCTL_BINARY: &str = "etcdctl";

    /// Marker printed by the health probe for a failing member
    pub const UNHEALTHY_MARKER: &str = "unhealthy";
}

/// Cluster-state retrieval defaults
pub mod cluster_state {
    use super::Duration;

    pub const KUBECTL_BINARY: &str = "/usr/local/bin/kubectl";
    pub const KUBECONFIG: &str = "/etc/kubernetes/ssl/kubecfg-kube-node.yaml";
    pub const NAMESPACE: &str = "kube-system";
    pub const CONFIGMAP: &str = "full-cluster-state";

    /// Key inside the configmap `data` map holding the state document
    pub const DATA_KEY: &str = "full-cluster-state";

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Peer transfer defaults
pub mod transfer {
    /// Port of the one-shot snapshot server
    pub const SERVER_PORT: u16 = 2379;

    /// Address the snapshot server binds to
    pub const BIND_ADDRESS: &str = "0.0.0.0";
}
