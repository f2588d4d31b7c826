use crate::config::{BackupConfig, S3Config};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "etcd-backup", version, about = "Create, prune, and serve etcd snapshots")]
pub struct Cli {
    /// Optional TOML configuration file; flags take precedence over it
    #[arg(long, global = true, env = "ETCD_BACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "RANCHER_DEBUG")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Take snapshots periodically, or once with --once
    Save {
        #[command(flatten)]
        etcd: EtcdArgs,
        #[command(flatten)]
        s3: S3Args,
        /// Interval between scheduled snapshots
        #[arg(long)]
        creation: Option<humantime::Duration>,
        /// Age after which snapshots are pruned
        #[arg(long)]
        retention: Option<humantime::Duration>,
        /// Take a single snapshot named --name and exit
        #[arg(long)]
        once: bool,
        /// Retries after a failed snapshot attempt
        #[arg(long = "backup-retries")]
        backup_retries: Option<u32>,
        /// Retries after a failed upload attempt
        #[arg(long = "s3-retries")]
        s3_retries: Option<u32>,
    },
    /// Delete a snapshot locally, and from the bucket with --s3-backup
    Delete {
        #[command(flatten)]
        etcd: EtcdArgs,
        #[command(flatten)]
        s3: S3Args,
        /// Only remove the raw file, and only when its archive exists
        #[arg(long)]
        cleanup: bool,
    },
    /// Download a snapshot from the bucket or from a peer
    Download {
        #[command(flatten)]
        etcd: EtcdArgs,
        #[command(flatten)]
        s3: S3Args,
    },
    /// Extract the cluster-state file bundled with a snapshot
    #[command(name = "extractstatefile")]
    ExtractStateFile {
        #[command(flatten)]
        etcd: EtcdArgs,
        #[command(flatten)]
        s3: S3Args,
    },
    /// Serve one snapshot over mutual TLS
    Serve {
        #[command(flatten)]
        etcd: EtcdArgs,
    },
}

/// Total attempts for a `--*-retries` flag: the first try plus the retries
pub fn attempts_from_retries(retries: u32) -> u32 {
    retries.saturating_add(1)
}

#[derive(Debug, Clone, Default, Args)]
pub struct EtcdArgs {
    /// Snapshot name
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub endpoints: Option<String>,

    #[arg(long, env = "ETCD_CACERT")]
    pub cacert: Option<PathBuf>,

    #[arg(long, env = "ETCD_CERT")]
    pub cert: Option<PathBuf>,

    #[arg(long, env = "ETCD_KEY")]
    pub key: Option<PathBuf>,

    /// Peer to download the snapshot from
    #[arg(long = "local-endpoint", env = "LOCAL_ENDPOINT")]
    pub local_endpoint: Option<String>,
}

impl EtcdArgs {
    pub fn apply(&self, config: &mut BackupConfig) {
        if let Some(endpoints) = &self.endpoints {
            config.etcd.endpoints = endpoints.clone();
        }
        if let Some(cacert) = &self.cacert {
            config.etcd.cacert = cacert.clone();
        }
        if let Some(cert) = &self.cert {
            config.etcd.cert = cert.clone();
        }
        if let Some(key) = &self.key {
            config.etcd.key = key.clone();
        }
        if let Some(endpoint) = &self.local_endpoint {
            config.transfer.local_endpoint = endpoint.clone();
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct S3Args {
    /// Use the object store
    #[arg(long = "s3-backup", env = "S3_BACKUP")]
    pub s3_backup: bool,

    #[arg(long = "s3-endpoint", env = "S3_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long = "s3-accessKey", env = "S3_ACCESS_KEY")]
    pub access_key: Option<String>,

    #[arg(long = "s3-secretKey", env = "S3_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    #[arg(long = "s3-bucketName", env = "S3_BUCKET_NAME")]
    pub bucket_name: Option<String>,

    #[arg(long = "s3-region", env = "S3_BUCKET_REGION")]
    pub region: Option<String>,

    /// Base64-encoded PEM or path to the endpoint CA
    #[arg(long = "s3-endpoint-ca", env = "S3_ENDPOINT_CA")]
    pub endpoint_ca: Option<String>,

    #[arg(long = "s3-folder", env = "S3_FOLDER")]
    pub folder: Option<String>,
}

impl S3Args {
    pub fn apply(&self, config: &mut S3Config) {
        if self.s3_backup {
            config.enabled = true;
        }
        let overrides = [
            (&self.endpoint, &mut config.endpoint),
            (&self.access_key, &mut config.access_key),
            (&self.secret_key, &mut config.secret_key),
            (&self.bucket_name, &mut config.bucket_name),
            (&self.region, &mut config.region),
            (&self.endpoint_ca, &mut config.endpoint_ca),
            (&self.folder, &mut config.folder),
        ];
        for (flag, field) in overrides {
            if let Some(value) = flag {
                *field = value.clone();
            }
        }
    }
}
