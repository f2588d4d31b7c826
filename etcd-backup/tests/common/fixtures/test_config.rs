use etcd_backup::BackupConfig;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Temporary backup, state, and tmp directories wired into a config
pub struct TestLayout {
    pub dir: TempDir,
    pub config: BackupConfig,
}

impl TestLayout {
    pub fn shared(&self) -> Arc<BackupConfig> {
        Arc::new(self.config.clone())
    }

    pub fn backup_file(&self, name: &str) -> PathBuf {
        self.config.backup_dir.join(name)
    }

    pub fn write_backup(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.backup_file(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn backup_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.config.backup_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn test_layout() -> TestLayout {
    let dir = TempDir::new().unwrap();
    let backup_dir = dir.path().join("backup");
    let state_dir = dir.path().join("state");
    let tmp_dir = dir.path().join("tmp");
    for d in [&backup_dir, &state_dir, &tmp_dir] {
        std::fs::create_dir_all(d).unwrap();
    }

    let mut config = BackupConfig::default();
    config.backup_dir = backup_dir;
    config.state_dir = state_dir;
    config.tmp_state_file = tmp_dir.join("cluster.rkestate");
    config.etcd.cacert = PathBuf::from("/etc/etcd/ca.pem");
    config.etcd.cert = PathBuf::from("/etc/etcd/cert.pem");
    config.etcd.key = PathBuf::from("/etc/etcd/key.pem");
    config.retry.failure_interval = Duration::ZERO;
    config.s3.bucket_name = "snapshots".to_string();
    config.s3.folder = "cluster-a".to_string();

    TestLayout { dir, config }
}

/// Backdate a file's modification time
pub fn set_age(path: &Path, age: Duration) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}
