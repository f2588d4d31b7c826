use async_trait::async_trait;
use etcd_backup::snapshot::ClusterStateSource;
use etcd_backup::{BackupError, Result};

pub const STATE_DOCUMENT: &str = r#"{"desiredState":{"rkeConfig":{"nodes":[]}},"currentState":{}}"#;

pub fn state_configmap() -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "data": { "full-cluster-state": STATE_DOCUMENT }
    })
    .to_string()
}

pub struct FakeClusterState {
    available: bool,
}

impl FakeClusterState {
    pub fn available() -> Self {
        Self { available: true }
    }

    pub fn unavailable() -> Self {
        Self { available: false }
    }
}

#[async_trait]
impl ClusterStateSource for FakeClusterState {
    async fn fetch(&self) -> Result<String> {
        if self.available {
            Ok(state_configmap())
        } else {
            Err(BackupError::ToolInvocation {
                action: "reading configmap full-cluster-state".to_string(),
                output: "the server could not find the requested resource".to_string(),
            })
        }
    }
}
