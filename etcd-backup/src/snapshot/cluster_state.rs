//! Capture of the orchestrator's cluster-state document for bundling with a snapshot.

use crate::config::{ClusterStateConfig, RetryPolicy};
use crate::constants::cluster_state::DATA_KEY;
use crate::errors::{BackupError, Result};
use crate::services::execute_command;
use crate::storage::local::harden_permissions;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

/// Source of the raw configmap JSON holding the cluster state
#[async_trait]
pub trait ClusterStateSource: Send + Sync {
    async fn fetch(&self) -> Result<String>;
}

/// Reads the state configmap through `kubectl`
#[derive(Debug, Clone)]
pub struct Kubectl {
    config: ClusterStateConfig,
}

impl Kubectl {
    pub fn new(config: ClusterStateConfig) -> Self {
        Self { config }
    }

    fn args(&self) -> Vec<String> {
        vec![
            format!(
                "--request-timeout={}s",
                self.config.request_timeout.as_secs().max(1)
            ),
            "--kubeconfig".to_string(),
            self.config.kubeconfig.display().to_string(),
            "-n".to_string(),
            self.config.namespace.clone(),
            "get".to_string(),
            "configmap".to_string(),
            self.config.configmap.clone(),
            "-o".to_string(),
            "json".to_string(),
        ]
    }
}

#[async_trait]
impl ClusterStateSource for Kubectl {
    async fn fetch(&self) -> Result<String> {
        let output = execute_command(&self.config.kubectl, self.args(), &[]).await?;
        if !output.success {
            return Err(BackupError::ToolInvocation {
                action: format!("reading configmap {}", self.config.configmap),
                output: output.combined(),
            });
        }
        Ok(output.stdout)
    }
}

/// Pull the embedded state document out of the configmap and pretty-print it
pub fn render_state_document(configmap_json: &str) -> Result<String> {
    let parse_error = |reason: String| BackupError::Parse {
        name: DATA_KEY.to_string(),
        reason,
    };

    let configmap: Value =
        serde_json::from_str(configmap_json).map_err(|e| parse_error(e.to_string()))?;

    let embedded = configmap
        .get("data")
        .and_then(|data| data.get(DATA_KEY))
        .and_then(Value::as_str)
        .ok_or_else(|| parse_error(format!("configmap has no data.{} string", DATA_KEY)))?;

    let document: Value =
        serde_json::from_str(embedded).map_err(|e| parse_error(e.to_string()))?;
    serde_json::to_string_pretty(&document).map_err(|e| parse_error(e.to_string()))
}

/// Fetch, render, and write the state document, retrying with the backup attempt bound
pub async fn retrieve_and_write_state_file(
    source: &dyn ClusterStateSource,
    destination: &Path,
    policy: &RetryPolicy,
) -> Result<()> {
    let attempts = policy.backup_attempts.max(1);
    let mut attempt = 1;

    let document = loop {
        match source.fetch().await.and_then(|raw| render_state_document(&raw)) {
            Ok(document) => break document,
            Err(e) if attempt < attempts => {
                warn!(attempt, error = %e, "Failed to retrieve cluster state, retrying");
                tokio::time::sleep(policy.failure_interval).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    };

    tokio::fs::write(destination, document)
        .await
        .map_err(|e| BackupError::io(destination, e))?;
    harden_permissions(destination)?;

    info!("✓ Cluster state written to {}", destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_preserves_key_order() {
        let configmap = serde_json::json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "data": {
                "full-cluster-state": "{\"desiredState\":{\"rkeConfig\":{}},\"currentState\":{\"a\":1}}"
            }
        })
        .to_string();

        let rendered = render_state_document(&configmap).unwrap();
        assert_eq!(
            rendered,
            "{\n  \"desiredState\": {\n    \"rkeConfig\": {}\n  },\n  \"currentState\": {\n    \"a\": 1\n  }\n}"
        );
    }

    #[test]
    fn test_render_requires_data_key() {
        let err = render_state_document(r#"{"data":{"other":"{}"}}"#).unwrap_err();
        assert!(matches!(err, BackupError::Parse { .. }));

        let err = render_state_document("not json").unwrap_err();
        assert!(matches!(err, BackupError::Parse { .. }));
    }

    #[test]
    fn test_kubectl_args() {
        let kubectl = Kubectl::new(ClusterStateConfig::default());
        assert_eq!(
            kubectl.args().join(" "),
            "--request-timeout=30s --kubeconfig /etc/kubernetes/ssl/kubecfg-kube-node.yaml -n kube-system get configmap full-cluster-state -o json"
        );
    }
}
