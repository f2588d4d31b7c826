use crate::config::EtcdConfig;
use crate::errors::Result;
use crate::services::execute_command;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Exit status and combined output of one snapshot tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

/// Producer of raw snapshot files and a health signal
#[async_trait]
pub trait SnapshotTool: Send + Sync {
    async fn health(&self) -> Result<ToolOutput>;

    async fn save(&self, destination: &Path) -> Result<ToolOutput>;
}

/// `etcdctl` using the v3 API
#[derive(Debug, Clone)]
pub struct Etcdctl {
    binary: PathBuf,
    endpoints: String,
    cacert: PathBuf,
    cert: PathBuf,
    key: PathBuf,
}

impl Etcdctl {
    pub fn from_config(config: &EtcdConfig) -> Self {
        Self {
            binary: config.etcdctl.clone(),
            endpoints: config.endpoints.clone(),
            cacert: config.cacert.clone(),
            cert: config.cert.clone(),
            key: config.key.clone(),
        }
    }

    fn connection_args(&self) -> Vec<String> {
        vec![
            format!("--endpoints={}", self.endpoints),
            format!("--cacert={}", self.cacert.display()),
            format!("--cert={}", self.cert.display()),
            format!("--key={}", self.key.display()),
        ]
    }

    async fn run(&self, action: &[&str]) -> Result<ToolOutput> {
        let mut args = self.connection_args();
        args.extend(action.iter().map(|a| a.to_string()));

        let output = execute_command(&self.binary, &args, &[("ETCDCTL_API", "3")]).await?;
        Ok(ToolOutput {
            success: output.success,
            output: output.combined(),
        })
    }
}

#[async_trait]
impl SnapshotTool for Etcdctl {
    async fn health(&self) -> Result<ToolOutput> {
        self.run(&["endpoint", "health"]).await
    }

    async fn save(&self, destination: &Path) -> Result<ToolOutput> {
        let destination = destination.to_string_lossy();
        self.run(&["snapshot", "save", &destination]).await
    }
}
