use super::BackupConfig;
use anyhow::{anyhow, Result};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Loads `BackupConfig` from an optional TOML file; absent file means defaults
pub struct ConfigLoader;

impl ConfigLoader {
    pub async fn load(path: Option<&Path>) -> Result<BackupConfig> {
        let Some(path) = path else {
            debug!("No configuration file given, using defaults");
            return Ok(BackupConfig::default());
        };

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config {}: {}", path.display(), e))?;

        let config = Self::parse(&content)
            .map_err(|e| anyhow!("Failed to parse config {}: {}", path.display(), e))?;

        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<BackupConfig> {
        let config: BackupConfig = toml::from_str(content)?;
        Ok(config)
    }
}
