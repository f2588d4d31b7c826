use crate::config::EtcdConfig;
use crate::errors::{BackupError, Result};
use crate::storage::PartialFile;
use reqwest::{Certificate, Client, Identity, StatusCode, Url};
use std::path::{Path, PathBuf};
use tracing::info;

/// HTTPS client that pulls a snapshot from a peer's serve endpoint
///
/// Peers are addressed by IP, which their certificates do not list, so hostname
/// verification is disabled. The chain must still be signed by the configured CA.
#[derive(Debug, Clone)]
pub struct PeerClient {
    client: Client,
}

impl PeerClient {
    pub fn from_config(config: &EtcdConfig) -> Result<Self> {
        let read = |path: &Path| std::fs::read(path).map_err(|e| BackupError::io(path, e));

        let ca = read(&config.cacert)?;
        let mut identity = read(&config.cert)?;
        identity.push(b'\n');
        identity.extend(read(&config.key)?);

        Self::from_pem(&ca, &identity)
    }

    /// `identity_pem` holds the client certificate followed by its private key
    pub fn from_pem(ca_pem: &[u8], identity_pem: &[u8]) -> Result<Self> {
        let ca = Certificate::from_pem(ca_pem)
            .map_err(|e| BackupError::Tls(format!("invalid peer CA: {}", e)))?;
        let identity = Identity::from_pem(identity_pem)
            .map_err(|e| BackupError::Tls(format!("invalid client identity: {}", e)))?;

        let client = Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .add_root_certificate(ca)
            .identity(identity)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| BackupError::Tls(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn snapshot_url(host: &str, port: u16, name: &str) -> Result<Url> {
        let invalid = |reason: String| BackupError::Transfer {
            url: format!("https://{}:{}/{}", host, port, name),
            reason,
        };

        let mut url = Url::parse(&format!("https://{}:{}/", host, port))
            .map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    /// GET `/<name>` from the peer into `<dest_dir>/<name>`
    pub async fn fetch(&self, host: &str, port: u16, name: &str, dest_dir: &Path) -> Result<PathBuf> {
        let url = Self::snapshot_url(host, port, name)?;
        let transfer_error = |reason: String| BackupError::Transfer {
            url: url.to_string(),
            reason,
        };

        info!("Fetching snapshot {} from {}", name, url);
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transfer_error(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(transfer_error(format!("unexpected status {}", response.status())));
        }

        let mut part = PartialFile::create(&dest_dir.join(name)).await?;
        let copied = async {
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| transfer_error(e.to_string()))?
            {
                part.write(&chunk).await?;
            }
            Ok::<_, BackupError>(())
        }
        .await;

        if let Err(e) = copied {
            part.discard().await;
            return Err(e);
        }
        let written = part.written();
        let destination = part.commit().await?;

        info!("✓ Downloaded {} ({} bytes) to {}", name, written, destination.display());
        Ok(destination)
    }
}
