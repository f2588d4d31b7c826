//! PEM loading and the mutual-TLS server configuration.

use crate::errors::{BackupError, Result};
use rustls::server::AllowAnyAuthenticatedClient;
use rustls::{Certificate, PrivateKey, RootCertStore, ServerConfig};
use rustls_pemfile::Item;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| BackupError::io(path, e))
}

pub fn load_certs(path: &Path) -> Result<Vec<Certificate>> {
    let certs = rustls_pemfile::certs(&mut open(path)?).map_err(|e| BackupError::io(path, e))?;
    if certs.is_empty() {
        return Err(BackupError::Tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs.into_iter().map(Certificate).collect())
}

/// First PKCS#8, RSA, or EC private key in the file
pub fn load_private_key(path: &Path) -> Result<PrivateKey> {
    let items = rustls_pemfile::read_all(&mut open(path)?).map_err(|e| BackupError::io(path, e))?;
    items
        .into_iter()
        .find_map(|item| match item {
            Item::PKCS8Key(key) | Item::RSAKey(key) | Item::ECKey(key) => Some(PrivateKey(key)),
            _ => None,
        })
        .ok_or_else(|| BackupError::Tls(format!("no private key found in {}", path.display())))
}

/// TLS 1.2+ server config that requires a client certificate signed by `ca`
pub fn mutual_tls_config(ca: &Path, cert: &Path, key: &Path) -> Result<Arc<ServerConfig>> {
    let mut roots = RootCertStore::empty();
    for ca_cert in load_certs(ca)? {
        roots
            .add(&ca_cert)
            .map_err(|e| BackupError::Tls(format!("invalid CA certificate: {}", e)))?;
    }

    let mut config = ServerConfig::builder()
        .with_safe_defaults()
        .with_client_cert_verifier(Arc::new(AllowAnyAuthenticatedClient::new(roots)))
        .with_single_cert(load_certs(cert)?, load_private_key(key)?)
        .map_err(|e| BackupError::Tls(e.to_string()))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}
