//! Credential and trust-root decoding for object-store access.
//!
//! Credentials may be supplied base64-encoded or verbatim. The endpoint CA may
//! be a base64-encoded PEM document or a path to a PEM file; either way it must
//! contain at least one well-formed X.509 certificate.

use crate::errors::{BackupError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use tracing::debug;

/// Decode a base64 credential, keeping the raw value when it is not valid base64 text
pub fn decode_credential(value: &str) -> String {
    match STANDARD.decode(value) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(decoded) => decoded,
            Err(_) => value.to_string(),
        },
        Err(_) => value.to_string(),
    }
}

/// Resolve the endpoint CA to validated DER certificates
pub fn read_endpoint_ca(value: &str) -> Result<Vec<Vec<u8>>> {
    let pem = match STANDARD.decode(value) {
        Ok(bytes) => {
            debug!("Endpoint CA supplied as base64");
            bytes
        }
        Err(_) => {
            debug!("Reading endpoint CA from {}", value);
            std::fs::read(value).map_err(|e| BackupError::io(Path::new(value), e))?
        }
    };
    parse_ca_pem(&pem)
}

/// Extract DER certificates from PEM bytes, rejecting anything that is not X.509
pub fn parse_ca_pem(pem: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut reader = pem;
    let certs = rustls_pemfile::certs(&mut reader)
        .map_err(|e| BackupError::config(format!("invalid PEM in endpoint CA: {}", e)))?;

    if certs.is_empty() {
        return Err(BackupError::config(
            "endpoint CA does not contain a PEM certificate",
        ));
    }

    for der in &certs {
        x509_parser::parse_x509_certificate(der).map_err(|e| {
            BackupError::config(format!("endpoint CA is not a valid x509 certificate: {}", e))
        })?;
    }

    Ok(certs)
}
