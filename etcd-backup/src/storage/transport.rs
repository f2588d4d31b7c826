//! HTTP transport and addressing style for the S3 client.

use crate::constants::s3::{DEFAULT_ENDPOINT, DNS_ONLY_PROVIDER};
use crate::errors::{BackupError, Result};
use aws_sdk_s3::config::SharedHttpClient;
use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;
use reqwest::Url;

/// Bucket-in-host versus bucket-in-path addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketLookup {
    /// Virtual-hosted style for well-known public providers, path style otherwise
    Auto,
    Dns,
}

impl BucketLookup {
    pub fn force_path_style(&self, endpoint: &str) -> bool {
        match self {
            BucketLookup::Dns => false,
            BucketLookup::Auto => !is_public_provider(endpoint),
        }
    }
}

pub fn bucket_lookup_for(endpoint: &str) -> BucketLookup {
    if endpoint.contains(DNS_ONLY_PROVIDER) {
        BucketLookup::Dns
    } else {
        BucketLookup::Auto
    }
}

fn host_of(endpoint: &str) -> Option<String> {
    let url = endpoint_url(endpoint)?;
    Url::parse(&url).ok()?.host_str().map(str::to_string)
}

fn is_public_provider(endpoint: &str) -> bool {
    if endpoint.is_empty() || endpoint == DEFAULT_ENDPOINT {
        return true;
    }
    host_of(endpoint).is_some_and(|host| {
        host.ends_with("amazonaws.com")
            || host.ends_with("amazonaws.com.cn")
            || host == "storage.googleapis.com"
    })
}

/// Endpoint URL override for the SDK; `None` lets the SDK resolve the AWS endpoint
pub fn endpoint_url(endpoint: &str) -> Option<String> {
    if endpoint.is_empty() || endpoint == DEFAULT_ENDPOINT {
        return None;
    }
    if endpoint.contains("://") {
        Some(endpoint.to_string())
    } else {
        Some(format!("https://{}", endpoint))
    }
}

/// HTTPS client trusting only the supplied DER roots
pub fn https_client_with_roots(roots: &[Vec<u8>]) -> Result<SharedHttpClient> {
    let mut store = rustls::RootCertStore::empty();
    for der in roots {
        store
            .add(&rustls::Certificate(der.clone()))
            .map_err(|e| BackupError::Tls(format!("cannot trust endpoint CA: {}", e)))?;
    }

    let tls = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(store)
        .with_no_client_auth();

    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .build();

    Ok(HyperClientBuilder::new().build(connector))
}
