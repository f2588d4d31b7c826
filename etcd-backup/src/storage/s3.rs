use super::{transport, ByteStream, KeyStream, ObjectKey, ObjectMeta, ObjectStore, ObjectStoreConnector};
use crate::config::secrets::{decode_credential, read_endpoint_ca};
use crate::config::{RetryPolicy, S3Config};
use crate::constants::s3::DEFAULT_ENDPOINT;
use crate::errors::{BackupError, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, SharedHttpClient};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream as SdkByteStream;
use aws_sdk_s3::types::BucketVersioningStatus;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Object store handle bound to one bucket of an S3-compatible service
pub struct S3Gateway {
    client: Client,
    bucket: String,
    transfer_attempts: u32,
    retry_interval: Duration,
}

impl S3Gateway {
    /// Build a client and confirm the bucket exists, retrying transient failures
    pub async fn connect(config: &S3Config, policy: &RetryPolicy) -> Result<Self> {
        config.require_bucket()?;

        // An unusable CA is fatal and never retried
        let http_client = if config.endpoint_ca.is_empty() {
            None
        } else {
            let roots = read_endpoint_ca(&config.endpoint_ca)?;
            Some(transport::https_client_with_roots(&roots)?)
        };

        let attempts = policy.connect_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let gateway = Self {
                client: Self::build_client(config, http_client.clone()).await,
                bucket: config.bucket_name.clone(),
                transfer_attempts: policy.s3_attempts.max(1),
                retry_interval: policy.failure_interval,
            };

            match gateway.bucket_exists().await {
                Ok(true) => {
                    info!("✓ Connected to bucket [{}]", config.bucket_name);
                    return Ok(gateway);
                }
                Ok(false) => return Err(BackupError::BucketNotFound(config.bucket_name.clone())),
                Err(e) => {
                    warn!(attempt, error = %e, "Failed to reach object store");
                    last_error = e.to_string();
                }
            }
        }

        Err(BackupError::Connection {
            attempts,
            reason: last_error,
        })
    }

    async fn build_client(config: &S3Config, http_client: Option<SharedHttpClient>) -> Client {
        let region = Region::new(config.region_or_default().to_string());

        let mut builder = if config.has_static_credentials() {
            let credentials = Credentials::new(
                decode_credential(&config.access_key),
                decode_credential(&config.secret_key),
                None,
                None,
                "etcd-backup",
            );
            aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(credentials)
        } else {
            debug!("No static credentials configured, using ambient IAM credentials");
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await;
            aws_sdk_s3::config::Builder::from(&shared)
        };

        let endpoint = if config.endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            config.endpoint.as_str()
        };
        if let Some(url) = transport::endpoint_url(endpoint) {
            builder = builder.endpoint_url(url);
        }
        builder = builder
            .force_path_style(transport::bucket_lookup_for(endpoint).force_path_style(endpoint));
        if let Some(http_client) = http_client {
            builder = builder.http_client(http_client);
        }

        Client::from_conf(builder.build())
    }

    async fn bucket_exists(&self) -> Result<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(BackupError::ObjectStore {
                operation: "head bucket",
                target: self.bucket.clone(),
                reason: DisplayErrorContext(&e).to_string(),
            }),
        }
    }
}

fn to_chrono(t: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.secs(), t.subsec_nanos())
}

#[async_trait]
impl ObjectStore for S3Gateway {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
        let mut last_error = String::new();

        for attempt in 1..=self.transfer_attempts {
            let body = SdkByteStream::from_path(path)
                .await
                .map_err(|e| BackupError::io(path, std::io::Error::other(e)))?;

            match self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type(content_type)
                .body(body)
                .send()
                .await
            {
                Ok(_) => {
                    info!("✓ Uploaded {} to [{}/{}]", path.display(), self.bucket, key);
                    return Ok(());
                }
                Err(e) => {
                    last_error = DisplayErrorContext(&e).to_string();
                    warn!(attempt, key, error = %last_error, "Upload attempt failed");
                    if attempt < self.transfer_attempts {
                        tokio::time::sleep(self.retry_interval).await;
                    }
                }
            }
        }

        Err(BackupError::Upload {
            key: key.to_string(),
            attempts: self.transfer_attempts,
            reason: last_error,
        })
    }

    async fn get(&self, key: &str) -> Result<ByteStream> {
        let mut last_error = String::new();

        for attempt in 1..=self.transfer_attempts {
            match self.client.get_object().bucket(&self.bucket).key(key).send().await {
                Ok(output) => {
                    let key = key.to_string();
                    let stream = futures::stream::try_unfold(output.body, move |mut body| {
                        let key = key.clone();
                        async move {
                            match body.try_next().await {
                                Ok(Some(chunk)) => Ok(Some((chunk, body))),
                                Ok(None) => Ok(None),
                                Err(e) => Err(BackupError::Download {
                                    key,
                                    reason: e.to_string(),
                                }),
                            }
                        }
                    });
                    return Ok(stream.boxed());
                }
                Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                    return Err(BackupError::NotFound(format!("object [{}]", key)));
                }
                Err(e) => {
                    last_error = DisplayErrorContext(&e).to_string();
                    warn!(attempt, key, error = %last_error, "Download attempt failed");
                    if attempt < self.transfer_attempts {
                        tokio::time::sleep(self.retry_interval).await;
                    }
                }
            }
        }

        Err(BackupError::Download {
            key: key.to_string(),
            reason: last_error,
        })
    }

    fn list<'a>(&'a self, prefix: &'a str, recursive: bool) -> KeyStream<'a> {
        // State: `Some(token)` while another page may follow
        let pages = futures::stream::try_unfold(Some(None::<String>), move |state| async move {
            let Some(token) = state else {
                return Ok(None);
            };

            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if !recursive {
                request = request.delimiter("/");
            }
            if let Some(token) = token {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|e| BackupError::List {
                prefix: prefix.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

            let keys: Vec<Result<ObjectKey>> = output
                .contents()
                .iter()
                .filter_map(|object| {
                    object.key().map(|key| {
                        Ok(ObjectKey {
                            key: key.to_string(),
                            last_modified: object.last_modified().and_then(to_chrono),
                        })
                    })
                })
                .collect();

            let next = if output.is_truncated().unwrap_or(false) {
                output
                    .next_continuation_token()
                    .map(|token| Some(token.to_string()))
            } else {
                None
            };

            Ok(Some((futures::stream::iter(keys), next)))
        });

        pages.try_flatten().boxed()
    }

    async fn stat(&self, key: &str) -> Result<Option<ObjectMeta>> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => Ok(Some(ObjectMeta {
                key: key.to_string(),
                size: output.content_length().unwrap_or(0).max(0) as u64,
                last_modified: output.last_modified().and_then(to_chrono),
            })),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(BackupError::ObjectStore {
                operation: "stat",
                target: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            }),
        }
    }

    async fn versioning_enabled(&self) -> Result<bool> {
        let output = self
            .client
            .get_bucket_versioning()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| BackupError::ObjectStore {
                operation: "get bucket versioning",
                target: self.bucket.clone(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(output.status() == Some(&BucketVersioningStatus::Enabled))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => {
                info!("Removed [{}/{}]", self.bucket, key);
                Ok(())
            }
            Err(e) => {
                let reason = DisplayErrorContext(&e).to_string();
                warn!(key, error = %reason, "Failed to remove object");
                Err(BackupError::Remove {
                    key: key.to_string(),
                    reason,
                })
            }
        }
    }
}

/// Connects `S3Gateway` handles with a fixed retry policy
pub struct S3Connector {
    policy: RetryPolicy,
}

impl S3Connector {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl ObjectStoreConnector for S3Connector {
    async fn connect(&self, config: &S3Config) -> Result<Arc<dyn ObjectStore>> {
        let gateway = S3Gateway::connect(config, &self.policy).await?;
        Ok(Arc::new(gateway))
    }
}
