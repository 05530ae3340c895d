//! S3-backed photo storage.
//!
//! Upload URLs are SigV4 presigned `PUT` requests computed locally; only
//! `delete_object` talks to the bucket.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use tracing::{debug, error};

use umapic_core::{Error, PhotoStorage, Result};

/// PhotoStorage over one S3 bucket.
#[derive(Clone)]
pub struct S3PhotoStorage {
    client: Client,
    bucket: String,
}

impl std::fmt::Debug for S3PhotoStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3PhotoStorage")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl S3PhotoStorage {
    /// Build a client from the shared SDK config.
    ///
    /// `endpoint` points the client at an S3-compatible store (MinIO,
    /// LocalStack), which also switches to path-style addressing.
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        bucket: impl Into<String>,
        endpoint: Option<String>,
    ) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::from_client(Client::from_conf(builder.build()), bucket)
    }

    /// Load region and credentials from the standard AWS environment.
    pub async fn from_env(bucket: impl Into<String>, endpoint: Option<String>) -> Self {
        let sdk_config = aws_config::load_from_env().await;
        Self::new(&sdk_config, bucket, endpoint)
    }

    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl PhotoStorage for S3PhotoStorage {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| Error::Storage(format!("invalid presign expiry: {e}")))?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| {
                error!(
                    subsystem = "storage",
                    component = "s3",
                    op = "presign_upload",
                    key,
                    error = %DisplayErrorContext(&e),
                    "Failed to presign upload"
                );
                Error::Storage(DisplayErrorContext(&e).to_string())
            })?;

        debug!(
            subsystem = "storage",
            component = "s3",
            op = "presign_upload",
            key,
            expires_secs = expires_in.as_secs(),
            "Presigned upload URL"
        );
        Ok(presigned.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Storage(DisplayErrorContext(&e).to_string()))?;

        debug!(
            subsystem = "storage",
            component = "s3",
            op = "delete_object",
            key,
            "Deleted object"
        );
        Ok(())
    }
}
