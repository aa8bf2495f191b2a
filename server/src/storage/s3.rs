//! S3 Object Store
//!
//! Thin wrapper over `aws-sdk-s3` for the remote profile backend. Works with
//! AWS S3 and S3-compatible services (MinIO, R2, B2) through `S3_ENDPOINT`.

use aws_config::Region;
use aws_sdk_s3::config::{
    Credentials, IdentityCache, SharedCredentialsProvider, StalledStreamProtectionConfig,
};
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_async::rt::sleep::TokioSleep;
use thiserror::Error;
use tracing::info;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum S3Error {
    #[error("S3_BUCKET, AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must all be set")]
    MissingCredentials,

    #[error("Bucket '{bucket}' is not reachable: {reason}")]
    Unreachable { bucket: String, reason: String },

    #[error("Storing '{key}' failed: {reason}")]
    Put { key: String, reason: String },
}

/// Bucket handle plus the base URL objects are published under.
#[derive(Clone)]
pub struct S3Client {
    sdk: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

fn sdk_config(config: &Config, access_key: String, secret_key: String) -> aws_sdk_s3::Config {
    let credentials = Credentials::new(access_key, secret_key, None, None, "roster-config");
    let builder = aws_sdk_s3::Config::builder()
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(SharedCredentialsProvider::new(credentials))
        .identity_cache(IdentityCache::no_cache())
        .sleep_impl(TokioSleep::new())
        .stalled_stream_protection(StalledStreamProtectionConfig::disabled());

    // Custom endpoints are addressed path-style
    match &config.s3_endpoint {
        Some(endpoint) => builder.endpoint_url(endpoint).force_path_style(true).build(),
        None => builder.build(),
    }
}

impl S3Client {
    /// Build a client from the static credentials in `config`.
    pub async fn new(config: &Config) -> Result<Self, S3Error> {
        let (Some(bucket), Some(access_key), Some(secret_key)) = (
            config.s3_bucket.clone(),
            config.s3_access_key.clone(),
            config.s3_secret_key.clone(),
        ) else {
            return Err(S3Error::MissingCredentials);
        };

        let sdk = aws_sdk_s3::Client::from_conf(sdk_config(config, access_key, secret_key));
        let public_base = public_base_url(config, &bucket);
        info!(bucket = %bucket, public_base = %public_base, "S3 object store configured");

        Ok(Self {
            sdk,
            bucket,
            public_base,
        })
    }

    /// Store `body` under `key`.
    pub async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), S3Error> {
        let request = self
            .sdk
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body));

        match request.send().await {
            Ok(_) => Ok(()),
            Err(e) => Err(S3Error::Put {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Probe the bucket with `HeadBucket`.
    pub async fn health_check(&self) -> Result<(), S3Error> {
        let probe = self.sdk.head_bucket().bucket(&self.bucket).send().await;
        probe.map(|_| ()).map_err(|e| S3Error::Unreachable {
            bucket: self.bucket.clone(),
            reason: e.to_string(),
        })
    }

    /// Public URL of an object.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Base URL objects are reachable under, without a trailing slash.
fn public_base_url(config: &Config, bucket: &str) -> String {
    if let Some(base) = &config.s3_public_url {
        return base.trim_end_matches('/').to_string();
    }
    match &config.s3_endpoint {
        Some(endpoint) => format!("{}/{bucket}", endpoint.trim_end_matches('/')),
        None => format!("https://{bucket}.s3.{}.amazonaws.com", config.s3_region),
    }
}
