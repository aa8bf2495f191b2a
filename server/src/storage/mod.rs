//! Profile Image Storage
//!
//! Turns an uploaded profile image into a reference string stored on the user
//! record. Three interchangeable backends implement [`ProfileStorage`]:
//!
//! - [`RemoteProfileStorage`]: S3-compatible object storage (public URL)
//! - [`DiskProfileStorage`]: local directory served under `/uploads`
//! - [`InlineProfileStorage`]: base64 `data:` URI, no persistence
//!
//! The backend is chosen once at startup by [`select_backend`].

mod disk;
mod inline;
mod remote;
pub mod s3;
pub mod transform;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use tracing::{info, warn};

pub use disk::DiskProfileStorage;
pub use inline::InlineProfileStorage;
pub use remote::RemoteProfileStorage;
pub use s3::S3Client;

use crate::config::Config;

/// Errors that can occur while storing a profile image.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Declared media type is not an accepted image type.
    #[error("Only image files are allowed (got {mime_type})")]
    UnsupportedMediaType {
        /// The rejected MIME type.
        mime_type: String,
    },

    /// Payload exceeds the configured limit.
    #[error("File too large (max: {max_size} bytes)")]
    TooLarge {
        /// Maximum allowed size in bytes.
        max_size: usize,
    },

    /// The request body could not be read.
    #[error("File upload failed: {0}")]
    Read(String),

    /// Remote object storage rejected the upload or was unreachable.
    #[error("Upload service error: {0}")]
    Service(String),

    /// Local filesystem error.
    #[error("Upload storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// An inbound profile attachment.
pub struct ProfileUpload<'a> {
    /// Original filename as sent by the client.
    pub filename: String,
    /// Declared MIME type.
    pub content_type: String,
    /// File body, chunk by chunk.
    pub body: BoxStream<'a, Result<Bytes, UploadError>>,
}

impl<'a> ProfileUpload<'a> {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        body: impl futures::Stream<Item = Result<Bytes, UploadError>> + Send + 'a,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            body: body.boxed(),
        }
    }

    /// Reject anything not declared as an image.
    pub fn ensure_image(&self) -> Result<(), UploadError> {
        if self.content_type.starts_with("image/") {
            Ok(())
        } else {
            Err(UploadError::UnsupportedMediaType {
                mime_type: self.content_type.clone(),
            })
        }
    }

    /// Buffer the whole body, failing as soon as it exceeds `max_size`.
    pub async fn read_limited(&mut self, max_size: usize) -> Result<Vec<u8>, UploadError> {
        let mut data = Vec::new();
        while let Some(chunk) = self.body.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > max_size {
                return Err(UploadError::TooLarge { max_size });
            }
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }
}

impl ProfileUpload<'static> {
    /// Build an upload from an in-memory buffer.
    pub fn from_bytes(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data: Bytes = data.into();
        Self::new(filename, content_type, stream::iter([Ok(data)]))
    }
}

/// Resolves a profile upload to a stored reference.
#[async_trait]
pub trait ProfileStorage: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> ProfileBackend;

    /// Store the upload and return the reference to save on the record.
    async fn resolve(&self, upload: ProfileUpload<'_>) -> Result<String, UploadError>;
}

/// Available profile storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileBackend {
    Remote,
    Disk,
    Inline,
}

/// Pick the backend from configuration presence alone.
pub fn select_backend(config: &Config) -> ProfileBackend {
    if config.has_s3() {
        ProfileBackend::Remote
    } else if config.upload_dir.is_some() {
        ProfileBackend::Disk
    } else {
        ProfileBackend::Inline
    }
}

/// Build the profile storage backend. Called once at startup.
pub async fn build_profile_storage(config: &Config) -> anyhow::Result<Arc<dyn ProfileStorage>> {
    match select_backend(config) {
        ProfileBackend::Remote => {
            let client = S3Client::new(config).await?;
            if let Err(e) = client.health_check().await {
                warn!("S3 health check failed: {}. Profile uploads will fail until it recovers.", e);
            } else {
                info!(bucket = %client.bucket(), "Using S3 for profile images");
            }
            Ok(Arc::new(RemoteProfileStorage::new(
                client,
                config.max_profile_size,
            )))
        }
        ProfileBackend::Disk => {
            let Some(dir) = config.upload_dir.clone() else {
                anyhow::bail!("UPLOAD_DIR must be set for disk profile storage");
            };
            let storage = DiskProfileStorage::init(dir, config.max_profile_size).await?;
            info!(dir = %storage.dir().display(), "Using local disk for profile images");
            Ok(Arc::new(storage))
        }
        ProfileBackend::Inline => {
            warn!("No S3 or UPLOAD_DIR configured - profile images are stored inline in records");
            Ok(Arc::new(InlineProfileStorage::new(config.max_profile_size)))
        }
    }
}

/// Sanitize a filename to prevent path traversal and other issues.
pub(crate) fn sanitize_filename(filename: &str) -> String {
    // Extract just the filename part (no directory components)
    let name = std::path::Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    // Keep alphanumeric, dots, dashes, underscores
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '-' || *c == '_')
        .take(200)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_backend_prefers_s3() {
        let mut config = Config::default_for_test();
        assert_eq!(select_backend(&config), ProfileBackend::Inline);

        config.upload_dir = Some("/tmp/roster-uploads".into());
        assert_eq!(select_backend(&config), ProfileBackend::Disk);

        config.s3_bucket = Some("profiles".into());
        config.s3_access_key = Some("key".into());
        config.s3_secret_key = Some("secret".into());
        assert_eq!(select_backend(&config), ProfileBackend::Remote);
    }

    #[test]
    fn test_select_backend_ignores_partial_s3_credentials() {
        let mut config = Config::default_for_test();
        config.s3_bucket = Some("profiles".into());
        assert_eq!(select_backend(&config), ProfileBackend::Inline);
    }

    #[test]
    fn test_ensure_image() {
        assert!(ProfileUpload::from_bytes("a.png", "image/png", vec![1u8])
            .ensure_image()
            .is_ok());
        let err = ProfileUpload::from_bytes("a.pdf", "application/pdf", vec![1u8])
            .ensure_image()
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedMediaType { .. }));
    }

    #[tokio::test]
    async fn test_read_limited_stops_at_limit() {
        let chunks = vec![Ok(Bytes::from(vec![0u8; 600])), Ok(Bytes::from(vec![0u8; 600]))];
        let mut upload = ProfileUpload::new("a.png", "image/png", stream::iter(chunks));
        let err = upload.read_limited(1000).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { max_size: 1000 }));

        let mut upload = ProfileUpload::from_bytes("a.png", "image/png", vec![0u8; 1000]);
        assert_eq!(upload.read_limited(1000).await.unwrap().len(), 1000);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("avatar.png"), "avatar.png");
        assert_eq!(sanitize_filename("../../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my photo<1>.jpg"), "myphoto1.jpg");
        assert_eq!(sanitize_filename(""), "");
    }
}
