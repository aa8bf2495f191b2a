//! Inline profile storage.
//!
//! Fallback when no object storage or upload directory is configured: the
//! image travels inside the record as a `data:` URI. Nothing survives outside
//! the record, and the reference grows with the image.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{ProfileBackend, ProfileStorage, ProfileUpload, UploadError};

/// Encodes images as base64 `data:` URIs.
pub struct InlineProfileStorage {
    max_size: usize,
}

impl InlineProfileStorage {
    pub const fn new(max_size: usize) -> Self {
        Self { max_size }
    }
}

#[async_trait]
impl ProfileStorage for InlineProfileStorage {
    fn backend(&self) -> ProfileBackend {
        ProfileBackend::Inline
    }

    async fn resolve(&self, mut upload: ProfileUpload<'_>) -> Result<String, UploadError> {
        upload.ensure_image()?;
        let data = upload.read_limited(self.max_size).await?;
        Ok(format!(
            "data:{};base64,{}",
            upload.content_type,
            STANDARD.encode(data)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_builds_data_uri() {
        let storage = InlineProfileStorage::new(1024);
        let reference = storage
            .resolve(ProfileUpload::from_bytes("dot.png", "image/png", b"abc".to_vec()))
            .await
            .unwrap();
        assert_eq!(reference, "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_resolve_rejects_non_image() {
        let storage = InlineProfileStorage::new(1024);
        let err = storage
            .resolve(ProfileUpload::from_bytes("notes.txt", "text/plain", b"hi".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedMediaType { .. }));
    }

    #[tokio::test]
    async fn test_resolve_rejects_oversized() {
        let storage = InlineProfileStorage::new(4);
        let err = storage
            .resolve(ProfileUpload::from_bytes("big.png", "image/png", vec![0u8; 5]))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { max_size: 4 }));
    }
}
