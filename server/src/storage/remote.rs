//! Remote (S3) profile storage.

use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use super::s3::S3Client;
use super::transform::{fill_crop, format_for_mime, ProcessingError};
use super::{ProfileBackend, ProfileStorage, ProfileUpload, UploadError};

/// Object key prefix for all profile images.
pub const PROFILE_NAMESPACE: &str = "user-profiles";

/// Crops images to a fixed square and stores them in S3.
pub struct RemoteProfileStorage {
    s3: S3Client,
    max_size: usize,
}

impl RemoteProfileStorage {
    pub const fn new(s3: S3Client, max_size: usize) -> Self {
        Self { s3, max_size }
    }
}

#[async_trait]
impl ProfileStorage for RemoteProfileStorage {
    fn backend(&self) -> ProfileBackend {
        ProfileBackend::Remote
    }

    async fn resolve(&self, mut upload: ProfileUpload<'_>) -> Result<String, UploadError> {
        upload.ensure_image()?;
        let format = format_for_mime(&upload.content_type).map_err(|_| {
            UploadError::UnsupportedMediaType {
                mime_type: upload.content_type.clone(),
            }
        })?;

        let data = upload.read_limited(self.max_size).await?;

        let content_type = upload.content_type.clone();
        let cropped = tokio::task::spawn_blocking(move || fill_crop(&data, format))
            .await
            .map_err(|e| UploadError::Service(format!("image processing task failed: {e}")))?
            .map_err(|e| match e {
                ProcessingError::EncodeFailed(msg) => UploadError::Service(msg),
                _ => UploadError::UnsupportedMediaType {
                    mime_type: format!("{content_type} (content could not be decoded)"),
                },
            })?;

        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let key = format!("{PROFILE_NAMESPACE}/{}.{extension}", Uuid::now_v7());

        self.s3
            .upload(&key, cropped, &upload.content_type)
            .await
            .map_err(|e| {
                error!(key = %key, "Profile upload to S3 failed: {e}");
                UploadError::Service(e.to_string())
            })?;

        let url = self.s3.public_url(&key);
        info!(key = %key, "Profile image uploaded to S3");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat};

    use super::*;
    use crate::config::Config;

    async fn unreachable_storage() -> RemoteProfileStorage {
        let mut config = Config::default_for_test();
        config.s3_bucket = Some("profiles".into());
        config.s3_access_key = Some("key".into());
        config.s3_secret_key = Some("secret".into());
        config.s3_endpoint = Some("http://127.0.0.1:1".into());

        let s3 = S3Client::new(&config).await.unwrap();
        RemoteProfileStorage::new(s3, config.max_profile_size)
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_upload() {
        let storage = unreachable_storage().await;
        let err = storage
            .resolve(ProfileUpload::from_bytes("me.png", "image/png", png(40, 20)))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Service(_)));
    }

    #[tokio::test]
    async fn test_gif_rejected() {
        let storage = unreachable_storage().await;
        let err = storage
            .resolve(ProfileUpload::from_bytes("me.gif", "image/gif", b"GIF89a".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedMediaType { .. }));
    }

    #[tokio::test]
    async fn test_undecodable_png_rejected() {
        let storage = unreachable_storage().await;
        let err = storage
            .resolve(ProfileUpload::from_bytes("me.png", "image/png", b"not a png".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedMediaType { .. }));
    }

    #[tokio::test]
    async fn test_oversized_rejected_before_upload() {
        let storage = RemoteProfileStorage::new(unreachable_storage().await.s3, 16);
        let err = storage
            .resolve(ProfileUpload::from_bytes("me.png", "image/png", png(40, 20)))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { max_size: 16 }));
    }
}
