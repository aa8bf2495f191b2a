//! Disk-backed profile storage.
//!
//! Streams uploads straight into a local directory that the router serves
//! under `/uploads`. Filenames embed a millisecond timestamp; two uploads of the
//! same name in the same millisecond overwrite each other.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::{sanitize_filename, ProfileBackend, ProfileStorage, ProfileUpload, UploadError};

/// URL prefix under which stored files are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Writes profile images to a local directory.
pub struct DiskProfileStorage {
    dir: PathBuf,
    max_size: usize,
}

impl DiskProfileStorage {
    /// Create the upload directory if needed. Call once at startup.
    pub async fn init(dir: impl Into<PathBuf>, max_size: usize) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir, max_size })
    }

    /// Directory files are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_body(
        &self,
        path: &Path,
        upload: &mut ProfileUpload<'_>,
    ) -> Result<u64, UploadError> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut written: usize = 0;

        while let Some(chunk) = upload.body.next().await {
            let chunk = chunk?;
            written += chunk.len();
            if written > self.max_size {
                return Err(UploadError::TooLarge {
                    max_size: self.max_size,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(written as u64)
    }
}

#[async_trait]
impl ProfileStorage for DiskProfileStorage {
    fn backend(&self) -> ProfileBackend {
        ProfileBackend::Disk
    }

    async fn resolve(&self, mut upload: ProfileUpload<'_>) -> Result<String, UploadError> {
        upload.ensure_image()?;

        let mut original = sanitize_filename(&upload.filename);
        if original.is_empty() {
            original = "image".to_string();
        }
        let filename = format!("profile-{}-{original}", Utc::now().timestamp_millis());
        let path = self.dir.join(&filename);

        match self.write_body(&path, &mut upload).await {
            Ok(size) => {
                debug!(filename = %filename, size, "Profile image written to disk");
                Ok(format!("{UPLOADS_URL_PREFIX}/{filename}"))
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), "Failed to remove partial upload: {rm}");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    const MIB: usize = 1024 * 1024;

    /// Body split into 64 KiB chunks, the way a multipart stream arrives.
    fn chunked(data: Vec<u8>) -> impl futures::Stream<Item = Result<Bytes, UploadError>> {
        let chunks: Vec<_> = data
            .chunks(64 * 1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        stream::iter(chunks)
    }

    fn fake_jpeg(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
        data
    }

    #[tokio::test]
    async fn test_accepts_one_mib_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskProfileStorage::init(dir.path().join("uploads"), 5 * MIB)
            .await
            .unwrap();

        let upload = ProfileUpload::new("me.jpg", "image/jpeg", chunked(fake_jpeg(MIB)));
        let reference = storage.resolve(upload).await.unwrap();

        let name = reference.strip_prefix("/uploads/").unwrap();
        assert!(name.starts_with("profile-"));
        assert!(name.ends_with("-me.jpg"));

        let written = std::fs::read(storage.dir().join(name)).unwrap();
        assert_eq!(written.len(), MIB);
        assert_eq!(&written[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn test_rejects_six_mib_and_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskProfileStorage::init(dir.path(), 5 * MIB).await.unwrap();

        let upload = ProfileUpload::new("big.jpg", "image/jpeg", chunked(fake_jpeg(6 * MIB)));
        let err = storage.resolve(upload).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { max_size } if max_size == 5 * MIB));

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_rejects_non_image_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskProfileStorage::init(dir.path(), 5 * MIB).await.unwrap();

        let upload = ProfileUpload::from_bytes("cv.pdf", "application/pdf", vec![1u8; 10]);
        let err = storage.resolve(upload).await.unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedMediaType { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_path_components_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskProfileStorage::init(dir.path(), 5 * MIB).await.unwrap();

        let upload = ProfileUpload::from_bytes("../../evil.png", "image/png", vec![1u8; 10]);
        let reference = storage.resolve(upload).await.unwrap();
        assert!(reference.ends_with("-evil.png"));
        assert!(!reference.contains(".."));
    }
}
