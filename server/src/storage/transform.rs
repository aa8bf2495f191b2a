//! Profile image transformation for remote storage.
//!
//! Every image stored remotely is cropped to a fixed square so listings can
//! render avatars without client-side resizing.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Limits};
use thiserror::Error;

/// Edge length of the stored square (px).
pub const PROFILE_DIMENSION: u32 = 500;

/// Maximum source dimension, to bound decode memory.
const MAX_IMAGE_DIMENSION: u32 = 8192;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Image decode failed: {0}")]
    DecodeFailed(String),
    #[error("Image encoding failed: {0}")]
    EncodeFailed(String),
}

/// Formats accepted for remote profile storage.
pub fn format_for_mime(mime_type: &str) -> Result<ImageFormat, ProcessingError> {
    match mime_type {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Ok(ImageFormat::Jpeg),
        other => Err(ProcessingError::UnsupportedFormat(other.to_string())),
    }
}

/// Scale and center-crop an image to `PROFILE_DIMENSION` square, re-encoded
/// in its source format.
///
/// CPU-bound; call inside `spawn_blocking`.
pub fn fill_crop(data: &[u8], format: ImageFormat) -> Result<Vec<u8>, ProcessingError> {
    let mut reader = ImageReader::with_format(Cursor::new(data), format);
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    reader.limits(limits);

    let img = reader
        .decode()
        .map_err(|e| ProcessingError::DecodeFailed(e.to_string()))?;

    let cropped = img.resize_to_fill(PROFILE_DIMENSION, PROFILE_DIMENSION, FilterType::Lanczos3);
    // JPEG has no alpha channel
    let cropped = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(cropped.to_rgb8())
    } else {
        cropped
    };

    let mut buf = Cursor::new(Vec::new());
    cropped
        .write_to(&mut buf, format)
        .map_err(|e| ProcessingError::EncodeFailed(e.to_string()))?;
    Ok(buf.into_inner())
}
