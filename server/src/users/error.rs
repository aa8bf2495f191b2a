//! User Directory Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::ApiResponse;
use crate::db::RepoError;
use crate::storage::UploadError;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(String),

    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("User not found")]
    NotFound,

    #[error("Only image files are allowed (got {0})")]
    UnsupportedMediaType(String),

    #[error("File too large (max: {max_size} bytes)")]
    PayloadTooLarge { max_size: usize },

    #[error("Image upload failed: {0}")]
    UploadService(String),

    #[error("{0}")]
    Storage(String),
}

impl UserError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::DuplicateEmail
            | Self::UnsupportedMediaType(_)
            | Self::PayloadTooLarge { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UploadService(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for UserError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::DuplicateEmail => Self::DuplicateEmail,
            RepoError::Database(e) => Self::Storage(e.to_string()),
        }
    }
}

impl From<UploadError> for UserError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::UnsupportedMediaType { mime_type } => Self::UnsupportedMediaType(mime_type),
            UploadError::TooLarge { max_size } => Self::PayloadTooLarge { max_size },
            UploadError::Read(_) => Self::Validation(err.to_string()),
            UploadError::Service(msg) => Self::UploadService(msg),
            UploadError::Io(e) => Self::Storage(format!("File storage error: {e}")),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "User directory request failed");
        }

        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(UserError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(UserError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(UserError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            UserError::PayloadTooLarge { max_size: 1 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UserError::UploadService("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upload_errors_convert() {
        let err: UserError = UploadError::TooLarge { max_size: 10 }.into();
        assert!(matches!(err, UserError::PayloadTooLarge { max_size: 10 }));

        let err: UserError = UploadError::Read("boundary".into()).into();
        assert!(matches!(err, UserError::Validation(_)));
    }
}
