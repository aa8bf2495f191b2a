//! Request body extraction for create and update.
//!
//! Accepts `application/json` or `multipart/form-data`. In a multipart body the
//! `profile` file part is handed to the configured [`ProfileStorage`] while the
//! other parts are read as text fields.

use std::collections::HashMap;

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use futures::StreamExt;
use tracing::{debug, warn};

use super::error::UserError;
use super::handlers::truncate;
use super::types::{UserForm, PROFILE_FIELD};
use crate::api::AppState;
use crate::storage::{ProfileStorage, ProfileUpload, UploadError};

/// Fallback when neither the part nor the filename names a type.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Submitted fields plus the reference of a freshly stored profile image.
#[derive(Debug, Default)]
pub struct UserPayload {
    pub form: UserForm,
    /// Set when a profile file was uploaded in this request.
    pub uploaded: Option<String>,
}

impl UserPayload {
    /// Split into the form and the profile reference to save.
    ///
    /// An uploaded file wins over a textual `profile` value.
    pub fn into_parts(mut self) -> (UserForm, Option<String>) {
        let passthrough = self.form.profile.take();
        let profile = self.uploaded.or(passthrough);
        (self.form, profile)
    }
}

impl FromRequest<AppState> for UserPayload {
    type Rejection = UserError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| UserError::Validation(e.body_text()))?;
            read_multipart(multipart, state.profiles.as_ref()).await
        } else if content_type.starts_with("application/json") {
            let Json(form) = Json::<UserForm>::from_request(req, state)
                .await
                .map_err(|e| UserError::Validation(e.body_text()))?;
            Ok(Self {
                form,
                uploaded: None,
            })
        } else {
            // No recognized body: every field is absent.
            Ok(Self::default())
        }
    }
}

/// Read all parts, storing the profile file as it streams in.
pub async fn read_multipart(
    mut multipart: Multipart,
    storage: &dyn ProfileStorage,
) -> Result<UserPayload, UserError> {
    let mut fields = HashMap::new();
    let mut uploaded: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Read(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(ToString::to_string);

        match filename {
            Some(filename) if name == PROFILE_FIELD => {
                // Browsers send an empty, unnamed part when no file was chosen.
                if filename.is_empty() {
                    continue;
                }
                if let Some(stored) = &uploaded {
                    warn!(reference = %truncate(stored), "Second profile part rejected; stored image left behind");
                    return Err(UserError::Validation(
                        "Only one profile image can be uploaded".into(),
                    ));
                }
                let content_type = field
                    .content_type()
                    .map(ToString::to_string)
                    .or_else(|| {
                        mime_guess::from_path(&filename)
                            .first()
                            .map(|m| m.essence_str().to_string())
                    })
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

                debug!(filename = %filename, content_type = %content_type, "Receiving profile upload");
                let body = field.map(|chunk| chunk.map_err(|e| UploadError::Read(e.body_text())));
                let upload = ProfileUpload::new(filename, content_type, body);
                uploaded = Some(storage.resolve(upload).await?);
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| UploadError::Read(e.body_text()))?;
                fields.insert(name, value);
            }
        }
    }

    Ok(UserPayload {
        form: UserForm::from_fields(fields),
        uploaded,
    })
}
