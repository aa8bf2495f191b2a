//! User Directory Handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;
use uuid::Uuid;

use super::error::UserError;
use super::export::ExportFile;
use super::form::UserPayload;
use super::types::{ListQuery, Pagination, SearchQuery, UserForm, UserResponse};
use crate::api::{ApiResponse, AppState};

/// Ids that are not valid UUIDs cannot name a record.
fn parse_id(raw: &str) -> Result<Uuid, UserError> {
    Uuid::parse_str(raw).map_err(|_| UserError::NotFound)
}

/// A stored upload whose record write failed stays behind in storage.
fn log_orphaned_upload(uploaded: Option<&str>, err: &UserError) {
    if let Some(reference) = uploaded {
        warn!(reference = %truncate(reference), error = %err, "Profile image stored but record write failed");
    }
}

/// Keep inline data URIs out of log lines.
pub(super) fn truncate(reference: &str) -> &str {
    reference.get(..64).unwrap_or(reference)
}

/// Create a user record.
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body(content = UserForm, description = "JSON body or multipart form with an optional `profile` file"),
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed, email taken, or unacceptable image"),
        (status = 500, description = "Storage or upload service failure"),
    ),
)]
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    payload: UserPayload,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), UserError> {
    let uploaded = payload.uploaded.clone();
    let (form, profile) = payload.into_parts();

    let user = state
        .users
        .create(form, profile)
        .await
        .inspect_err(|e| log_orphaned_upload(uploaded.as_deref(), e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "User created successfully",
            user.into(),
        )),
    ))
}

/// List user records, newest first.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of users", body = [UserResponse]),
    ),
)]
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, UserError> {
    let (page, limit) = (query.page(), query.limit());
    let result = state.users.list(page, limit).await?;

    let users = result.records.into_iter().map(UserResponse::from).collect();
    Ok(Json(
        ApiResponse::data(users).with_pagination(Pagination::new(page, limit, result.total)),
    ))
}

/// Keyword search across the text fields.
#[utoipa::path(
    get,
    path = "/api/users/search",
    tag = "users",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching users", body = [UserResponse]),
        (status = 400, description = "Keyword missing"),
    ),
)]
#[tracing::instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, UserError> {
    let users: Vec<UserResponse> = state
        .users
        .search(query.keyword.as_deref())
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    let count = users.len();
    Ok(Json(ApiResponse::data(users).with_count(count)))
}

/// Download every record as CSV.
#[utoipa::path(
    get,
    path = "/api/users/export",
    tag = "users",
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 500, description = "Export could not be written"),
    ),
)]
#[tracing::instrument(skip(state))]
pub async fn export(State(state): State<AppState>) -> Result<Response, UserError> {
    let records = state.users.all().await?;
    let file = ExportFile::create(&state.config.export_dir, records).await?;
    Ok(file.into_response())
}

/// Fetch one user record.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found"),
    ),
)]
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, UserError> {
    let user = state.users.get(parse_id(&id)?).await?;
    Ok(Json(ApiResponse::data(user.into())))
}

/// Merge-patch a user record.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    request_body(content = UserForm, description = "Fields to change; absent keys stay as they are"),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation failed, email taken, or unacceptable image"),
        (status = 404, description = "User not found"),
    ),
)]
#[tracing::instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: UserPayload,
) -> Result<Json<ApiResponse<UserResponse>>, UserError> {
    let uploaded = payload.uploaded.clone();
    let (form, profile) = payload.into_parts();

    let result = match parse_id(&id) {
        Ok(id) => state.users.update(id, form, profile).await,
        Err(e) => Err(e),
    };
    let user = result.inspect_err(|e| log_orphaned_upload(uploaded.as_deref(), e))?;

    Ok(Json(ApiResponse::with_message(
        "User updated successfully",
        user.into(),
    )))
}

/// Delete a user record.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found"),
    ),
)]
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, UserError> {
    state.users.delete(parse_id(&id)?).await?;
    Ok(Json(ApiResponse::message("User deleted successfully")))
}
