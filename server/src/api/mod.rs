//! API Router and Application State
//!
//! Central routing configuration, shared state and the response envelope.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    config::Config,
    db::{Gender, UserRepository, UserStatus},
    storage::{ProfileBackend, ProfileStorage},
    users::{
        self,
        types::{Pagination, UserForm, UserResponse},
        UserStore,
    },
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// User directory operations
    pub users: UserStore,
    /// Profile image backend, chosen at startup
    pub profiles: Arc<dyn ProfileStorage>,
    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        repo: Arc<dyn UserRepository>,
        profiles: Arc<dyn ProfileStorage>,
        config: Config,
    ) -> Self {
        Self {
            users: UserStore::new(repo),
            profiles,
            config: Arc::new(config),
        }
    }
}

/// Response envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub const fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
            count: None,
        }
    }

    /// Successful response carrying `data` and a confirmation message.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::data(data)
        }
    }

    #[must_use]
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

impl ApiResponse<()> {
    /// Successful response with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
            count: None,
        }
    }

    /// Failure response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::message(message)
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Roster API", description = "User directory service"),
    paths(
        users::handlers::create,
        users::handlers::list,
        users::handlers::search,
        users::handlers::export,
        users::handlers::get,
        users::handlers::update,
        users::handlers::delete,
    ),
    components(schemas(UserForm, UserResponse, Pagination, Gender, UserStatus)),
    tags((name = "users", description = "User directory")),
)]
struct ApiDoc;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_request_size = state.config.max_request_size;

    let mut router = Router::new()
        .route("/", get(banner))
        // Health check
        .route("/health", get(health_check))
        // API documentation
        .route("/api/openapi.json", get(openapi))
        .nest("/api/users", users::router());

    // Disk-stored profile images are served from their upload directory
    if state.profiles.backend() == ProfileBackend::Disk {
        if let Some(dir) = &state.config.upload_dir {
            router = router.nest_service("/uploads", ServeDir::new(dir));
        }
    }

    router
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        // Multipart uploads need more than the 2MB default
        .layer(DefaultBodyLimit::max(max_request_size))
        // State
        .with_state(state)
}

#[derive(Serialize)]
struct Banner {
    message: &'static str,
}

async fn banner() -> Json<Banner> {
    Json(Banner {
        message: "User directory API is running",
    })
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Active profile image backend
    profile_storage: ProfileBackend,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        profile_storage: state.profiles.backend(),
    })
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_omits_absent_parts() {
        let value = serde_json::to_value(ApiResponse::<()>::error("User not found")).unwrap();
        assert_eq!(value, json!({ "success": false, "message": "User not found" }));

        let value = serde_json::to_value(
            ApiResponse::data(vec![1, 2]).with_pagination(Pagination::new(1, 10, 2)),
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "data": [1, 2],
                "pagination": { "currentPage": 1, "totalPages": 1, "totalRecords": 2, "limit": 10 }
            })
        );
    }

    #[test]
    fn test_openapi_lists_user_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/users"));
        assert!(doc.paths.paths.contains_key("/api/users/{id}"));
        assert!(doc.paths.paths.contains_key("/api/users/export"));
    }
}
