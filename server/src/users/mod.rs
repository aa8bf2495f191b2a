//! User Directory
//!
//! CRUD, paginated listing, keyword search and CSV export of user records.

mod error;
pub mod export;
pub mod form;
pub mod handlers;
mod store;
pub mod types;
pub mod validation;

use axum::routing::get;
use axum::Router;

pub use error::UserError;
pub use store::{Page, UserStore};

use crate::api::AppState;

/// Routes mounted under `/api/users`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list).post(handlers::create))
        .route("/search", get(handlers::search))
        .route("/export", get(handlers::export))
        .route(
            "/{id}",
            get(handlers::get)
                .put(handlers::update)
                .delete(handlers::delete),
        )
}
