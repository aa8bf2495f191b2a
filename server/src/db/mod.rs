//! Database Layer
//!
//! Persistence port for user records with `PostgreSQL` and in-memory backends.
//! The backend is chosen once at startup from the connection string.

mod memory;
mod models;
mod queries;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub use memory::MemoryUserRepository;
pub use models::*;
pub use queries::PgUserRepository;

use crate::config::{Config, StoreBackend};

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Another record already holds this email.
    #[error("User with this email already exists")]
    DuplicateEmail,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence port for user records.
///
/// Every listing is ordered newest first. Implementations enforce email
/// uniqueness atomically on `insert` and `update`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a record with a fresh id and timestamps.
    async fn insert(&self, user: NewUserRecord) -> Result<UserRecord, RepoError>;

    /// Find a record by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    /// Find a record by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    /// Apply changes and bump `updated_at`. Returns `None` if the id is unknown.
    async fn update(&self, id: Uuid, changes: UserChanges)
        -> Result<Option<UserRecord>, RepoError>;

    /// Delete a record. Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;

    /// Total number of records.
    async fn count(&self) -> Result<i64, RepoError>;

    /// One page of records.
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<UserRecord>, RepoError>;

    /// Records matching a keyword (substring on text fields, exact on status).
    async fn search(&self, keyword: &str) -> Result<Vec<UserRecord>, RepoError>;

    /// Every record.
    async fn all(&self) -> Result<Vec<UserRecord>, RepoError>;
}

/// Create `PostgreSQL` connection pool with health configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(10)
        // Prevent hanging requests on pool exhaustion
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

/// Build the repository selected by the configured connection string.
pub async fn connect(config: &Config) -> Result<Arc<dyn UserRepository>> {
    match config.store_backend() {
        StoreBackend::Postgres(url) => {
            let pool = create_pool(&url).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(PgUserRepository::new(pool)))
        }
        StoreBackend::Memory => {
            warn!("No PostgreSQL DATABASE_URL configured - records are kept in memory only");
            Ok(Arc::new(MemoryUserRepository::new()))
        }
    }
}
