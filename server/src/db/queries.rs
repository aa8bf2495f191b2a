//! `PostgreSQL` Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};
use tracing::error;
use uuid::Uuid;

use super::models::{NewUserRecord, UserChanges, UserRecord};
use super::{RepoError, UserRepository};

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
    ($query:expr) => {
        |e| {
            error!(query = $query, error = %e, "Database query failed");
            e
        }
    };
}

const ORDER_NEWEST_FIRST: &str = " ORDER BY created_at DESC, id DESC";

/// `PostgreSQL`-backed user repository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a unique-index violation on email to `RepoError::DuplicateEmail`.
fn map_write_error(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::DuplicateEmail,
        _ => RepoError::Database(e),
    }
}

/// Escape `LIKE` wildcards so the keyword is matched literally.
pub(crate) fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: NewUserRecord) -> Result<UserRecord, RepoError> {
        let id = Uuid::now_v7();
        sqlx::query_as::<_, UserRecord>(
            r"
            INSERT INTO user_records
                (id, first_name, last_name, email, mobile, gender, status, profile, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(user.gender)
        .bind(user.status)
        .bind(&user.profile)
        .bind(&user.location)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error!("insert_user_record", email = %user.email))
        .map_err(map_write_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM user_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error!("find_user_record_by_id", user_id = %id))?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT * FROM user_records WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error!("find_user_record_by_email", email = %email))?;
        Ok(user)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, RepoError> {
        let mut builder = QueryBuilder::new("UPDATE user_records SET updated_at = NOW()");

        if let Some(v) = changes.first_name {
            builder.push(", first_name = ").push_bind(v);
        }
        if let Some(v) = changes.last_name {
            builder.push(", last_name = ").push_bind(v);
        }
        if let Some(v) = changes.email {
            builder.push(", email = ").push_bind(v);
        }
        if let Some(v) = changes.mobile {
            builder.push(", mobile = ").push_bind(v);
        }
        if let Some(v) = changes.gender {
            builder.push(", gender = ").push_bind(v);
        }
        if let Some(v) = changes.status {
            builder.push(", status = ").push_bind(v);
        }
        if let Some(v) = changes.profile {
            builder.push(", profile = ").push_bind(v);
        }
        if let Some(v) = changes.location {
            builder.push(", location = ").push_bind(v);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        builder
            .build_query_as::<UserRecord>()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error!("update_user_record", user_id = %id))
            .map_err(map_write_error)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM user_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error!("delete_user_record", user_id = %id))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_records")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error!("count_user_records"))?;
        Ok(count)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<UserRecord>, RepoError> {
        let users = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT * FROM user_records{ORDER_NEWEST_FIRST} LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error!("list_user_records", offset = offset, limit = limit))?;
        Ok(users)
    }

    async fn search(&self, keyword: &str) -> Result<Vec<UserRecord>, RepoError> {
        let pattern = format!("%{}%", escape_like(keyword));
        let users = sqlx::query_as::<_, UserRecord>(&format!(
            r"
            SELECT * FROM user_records
            WHERE first_name ILIKE $1 ESCAPE '\'
               OR last_name ILIKE $1 ESCAPE '\'
               OR email ILIKE $1 ESCAPE '\'
               OR mobile ILIKE $1 ESCAPE '\'
               OR gender::text ILIKE $1 ESCAPE '\'
               OR location ILIKE $1 ESCAPE '\'
               OR LOWER(status::text) = LOWER($2)
            {ORDER_NEWEST_FIRST}
            "
        ))
        .bind(pattern)
        .bind(keyword)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error!("search_user_records", keyword = %keyword))?;
        Ok(users)
    }

    async fn all(&self) -> Result<Vec<UserRecord>, RepoError> {
        let users = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT * FROM user_records{ORDER_NEWEST_FIRST}"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error!("all_user_records"))?;
        Ok(users)
    }
}
