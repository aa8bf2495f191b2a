//! User directory operations on top of the repository port.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::error::UserError;
use super::types::UserForm;
use super::validation;
use crate::db::{UserRecord, UserRepository};

/// One page of records plus the total count.
#[derive(Debug)]
pub struct Page {
    pub records: Vec<UserRecord>,
    pub total: i64,
}

/// Validates input and applies it to the repository.
#[derive(Clone)]
pub struct UserStore {
    repo: Arc<dyn UserRepository>,
}

impl UserStore {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Create a record. `profile` is the already-resolved profile reference.
    pub async fn create(
        &self,
        form: UserForm,
        profile: Option<String>,
    ) -> Result<UserRecord, UserError> {
        let new_user = validation::new_user(form, profile)?;

        // Fast path for the common case; the repository still enforces
        // uniqueness atomically against concurrent inserts.
        if self.repo.find_by_email(&new_user.email).await?.is_some() {
            return Err(UserError::DuplicateEmail);
        }

        let user = self.repo.insert(new_user).await?;
        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<UserRecord, UserError> {
        self.repo.find_by_id(id).await?.ok_or(UserError::NotFound)
    }

    /// Merge-patch update. Only fields present in `form` change.
    pub async fn update(
        &self,
        id: Uuid,
        form: UserForm,
        profile: Option<String>,
    ) -> Result<UserRecord, UserError> {
        let existing = self.get(id).await?;
        let changes = validation::user_changes(form, profile)?;

        if let Some(email) = changes.email.as_deref() {
            if email != existing.email {
                let holder = self.repo.find_by_email(email).await?;
                if holder.is_some_and(|other| other.id != id) {
                    return Err(UserError::DuplicateEmail);
                }
            }
        }

        let user = self
            .repo
            .update(id, changes)
            .await?
            .ok_or(UserError::NotFound)?;
        info!(user_id = %user.id, "User updated");
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), UserError> {
        if !self.repo.delete(id).await? {
            return Err(UserError::NotFound);
        }
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Page `page` (1-based) of `limit` records, newest first.
    pub async fn list(&self, page: u32, limit: u32) -> Result<Page, UserError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let total = self.repo.count().await?;
        let records = self.repo.list(offset, i64::from(limit)).await?;
        Ok(Page { records, total })
    }

    /// Case-insensitive keyword search. A blank keyword is rejected.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<UserRecord>, UserError> {
        let keyword = keyword.map(str::trim).unwrap_or_default();
        if keyword.is_empty() {
            return Err(UserError::Validation("Search keyword is required".into()));
        }
        Ok(self.repo.search(keyword).await?)
    }

    /// Every record, newest first.
    pub async fn all(&self) -> Result<Vec<UserRecord>, UserError> {
        Ok(self.repo.all().await?)
    }
}
