//! In-memory user repository.
//!
//! Used when no `PostgreSQL` URL is configured and by the test suite. Records
//! are kept in insertion order; every read walks them newest first.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{NewUserRecord, UserChanges, UserRecord};
use super::{RepoError, UserRepository};

/// Process-local user repository.
#[derive(Default)]
pub struct MemoryUserRepository {
    records: RwLock<Vec<UserRecord>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(records: &[UserRecord], email: &str, except: Option<Uuid>) -> bool {
    records
        .iter()
        .any(|r| Some(r.id) != except && r.email.eq_ignore_ascii_case(email))
}

fn matches_keyword(record: &UserRecord, needle: &str) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(needle);

    contains(&record.first_name)
        || contains(&record.last_name)
        || contains(&record.email)
        || contains(&record.mobile)
        || contains(record.gender.as_str())
        || contains(&record.location)
        || record.status.as_str().to_lowercase() == needle
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: NewUserRecord) -> Result<UserRecord, RepoError> {
        // Check and write under one lock so concurrent inserts cannot both pass.
        let mut records = self.records.write().await;
        if email_taken(&records, &user.email, None) {
            return Err(RepoError::DuplicateEmail);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::now_v7(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            mobile: user.mobile,
            gender: user.gender,
            status: user.status,
            profile: user.profile,
            location: user.location,
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, RepoError> {
        let mut records = self.records.write().await;
        if let Some(email) = &changes.email {
            if email_taken(&records, email, Some(id)) {
                return Err(RepoError::DuplicateEmail);
            }
        }

        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        changes.apply(record);
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn count(&self) -> Result<i64, RepoError> {
        Ok(self.records.read().await.len() as i64)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<UserRecord>, RepoError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn search(&self, keyword: &str) -> Result<Vec<UserRecord>, RepoError> {
        let needle = keyword.to_lowercase();
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| matches_keyword(r, &needle))
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<UserRecord>, RepoError> {
        let records = self.records.read().await;
        Ok(records.iter().rev().cloned().collect())
    }
}
