//! Database Models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User directory record.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub gender: Gender,
    pub status: UserStatus,
    pub profile: Option<String>,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Display name derived from first and last name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "user_gender")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Self::Male),
            "Female" => Ok(Self::Female),
            _ => Err(()),
        }
    }
}

/// Account status.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema,
)]
#[sqlx(type_name = "user_status")]
pub enum UserStatus {
    #[default]
    Active,
    InActive,
}

impl UserStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::InActive => "InActive",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "InActive" => Ok(Self::InActive),
            _ => Err(()),
        }
    }
}

/// Validated fields for a new record. Id and timestamps are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub gender: Gender,
    pub status: UserStatus,
    pub profile: Option<String>,
    pub location: String,
}

/// Validated field changes. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub gender: Option<Gender>,
    pub status: Option<UserStatus>,
    pub profile: Option<String>,
    pub location: Option<String>,
}

impl UserChanges {
    /// Apply the changes to a record in place.
    pub fn apply(&self, record: &mut UserRecord) {
        if let Some(v) = &self.first_name {
            record.first_name.clone_from(v);
        }
        if let Some(v) = &self.last_name {
            record.last_name.clone_from(v);
        }
        if let Some(v) = &self.email {
            record.email.clone_from(v);
        }
        if let Some(v) = &self.mobile {
            record.mobile.clone_from(v);
        }
        if let Some(v) = self.gender {
            record.gender = v;
        }
        if let Some(v) = self.status {
            record.status = v;
        }
        if let Some(v) = &self.profile {
            record.profile = Some(v.clone());
        }
        if let Some(v) = &self.location {
            record.location.clone_from(v);
        }
    }
}
