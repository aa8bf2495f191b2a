//! User Directory Request/Response Types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{Gender, UserRecord, UserStatus};

/// Default page size when `limit` is missing or invalid.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Multipart field carrying the profile image.
pub const PROFILE_FIELD: &str = "profile";

/// User fields as submitted by the client, before validation.
///
/// Every key is optional so the same shape serves create (all required) and
/// merge-patch update (only present keys applied).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    /// `Male` or `Female`.
    pub gender: Option<String>,
    /// `Active` or `InActive`.
    pub status: Option<String>,
    pub location: Option<String>,
    /// Pre-existing profile reference, kept as-is when no file is uploaded.
    pub profile: Option<String>,
}

impl UserForm {
    /// Build from flat multipart text fields. Unknown keys are ignored.
    pub fn from_fields(mut fields: HashMap<String, String>) -> Self {
        Self {
            first_name: fields.remove("firstName"),
            last_name: fields.remove("lastName"),
            email: fields.remove("email"),
            mobile: fields.remove("mobile"),
            gender: fields.remove("gender"),
            status: fields.remove("status"),
            location: fields.remove("location"),
            profile: fields.remove(PROFILE_FIELD),
        }
    }
}

/// User record as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// `firstName + " " + lastName`.
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub gender: Gender,
    pub status: UserStatus,
    pub profile: Option<String>,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for UserResponse {
    fn from(u: UserRecord) -> Self {
        Self {
            full_name: u.full_name(),
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            mobile: u.mobile,
            gender: u.gender,
            status: u.status,
            profile: u.profile,
            location: u.location,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Pagination block of the list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_records: i64,
    pub limit: u32,
}

impl Pagination {
    pub fn new(current_page: u32, limit: u32, total_records: i64) -> Self {
        let total = u64::try_from(total_records).unwrap_or(0);
        Self {
            current_page,
            total_pages: total.div_ceil(u64::from(limit.max(1))),
            total_records,
            limit,
        }
    }
}

/// Query parameters for listing.
///
/// Kept as strings: anything missing, unparsable or zero falls back to the
/// default instead of rejecting the request.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number (default 1).
    pub page: Option<String>,
    /// Records per page (default 10, max 100).
    pub limit: Option<String>,
}

impl ListQuery {
    /// 1-based page number.
    pub fn page(&self) -> u32 {
        parse_positive(self.page.as_deref()).unwrap_or(1)
    }

    /// Page size, capped at [`MAX_PAGE_SIZE`].
    pub fn limit(&self) -> u32 {
        parse_positive(self.limit.as_deref())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }
}

fn parse_positive(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
}

/// Query parameters for search.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Matched case-insensitively against the text fields.
    pub keyword: Option<String>,
}
