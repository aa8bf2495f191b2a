//! Field validation for user records.
//!
//! Text fields are trimmed and email is lower-cased before the `validator`
//! rules run. Every field problem in one request is reported together, one
//! message per field.

use std::sync::LazyLock;

use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use super::error::UserError;
use super::types::UserForm;
use crate::db::{Gender, NewUserRecord, UserChanges, UserStatus};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*@[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*(\.[A-Za-z0-9_]{2,3})+$")
        .expect("valid regex")
});

/// Order in which field problems are listed.
const FIELD_ORDER: [&str; 7] = [
    "first_name",
    "last_name",
    "email",
    "mobile",
    "gender",
    "status",
    "location",
];

/// Create request after normalization. A blank status means "use the default".
#[derive(Debug, Validate)]
struct NewUserInput {
    #[validate(
        required(message = "First name is required"),
        length(min = 1, message = "First name is required")
    )]
    first_name: Option<String>,
    #[validate(
        required(message = "Last name is required"),
        length(min = 1, message = "Last name is required")
    )]
    last_name: Option<String>,
    #[validate(
        required(message = "Email is required"),
        length(min = 1, message = "Email is required"),
        regex(path = *EMAIL_REGEX, message = "Please enter a valid email")
    )]
    email: Option<String>,
    #[validate(
        required(message = "Mobile number is required"),
        length(min = 1, message = "Mobile number is required")
    )]
    mobile: Option<String>,
    #[validate(
        required(message = "Gender is required"),
        length(min = 1, message = "Gender is required"),
        custom(function = "check_gender")
    )]
    gender: Option<String>,
    #[validate(custom(function = "check_status"))]
    status: Option<String>,
    #[validate(
        required(message = "Location is required"),
        length(min = 1, message = "Location is required")
    )]
    location: Option<String>,
}

/// Merge-patch request after normalization. Absent keys are not checked.
#[derive(Debug, Validate)]
struct UserPatchInput {
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    last_name: Option<String>,
    #[validate(
        length(min = 1, message = "Email cannot be empty"),
        regex(path = *EMAIL_REGEX, message = "Please enter a valid email")
    )]
    email: Option<String>,
    #[validate(length(min = 1, message = "Mobile number cannot be empty"))]
    mobile: Option<String>,
    #[validate(
        length(min = 1, message = "Gender cannot be empty"),
        custom(function = "check_gender")
    )]
    gender: Option<String>,
    #[validate(
        length(min = 1, message = "Status cannot be empty"),
        custom(function = "check_status")
    )]
    status: Option<String>,
    #[validate(length(min = 1, message = "Location cannot be empty"))]
    location: Option<String>,
}

fn check_gender(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.parse::<Gender>().is_ok() {
        return Ok(());
    }
    let mut err = ValidationError::new("gender");
    err.message = Some(format!("'{value}' is not a valid gender (expected Male or Female)").into());
    Err(err)
}

fn check_status(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.parse::<UserStatus>().is_ok() {
        return Ok(());
    }
    let mut err = ValidationError::new("status");
    err.message =
        Some(format!("'{value}' is not a valid status (expected Active or InActive)").into());
    Err(err)
}

/// Missing and empty values outrank format problems on the same field.
fn rank(error: &ValidationError) -> u8 {
    match &*error.code {
        "required" => 0,
        "length" => 1,
        _ => 2,
    }
}

/// Most relevant problem of each field, joined in field order.
fn to_user_error(errors: &ValidationErrors) -> UserError {
    let by_field = errors.field_errors();
    let messages: Vec<String> = FIELD_ORDER
        .iter()
        .filter_map(|field| by_field.get(*field)?.iter().min_by_key(|e| rank(e)))
        .map(|e| {
            e.message
                .as_ref()
                .map_or_else(|| e.code.to_string(), ToString::to_string)
        })
        .collect();
    UserError::Validation(messages.join(", "))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

fn normalized_email(value: Option<String>) -> Option<String> {
    trimmed(value).map(|e| e.to_lowercase())
}

fn saved_profile(profile: Option<String>) -> Option<String> {
    profile.filter(|p| !p.trim().is_empty())
}

/// Validate a create request.
pub fn new_user(form: UserForm, profile: Option<String>) -> Result<NewUserRecord, UserError> {
    let input = NewUserInput {
        first_name: trimmed(form.first_name),
        last_name: trimmed(form.last_name),
        email: normalized_email(form.email),
        mobile: trimmed(form.mobile),
        gender: trimmed(form.gender),
        status: trimmed(form.status).filter(|s| !s.is_empty()),
        location: trimmed(form.location),
    };
    input.validate().map_err(|e| to_user_error(&e))?;

    Ok(NewUserRecord {
        first_name: input.first_name.unwrap_or_default(),
        last_name: input.last_name.unwrap_or_default(),
        email: input.email.unwrap_or_default(),
        mobile: input.mobile.unwrap_or_default(),
        gender: input
            .gender
            .and_then(|g| g.parse().ok())
            .unwrap_or(Gender::Male),
        status: input
            .status
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        profile: saved_profile(profile),
        location: input.location.unwrap_or_default(),
    })
}

/// Validate a merge-patch update. Only present keys become changes.
pub fn user_changes(form: UserForm, profile: Option<String>) -> Result<UserChanges, UserError> {
    let input = UserPatchInput {
        first_name: trimmed(form.first_name),
        last_name: trimmed(form.last_name),
        email: normalized_email(form.email),
        mobile: trimmed(form.mobile),
        gender: trimmed(form.gender),
        status: trimmed(form.status),
        location: trimmed(form.location),
    };
    input.validate().map_err(|e| to_user_error(&e))?;

    Ok(UserChanges {
        first_name: input.first_name,
        last_name: input.last_name,
        email: input.email,
        mobile: input.mobile,
        gender: input.gender.and_then(|g| g.parse().ok()),
        status: input.status.and_then(|s| s.parse().ok()),
        profile: saved_profile(profile),
        location: input.location,
    })
}
