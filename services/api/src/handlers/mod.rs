pub mod achievement;
pub mod application;
pub mod auth;
pub mod direction;
pub mod health;
pub mod identity;
pub mod rating;
pub mod user;
pub mod verification;

use uuid::Uuid;

use crate::error::ApiError;

/// Unwrap a request-body field, reporting it by its wire name when absent.
pub(crate) fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ApiError> {
    value.ok_or(ApiError::MissingField(field))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| ApiError::BadUuid)
}

pub(crate) fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::NotANumber("id"))
}
