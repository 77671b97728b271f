//! HTTP route handlers.

pub mod cart;
pub mod health;
pub mod items;
pub mod metrics;
pub mod orders;

use std::str::FromStr;

use serde::Serialize;

use crate::error::ApiError;

/// `{"message": ...}` body for actions with nothing else to return.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Parses an identifier taken from the request path.
fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what} id: {raw}")))
}

/// Unwraps a required body field.
fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::missing(field))
}

/// Converts a signed body quantity, rejecting values below `min`.
fn quantity(value: i64, field: &str, min: u32) -> Result<u32, ApiError> {
    u32::try_from(value)
        .ok()
        .filter(|q| *q >= min)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {field}: must be at least {min}")))
}
