//! Caller identity extractors.
//!
//! Authentication happens upstream. The gateway forwards the user id in
//! `X-User-Id` and the role in `X-User-Role`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const OPERATOR_ROLE: &str = "admin";

/// The authenticated caller.
///
/// Rejects with 401 when `X-User-Id` is missing or not a UUID.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        let user_id = raw
            .trim()
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized("Invalid user id".to_string()))?;

        Ok(Self(user_id))
    }
}

/// An authenticated caller holding the operator role.
///
/// Rejects with 401 like [`CurrentUser`], then with 403 unless
/// `X-User-Role` is `admin`.
#[derive(Debug, Clone, Copy)]
pub struct Operator(pub UserId);

impl<S> FromRequestParts<S> for Operator
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user_id) = CurrentUser::from_request_parts(parts, state).await?;

        let is_operator = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case(OPERATOR_ROLE));

        if !is_operator {
            tracing::warn!(%user_id, "operator endpoint refused");
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }

        Ok(Self(user_id))
    }
}
