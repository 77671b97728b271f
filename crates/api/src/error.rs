//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use services::ServiceError;

/// API-level error type that maps to HTTP responses.
///
/// Every variant renders as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// No usable caller identity.
    Unauthorized(String),
    /// Caller lacks the operator role.
    Forbidden(String),
    /// Malformed request body, path or query.
    BadRequest(String),
    /// Error raised by a service.
    Service(ServiceError),
}

impl ApiError {
    /// A required request field was absent.
    pub fn missing(field: &str) -> Self {
        ApiError::BadRequest(format!("Invalid {field}: is required"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Service(err) => service_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn service_error_to_response(err: ServiceError) -> (StatusCode, String) {
    match &err {
        ServiceError::Validation { .. }
        | ServiceError::InsufficientStock { .. }
        | ServiceError::InvalidTransition { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::Unexpected(detail) => {
            tracing::error!(error = %detail, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
