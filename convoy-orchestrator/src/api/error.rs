//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::ServiceError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotModified,
    InternalError(String),
}

/// HTTP status a service error is reported with
pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::UnknownApplication(_) | ServiceError::UnknownDeployment(_) => {
            StatusCode::NOT_FOUND
        }
        ServiceError::DeploymentMismatch { .. }
        | ServiceError::NotEnoughDeployments { .. }
        | ServiceError::NotEnoughParameters(_)
        | ServiceError::InvalidCommand(_)
        | ServiceError::DuplicateKey(_)
        | ServiceError::NoRowsUpdated(_) => StatusCode::BAD_REQUEST,
        ServiceError::ApplicationPermission(_) => StatusCode::FORBIDDEN,
        ServiceError::StateNotChanged { .. } => StatusCode::NOT_MODIFIED,
        ServiceError::ImageNotPulled { .. }
        | ServiceError::DeploymentFailed { .. }
        | ServiceError::StateChangeFailed { .. }
        | ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match status_for(&err) {
            StatusCode::NOT_FOUND => ApiError::NotFound(err.to_string()),
            StatusCode::BAD_REQUEST => ApiError::BadRequest(err.to_string()),
            StatusCode::FORBIDDEN => ApiError::Forbidden(err.to_string()),
            StatusCode::NOT_MODIFIED => ApiError::NotModified,
            _ => ApiError::InternalError(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            // 304 carries no body
            ApiError::NotModified => return StatusCode::NOT_MODIFIED.into_response(),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
