//! HTTP error responses.
//!
//! Every handler failure is rendered as an `ErrorResponse` body with a stable
//! `code` and a human-readable `message`. Internal failures are logged
//! server-side and returned with a generic message.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{backup::BackupError, repository::StoreError};

/// ErrorResponse
///
/// JSON body returned for every non-2xx response produced by a handler.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Couples an HTTP status code with a JSON error body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn api_conflict(message: &str) -> ApiError {
    ApiError::new(StatusCode::CONFLICT, "conflict", message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// Authenticated, but the role or department permission does not allow the action.
pub fn api_forbidden(message: &str) -> ApiError {
    ApiError::new(StatusCode::FORBIDDEN, "forbidden", message)
}

pub fn api_validation_error(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn api_bad_gateway(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_GATEWAY, "bad_gateway", message)
}

pub fn api_internal(message: &str) -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => api_not_found(&format!("{what} not found")),
            StoreError::Conflict(what) => api_conflict(&what),
            other => {
                tracing::error!(error = ?other, "storage error");
                api_internal("internal storage error")
            }
        }
    }
}

impl From<BackupError> for ApiError {
    fn from(err: BackupError) -> Self {
        match err {
            BackupError::InvalidName(name) => {
                api_validation_error(&format!("invalid backup name: {name}"))
            }
            BackupError::InvalidRetention(days) => {
                api_validation_error(&format!("retention of {days} days is out of range"))
            }
            BackupError::NotFound(name) => api_not_found(&format!("backup {name} not found")),
            BackupError::AlreadyExists(name) => {
                api_conflict(&format!("backup {name} already exists"))
            }
            BackupError::Store(e) => e.into(),
            BackupError::Io(e) => {
                tracing::error!(error = %e, "backup filesystem error");
                api_internal("backup storage error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_build_expected_codes() {
        let cases = [
            (api_not_found("x"), StatusCode::NOT_FOUND, "not_found"),
            (api_conflict("x"), StatusCode::CONFLICT, "conflict"),
            (api_unauthorized("x"), StatusCode::UNAUTHORIZED, "unauthorized"),
            (api_forbidden("x"), StatusCode::FORBIDDEN, "forbidden"),
            (api_validation_error("x"), StatusCode::BAD_REQUEST, "validation_error"),
            (api_bad_gateway("x"), StatusCode::BAD_GATEWAY, "bad_gateway"),
            (api_internal("x"), StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status, status);
            assert_eq!(err.body.code, code);
        }
    }

    #[test]
    fn store_errors_map_to_http_statuses() {
        let not_found: ApiError = StoreError::NotFound("asset".into()).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.body.message, "asset not found");

        let conflict: ApiError = StoreError::Conflict("email already in use".into()).into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let unexpected: ApiError = StoreError::Unexpected(anyhow::anyhow!("disk full")).into();
        assert_eq!(unexpected.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unexpected.body.message, "internal storage error");
    }

    #[test]
    fn backup_errors_map_to_http_statuses() {
        let invalid: ApiError = BackupError::InvalidName("../x".into()).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        let missing: ApiError = BackupError::NotFound("backup-20240101-000000.db".into()).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }
}
