//! API error mapping.
//!
//! Functional domain outcomes become 4xx responses with a readable message;
//! everything else becomes a generic failure carrying only the internal
//! error code, never external-system detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::error::{DomainError, StoreError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{message}")]
    Functional { code: String, message: String },

    #[error("Internal error [{code}]")]
    Internal { code: String },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "not_found".to_string(), msg.clone())
            }
            ApiError::Conflict(msg) => {
                (StatusCode::CONFLICT, "conflict".to_string(), msg.clone())
            }
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error".to_string(),
                msg.clone(),
            ),
            ApiError::Functional { code, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                code.to_lowercase(),
                message.clone(),
            ),
            ApiError::Internal { code } => {
                tracing::error!(code = %code, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    code.to_lowercase(),
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code,
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Functional { code, message } => ApiError::Functional {
                code: code.to_string(),
                message,
            },
            DomainError::Store(StoreError::Duplicate) => {
                ApiError::Conflict("Request already exists".to_string())
            }
            other => {
                tracing::error!(error = %other, "domain operation failed");
                ApiError::Internal {
                    code: other.code().to_string(),
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_functional_errors_keep_their_message() {
        let err = ApiError::from(DomainError::functional("SUBMITTED_TOO_EARLY", "too early"));
        assert!(
            matches!(&err, ApiError::Functional { code, message } if code == "SUBMITTED_TOO_EARLY" && message == "too early")
        );
    }

    #[test]
    fn test_invariant_errors_hide_detail() {
        let err = ApiError::from(DomainError::invariant(
            "IDENTITY_MISMATCH",
            "actor id differs from stored request",
        ));
        match err {
            ApiError::Internal { code } => assert_eq!(code, "IDENTITY_MISMATCH"),
            other => panic!("expected internal error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_store_error_is_a_conflict() {
        let err = ApiError::from(DomainError::Store(StoreError::Duplicate));
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}
