//! API error taxonomy and its JSON rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::repository::StoreError;

/// API error that can be returned from handlers and extractors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Entity absent (404).
    #[error("{0}")]
    NotFound(String),

    /// Authenticated but not allowed to act on the resource (403).
    #[error("{0}")]
    Forbidden(String),

    /// Malformed or oversized input, rejected before the data-access layer (422).
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Request understood but refused, carrying a machine-readable code (400).
    #[error("{0}")]
    BadRequest(&'static str),

    /// Server-side failure not caused by the store (500).
    #[error("internal error: {0}")]
    Internal(String),

    /// Failure raised by the data-access layer.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::BadRequest(code) => *code,
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Store(e) => match e {
                StoreError::NotFound { .. } => "NOT_FOUND",
                StoreError::Forbidden { .. } => "FORBIDDEN",
                StoreError::Transaction(_) | StoreError::Query(_) => "INTERNAL_ERROR",
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(e) => match e {
                StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
                StoreError::Transaction(_) | StoreError::Query(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Message shown to the client. Server failures are reported generically;
    /// the underlying cause only goes to the log.
    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal server error".to_string(),
            Self::Store(StoreError::Transaction(_) | StoreError::Query(_)) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
