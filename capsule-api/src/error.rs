//! Error types for capsule-api
//!
//! Every failure is rendered as `{"error": message}`. The machine-readable
//! `code` is only used for logging.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use capsule_common::catalog::ApiErrorBody;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed query parameter (400)
    #[error("{0}")]
    BadRequest(String),

    /// Object outside the permitted prefixes (403)
    #[error("File not allowed")]
    FileNotAllowed,

    /// Required credential not configured (500)
    #[error("Missing {0}")]
    MissingEnv(String),

    /// Upstream answered with a non-success status (502)
    #[error("Upstream request failed: {status} {body}")]
    Upstream { status: u16, body: String },

    /// Upstream did not answer in time (504)
    #[error("Upstream request timed out")]
    UpstreamTimeout,

    /// Anything else (500). The detail is logged, never returned.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::FileNotAllowed => StatusCode::FORBIDDEN,
            ApiError::MissingEnv(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::FileNotAllowed => "FILE_NOT_ALLOWED",
            ApiError::MissingEnv(_) => "MISSING_ENV",
            ApiError::Upstream { .. } => "UPSTREAM_ERROR",
            ApiError::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Text for logs; includes the hidden detail of internal errors
    pub fn detail(&self) -> String {
        match self {
            ApiError::Internal(detail) => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::UpstreamTimeout
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<capsule_common::Error> for ApiError {
    fn from(err: capsule_common::Error) -> Self {
        match err {
            capsule_common::Error::MissingSetting(name) => ApiError::MissingEnv(name),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ApiErrorBody::new(self.to_string()))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
