//! HTTP error mapping.
//!
//! Every failure leaves the server as
//! `{"error": {"code": "UPPER_SNAKE", "message": "...", "details"?: {...}}}`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Error returned by every handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("{0}")]
    InvalidCursor(String),

    #[error("{0}")]
    NotFound(String),

    #[error("No route for this path")]
    RouteNotFound,

    #[error("Method not allowed for this path")]
    MethodNotAllowed,

    #[error("Request body too large")]
    PayloadTooLarge,

    /// The wrapped detail is logged, never returned to the caller.
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Envelope code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::InvalidCursor(_) => "INVALID_CURSOR",
            ApiError::NotFound(_) => "RECORD_NOT_FOUND",
            ApiError::RouteNotFound => "NOT_FOUND",
            ApiError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation { .. } | ApiError::InvalidCursor(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<umapic_core::Error> for ApiError {
    fn from(err: umapic_core::Error) -> Self {
        use umapic_core::Error;

        match err {
            Error::RecordNotFound(_) => ApiError::NotFound("Record not found".to_string()),
            Error::Validation { message, details } => ApiError::Validation { message, details },
            Error::InvalidCursor(e) => {
                ApiError::InvalidCursor(format!("Invalid cursor: {}", e.message))
            }
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            other => {
                error!(
                    subsystem = "api",
                    component = "error",
                    error = %other,
                    "Request failed with internal error"
                );
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let (message, details) = match self {
            ApiError::Internal(_) => ("Internal server error".to_string(), None),
            ApiError::Validation { message, details } => (message, details),
            other => (other.to_string(), None),
        };

        let body = Json(ErrorEnvelope {
            error: ErrorBody {
                code,
                message,
                details,
            },
        });
        (status, body).into_response()
    }
}
