//! HTTP error mapping.
//!
//! Every handler returns [`AppError`] on failure. Engine errors convert via
//! `From<EngineError>`; server-side failures keep their source for logging
//! and never leak it to the client.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use geoguard_engine::EngineError;
use serde::Serialize;
use std::fmt;

/// Error returned by handlers.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create an error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the underlying error (logged, not exposed).
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "PERMISSION_DENIED", message)
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// 409 Conflict.
    #[must_use]
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    /// 503 Service Unavailable.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }

    /// 504 Gateway Timeout.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", message)
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                message = %self.message,
                error = ?self.source,
                "Request failed"
            );
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::Unauthenticated => Self::unauthorized(message),
            EngineError::PermissionDenied { .. } => Self::forbidden(message),
            EngineError::InvalidInput(_) => Self::bad_request(message),
            EngineError::ActivityNotFound(_) => Self::not_found(message),
            EngineError::AlreadyReviewed(_) => Self::conflict("ALREADY_REVIEWED", message),
            EngineError::Conflict { .. } => Self::conflict("CONFLICT", "Concurrent update, please retry"),
            EngineError::Timeout => Self::timeout("Operation timed out"),
            EngineError::StoreUnavailable(_) => {
                Self::unavailable("Storage temporarily unavailable").with_source(anyhow::Error::new(err))
            }
            EngineError::Serialization(_) | EngineError::Internal(_) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(err))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_map_to_status() {
        let cases = [
            (EngineError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                EngineError::PermissionDenied {
                    required: "admin".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (EngineError::ActivityNotFound("a".into()), StatusCode::NOT_FOUND),
            (EngineError::AlreadyReviewed("a".into()), StatusCode::CONFLICT),
            (EngineError::Conflict { key: "k".into() }, StatusCode::CONFLICT),
            (EngineError::StoreUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (EngineError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (EngineError::Internal("bug".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_store_details_are_not_exposed() {
        let err = AppError::from(EngineError::StoreUnavailable("redis://10.0.0.3 refused".into()));
        assert_eq!(err.to_string(), "[SERVICE_UNAVAILABLE] Storage temporarily unavailable");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_already_reviewed_code() {
        let err = AppError::from(EngineError::AlreadyReviewed("a1".into()));
        assert_eq!(err.code(), "ALREADY_REVIEWED");
    }
}
