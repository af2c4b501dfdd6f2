//! Error handling for Servio.
//!
//! This module provides:
//! - A small closed set of error kinds with HTTP status code mapping
//! - User-facing vs internal message split (raw infrastructure errors are
//!   never serialized to clients)
//! - The uniform boundary translation applied at every operation boundary:
//!   expected kinds (`NotFound`, `Forbidden`, `Unauthorized`) pass through,
//!   everything else is replaced with an operation-specific internal error
//! - Metrics integration for error tracking

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

/// A specialized Result type for Servio operations.
pub type Result<T> = std::result::Result<T, AppError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
///
/// The authorization core only ever surfaces `NotFound`, `Forbidden`,
/// `Unauthorized` (including the token variants) and `InternalError`;
/// the remaining codes exist for the layers around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Expected outcomes, allowed through operation boundaries
    NotFound,
    Forbidden,
    Unauthorized,
    InvalidToken,
    TokenExpired,

    // Request-shape failures (rejected before an operation runs)
    ValidationError,

    // Infrastructure failures, swallowed at operation boundaries
    DatabaseError,
    ConfigurationError,
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthorized | Self::InvalidToken | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DatabaseError | Self::ConfigurationError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this kind may pass through an operation boundary unchanged.
    ///
    /// The token variants collapse into the `Unauthorized` outcome at the
    /// HTTP boundary but are still "expected" in the propagation sense.
    pub const fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::NotFound
                | Self::Forbidden
                | Self::Unauthorized
                | Self::InvalidToken
                | Self::TokenExpired
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Servio.
///
/// Carries a machine-readable code, a user-facing message that is safe to
/// serialize, and an optional internal message that only ever reaches logs.
#[derive(Error, Debug)]
pub struct AppError {
    code: ErrorCode,
    user_message: Cow<'static, str>,
    internal_message: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl AppError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create an error with both user and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create an internal error with a user-safe default message.
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the user-facing message.
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Get the internal message, if any.
    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    /// Whether this error may pass through an operation boundary unchanged.
    pub fn is_expected(&self) -> bool {
        self.code.is_expected()
    }

    fn record_metrics(&self) {
        counter!(
            "servio_errors_total",
            "code" => self.code.to_string()
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Boundary Translation
// ═══════════════════════════════════════════════════════════════════════════════

/// Uniform error translation applied at every operation boundary.
///
/// Expected kinds pass through unchanged; anything else is swallowed and
/// replaced with an `InternalError` carrying the operation's default
/// message, so raw infrastructure error text never reaches the caller.
pub trait ErrorBoundary<T> {
    fn or_internal(self, default_message: &'static str) -> Result<T>;
}

impl<T> ErrorBoundary<T> for Result<T> {
    fn or_internal(self, default_message: &'static str) -> Result<T> {
        self.map_err(|err| {
            if err.is_expected() {
                err
            } else {
                warn!(error = %err, "unexpected error at operation boundary");
                AppError::with_internal(
                    ErrorCode::InternalError,
                    default_message,
                    err.to_string(),
                )
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Conversions
// ═══════════════════════════════════════════════════════════════════════════════

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::with_internal(
            ErrorCode::DatabaseError,
            "A storage error occurred",
            err.to_string(),
        )
        .with_source(err)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP Response Mapping
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.code.http_status();

        if status.is_server_error() {
            error!(
                code = %self.code,
                internal = self.internal_message.as_deref().unwrap_or(""),
                "request failed: {}",
                self.user_message
            );
        } else {
            warn!(code = %self.code, "request rejected: {}", self.user_message);
        }

        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": self.code,
                "message": self.user_message,
            }
        });

        (status, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_kinds_pass_through_boundary() {
        let res: Result<()> = Err(AppError::not_found("User with ID 7 not found"));
        let err = res.or_internal("Error fetching the user").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.user_message(), "User with ID 7 not found");
    }

    #[test]
    fn forbidden_and_unauthorized_pass_through_boundary() {
        for err in [
            AppError::forbidden("You can only update your own account"),
            AppError::unauthorized("Invalid credentials"),
            AppError::new(ErrorCode::TokenExpired, "expired"),
        ] {
            let code = err.code();
            let res: Result<()> = Err(err);
            assert_eq!(res.or_internal("default").unwrap_err().code(), code);
        }
    }

    #[test]
    fn unexpected_errors_are_replaced_with_operation_default() {
        let res: Result<()> = Err(AppError::with_internal(
            ErrorCode::DatabaseError,
            "A storage error occurred",
            "connection refused to db:5432",
        ));
        let err = res.or_internal("Error creating user").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.user_message(), "Error creating user");
        // Raw infrastructure text survives only in the internal message.
        assert!(err.internal_message().unwrap().contains("storage error"));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Forbidden.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::Unauthorized.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::TokenExpired.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::InvalidToken.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_errors_are_not_expected_but_map_to_422() {
        let err = AppError::validation("Name is required");
        assert!(!err.is_expected());
        assert_eq!(
            err.code().http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
