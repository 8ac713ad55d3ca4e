//! Shared primitives for all Rust crates in Tallyboard.

#![forbid(unsafe_code)]

/// Authentication primitives shared across services.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::AccessToken;

/// Result type used across Tallyboard crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated, usually a missing or expired token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but the backend refused the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("upstream returned status {status}: {message}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The response body did not have the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The owner of the request went away before it finished.
    #[error("request cancelled")]
    Cancelled,

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns true when the error only signals cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
