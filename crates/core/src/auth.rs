use std::fmt::{Debug, Formatter};

use crate::{AppError, AppResult};

/// Bearer token attached to every backend request.
///
/// The token is handed to API clients explicitly at construction time; nothing
/// reads it from ambient storage.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a validated access token.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "access token must not be empty".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the `Authorization` header value for this token.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl Debug for AccessToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("AccessToken(<redacted>)")
    }
}
