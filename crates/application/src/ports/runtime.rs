use chrono::{DateTime, Utc};

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Operation succeeded.
    Success,
    /// Operation failed; the user may retry.
    Error,
}

/// Transient user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Notice severity.
    pub level: NoticeLevel,
    /// Human-readable message.
    pub message: String,
}

impl Notice {
    /// Creates a success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Creates an error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Sink for user-visible notices.
pub trait Notifier: Send + Sync {
    /// Shows a notice to the user.
    fn notify(&self, notice: Notice);
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}
