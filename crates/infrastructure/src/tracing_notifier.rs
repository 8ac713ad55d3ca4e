//! Notifier that writes user-visible notices to tracing output.

use tallyboard_application::{Notice, NoticeLevel, Notifier};
use tracing::{info, warn};

/// Notice sink for headless runs. Success notices log at info, errors at warn.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates a new tracing notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!(notice = %notice.message, "dashboard notice"),
            NoticeLevel::Error => warn!(notice = %notice.message, "dashboard notice"),
        }
    }
}
