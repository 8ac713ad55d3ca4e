//! Fail-soft fan-out helpers shared by every page loader.
//!
//! A page issues its independent fetches concurrently; each fetch is wrapped
//! with [`fetch_soft`] so that one failure substitutes a default value instead
//! of aborting its siblings. Cancellation is the one outcome that is not
//! softened: once the owning page is gone nothing should be rendered.

use std::future::Future;

use tallyboard_core::{AppError, AppResult};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{Notice, Notifier};

/// One fetch that failed and was replaced with a default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftFailure {
    /// Label of the failed fetch.
    pub label: &'static str,
    /// Error that triggered the substitution.
    pub error: AppError,
}

/// Result of one fail-soft fetch.
#[derive(Debug)]
pub struct SoftFetch<T> {
    /// Fetched value, or the default when the fetch failed.
    pub value: T,
    /// Failure details when the default was substituted.
    pub failure: Option<SoftFailure>,
    cancelled: bool,
}

impl<T> SoftFetch<T> {
    /// Returns true when the fetch was abandoned because of cancellation.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Runs a future until it completes or the token is cancelled.
pub async fn cancellable<T, F>(cancel: &CancellationToken, future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        result = future => result,
    }
}

/// Runs one fetch, substituting `T::default()` on failure.
pub async fn fetch_soft<T, F>(
    label: &'static str,
    cancel: &CancellationToken,
    future: F,
) -> SoftFetch<T>
where
    T: Default,
    F: Future<Output = AppResult<T>>,
{
    match cancellable(cancel, future).await {
        Ok(value) => SoftFetch {
            value,
            failure: None,
            cancelled: false,
        },
        Err(AppError::Cancelled) => SoftFetch {
            value: T::default(),
            failure: None,
            cancelled: true,
        },
        Err(error) => {
            warn!(fetch = label, error = %error, "fetch failed, substituting default");
            SoftFetch {
                value: T::default(),
                failure: Some(SoftFailure { label, error }),
                cancelled: false,
            }
        }
    }
}

/// Collects the failures of a joined batch and reports them once.
///
/// Returns `Err(AppError::Cancelled)` when the token fired, so callers stop
/// before touching any page state.
pub fn settle_batch(
    cancel: &CancellationToken,
    notifier: &dyn Notifier,
    page: &str,
    failures: impl IntoIterator<Item = Option<SoftFailure>>,
) -> AppResult<Vec<SoftFailure>> {
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    let failures: Vec<SoftFailure> = failures.into_iter().flatten().collect();
    if !failures.is_empty() {
        let labels: Vec<&str> = failures.iter().map(|failure| failure.label).collect();
        notifier.notify(Notice::error(format!(
            "Some {page} data could not be loaded ({}). Refresh to retry.",
            labels.join(", ")
        )));
    }

    Ok(failures)
}
