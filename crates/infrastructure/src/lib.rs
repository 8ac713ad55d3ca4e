//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod envelope;
mod http_dashboard_api;
mod system_clock;
mod tracing_notifier;
mod wire;

pub use http_dashboard_api::HttpDashboardApi;
pub use system_clock::SystemClock;
pub use tracing_notifier::TracingNotifier;
