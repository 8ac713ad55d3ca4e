//! Tallyboard dashboard report runtime.

#![forbid(unsafe_code)]

mod report_config;

use std::env;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tallyboard_application::{AnalyticsService, Notifier, RbacAdminService};
use tallyboard_core::{AppError, AppResult};
use tallyboard_infrastructure::{HttpDashboardApi, SystemClock, TracingNotifier};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::report_config::{ReportConfig, ReportMode};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mode = ReportMode::from_args(env::args().nth(1).as_deref())?;
    let config = ReportConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let api = Arc::new(HttpDashboardApi::new(
        http_client,
        &config.api_base_url,
        config.access_token.clone(),
    ));
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier::new());

    info!(
        report = mode.as_str(),
        api_base_url = %config.api_base_url,
        months_back = config.window.months_back,
        days_back = config.window.days_back,
        "tallyboard-report started"
    );

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    let output = match mode {
        ReportMode::Analytics => {
            let service = AnalyticsService::new(
                api,
                Arc::new(SystemClock),
                notifier,
                config.window,
            );
            to_json(&service.load_dashboard(&cancel).await?)?
        }
        ReportMode::Financial => {
            let service = AnalyticsService::new(
                api,
                Arc::new(SystemClock),
                notifier,
                config.window,
            );
            to_json(&service.financial_report(&cancel).await?)?
        }
        ReportMode::Rbac => {
            let service = RbacAdminService::new(api, notifier);
            to_json(&service.load_overview(&cancel).await?)?
        }
    };

    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|error| AppError::Internal(format!("failed to render report: {error}")))?;
    println!("{rendered}");

    Ok(())
}

fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, cancelling in-flight requests");
                cancel.cancel();
            }
            Err(error) => warn!(error = %error, "failed to listen for interrupt signal"),
        }
    });
}

fn to_json<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|error| AppError::Internal(format!("failed to serialize report: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}
