use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tallyboard_core::{AppError, AppResult};
use tallyboard_domain::{
    Bucket, CountryShare, InvoiceSummary, PaymentStats, ProductSales, TransactionSummary,
    average_per_unit, bucket_by_day, bucket_by_month, country_shares, revenue_growth,
    summarize_invoices, summarize_transactions, top_products, total_revenue,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::fail_soft::{SoftFailure, cancellable, fetch_soft, settle_batch};
use crate::{Clock, Notice, Notifier, PaymentsApi};

/// Windows and limits used by the analytics pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsWindow {
    /// Trailing months in the revenue chart.
    pub months_back: u32,
    /// Trailing days in the financial report.
    pub days_back: u32,
    /// Number of products in the best-seller list.
    pub top_products_limit: usize,
}

impl Default for AnalyticsWindow {
    fn default() -> Self {
        Self {
            months_back: 12,
            days_back: 30,
            top_products_limit: 5,
        }
    }
}

/// Everything the analytics page renders.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsDashboard {
    /// Headline figures from the stats endpoint.
    pub stats: PaymentStats,
    /// Monthly paid revenue, oldest first.
    pub monthly_revenue: Vec<Bucket>,
    /// Growth between the last two months, in percent.
    pub month_over_month_growth: Decimal,
    /// Order counts and totals.
    pub summary: TransactionSummary,
    /// Best-selling products.
    pub top_products: Vec<ProductSales>,
    /// User distribution by country.
    pub country_shares: Vec<CountryShare>,
    /// Invoice totals.
    pub invoices: InvoiceSummary,
    /// Labels of fetches that fell back to empty data.
    pub degraded_sources: Vec<&'static str>,
}

/// Daily revenue report for the financial page.
#[derive(Debug, Clone, Serialize)]
pub struct FinancialReport {
    /// Daily paid revenue, oldest first.
    pub daily_revenue: Vec<Bucket>,
    /// Paid revenue over the whole window.
    pub period_revenue: Decimal,
    /// Paid orders over the whole window.
    pub period_orders: u64,
    /// Average paid revenue per day.
    pub average_daily_revenue: Decimal,
}

/// Application service computing dashboard analytics from payment data.
#[derive(Clone)]
pub struct AnalyticsService {
    api: Arc<dyn PaymentsApi>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    window: AnalyticsWindow,
}

impl AnalyticsService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        api: Arc<dyn PaymentsApi>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        window: AnalyticsWindow,
    ) -> Self {
        Self {
            api,
            clock,
            notifier,
            window,
        }
    }

    /// Loads the analytics page, falling back to empty data per failed source.
    pub async fn load_dashboard(&self, cancel: &CancellationToken) -> AppResult<AnalyticsDashboard> {
        let (stats, orders, invoices, countries) = tokio::join!(
            fetch_soft("stats", cancel, self.api.payment_stats()),
            fetch_soft("orders", cancel, self.api.list_orders()),
            fetch_soft("invoices", cancel, self.api.list_invoices()),
            fetch_soft("user-countries", cancel, self.api.list_user_countries()),
        );

        let failures = settle_batch(
            cancel,
            self.notifier.as_ref(),
            "analytics",
            [
                stats.failure,
                orders.failure,
                invoices.failure,
                countries.failure,
            ],
        )?;

        let now = self.clock.now();
        let monthly_revenue = bucket_by_month(&orders.value, self.window.months_back, now);
        let dashboard = AnalyticsDashboard {
            stats: stats.value,
            month_over_month_growth: revenue_growth(&monthly_revenue),
            monthly_revenue,
            summary: summarize_transactions(&orders.value),
            top_products: top_products(&orders.value, self.window.top_products_limit),
            country_shares: country_shares(&countries.value),
            invoices: summarize_invoices(&invoices.value),
            degraded_sources: failure_labels(&failures),
        };

        info!(
            orders = orders.value.len(),
            months_back = self.window.months_back,
            degraded = dashboard.degraded_sources.len(),
            "analytics dashboard loaded"
        );

        Ok(dashboard)
    }

    /// Loads the daily financial report.
    ///
    /// A failed order fetch yields an all-zero report plus an error notice.
    pub async fn financial_report(&self, cancel: &CancellationToken) -> AppResult<FinancialReport> {
        let orders = fetch_soft("orders", cancel, self.api.list_orders()).await;
        settle_batch(cancel, self.notifier.as_ref(), "financial report", [orders.failure])?;

        let daily_revenue = bucket_by_day(&orders.value, self.window.days_back, self.clock.now());
        let period_revenue = total_revenue(&daily_revenue);
        let period_orders = daily_revenue.iter().map(|bucket| bucket.record_count).sum();

        Ok(FinancialReport {
            average_daily_revenue: average_per_unit(
                period_revenue,
                u64::from(self.window.days_back),
            ),
            daily_revenue,
            period_revenue,
            period_orders,
        })
    }

    /// Fetches headline stats strictly, surfacing any error to the caller.
    pub async fn refresh_stats(&self, cancel: &CancellationToken) -> AppResult<PaymentStats> {
        match cancellable(cancel, self.api.payment_stats()).await {
            Ok(stats) => Ok(stats),
            Err(AppError::Cancelled) => Err(AppError::Cancelled),
            Err(error) => {
                self.notifier
                    .notify(Notice::error(format!("Could not refresh payment stats: {error}")));
                Err(error)
            }
        }
    }
}

fn failure_labels(failures: &[SoftFailure]) -> Vec<&'static str> {
    failures.iter().map(|failure| failure.label).collect()
}
