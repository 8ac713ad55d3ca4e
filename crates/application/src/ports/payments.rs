use async_trait::async_trait;

use tallyboard_core::AppResult;
use tallyboard_domain::{Invoice, PaymentStats, TransactionRecord, UserCountry};

/// Port for the payments section of the backend API.
#[async_trait]
pub trait PaymentsApi: Send + Sync {
    /// Fetches headline payment figures.
    async fn payment_stats(&self) -> AppResult<PaymentStats>;

    /// Fetches all orders visible to the caller.
    async fn list_orders(&self) -> AppResult<Vec<TransactionRecord>>;

    /// Fetches all invoices visible to the caller.
    async fn list_invoices(&self) -> AppResult<Vec<Invoice>>;

    /// Fetches per-country user counts.
    async fn list_user_countries(&self) -> AppResult<Vec<UserCountry>>;
}
