use async_trait::async_trait;
use tallyboard_application::PaymentsApi;
use tallyboard_core::AppResult;
use tallyboard_domain::{Invoice, PaymentStats, TransactionRecord, UserCountry};

use super::HttpDashboardApi;
use crate::envelope::{decode_items, decode_object};
use crate::wire::{InvoiceWire, OrderWire, UserCountryWire};

#[async_trait]
impl PaymentsApi for HttpDashboardApi {
    async fn payment_stats(&self) -> AppResult<PaymentStats> {
        let body = self.get(&["payments", "stats"]).await?;
        decode_object(body, "stats")
    }

    async fn list_orders(&self) -> AppResult<Vec<TransactionRecord>> {
        let body = self.get(&["payments", "orders"]).await?;
        decode_items(body, "orders", OrderWire::into_domain)
    }

    async fn list_invoices(&self) -> AppResult<Vec<Invoice>> {
        let body = self.get(&["payments", "invoices"]).await?;
        decode_items(body, "invoices", InvoiceWire::into_domain)
    }

    async fn list_user_countries(&self) -> AppResult<Vec<UserCountry>> {
        let body = self.get(&["payments", "user-countries"]).await?;
        decode_items(body, "user_countries", UserCountryWire::into_domain)
    }
}
