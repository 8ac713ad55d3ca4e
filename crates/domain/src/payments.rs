//! Payment-side projections other than orders.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Headline payment figures returned by the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentStats {
    /// Lifetime revenue.
    pub total_revenue: Decimal,
    /// Lifetime order count.
    pub total_orders: u64,
    /// Currently active subscriptions.
    pub active_subscriptions: u64,
    /// Monthly recurring revenue.
    pub monthly_recurring_revenue: Decimal,
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Settled.
    Paid,
    /// Issued and awaiting payment.
    Open,
    /// Not yet issued.
    Draft,
    /// Cancelled after issue.
    Void,
    /// Written off.
    Uncollectible,
    /// Any status this client does not know.
    Other,
}

impl InvoiceStatus {
    /// Returns a stable transport value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Open => "open",
            Self::Draft => "draft",
            Self::Void => "void",
            Self::Uncollectible => "uncollectible",
            Self::Other => "other",
        }
    }

    /// Returns true when the invoice still expects money.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl FromStr for InvoiceStatus {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_ascii_lowercase().as_str() {
            "paid" => Self::Paid,
            "open" => Self::Open,
            "draft" => Self::Draft,
            "void" => Self::Void,
            "uncollectible" => Self::Uncollectible,
            _ => Self::Other,
        })
    }
}

/// Invoice projection used by the financial pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice identifier.
    pub id: String,
    /// Human-facing invoice number.
    pub number: Option<String>,
    /// Invoice status.
    pub status: InvoiceStatus,
    /// Invoice amount.
    pub amount: Decimal,
    /// Issue timestamp, when known.
    pub issued_at: Option<DateTime<Utc>>,
    /// Billed customer.
    pub customer_identifier: String,
}

/// User count for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCountry {
    /// Country name or ISO code as reported by the backend.
    pub country: String,
    /// Number of users.
    pub users: u64,
}
