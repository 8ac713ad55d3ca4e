//! Transactional records as fetched from the payments backend.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallyboard_core::{AppError, AppResult, NonEmptyString};

/// Lifecycle status of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Payment captured.
    Paid,
    /// Awaiting payment.
    Pending,
    /// Payment attempt failed.
    Failed,
    /// Payment returned to the customer.
    Refunded,
    /// Order cancelled before payment.
    Cancelled,
}

/// Visual tone used when rendering a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    /// Positive outcome.
    Success,
    /// Needs attention.
    Warning,
    /// Negative outcome.
    Danger,
    /// Informational.
    Info,
    /// No emphasis.
    Neutral,
}

impl TransactionStatus {
    /// Returns a stable transport value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns all known statuses.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[TransactionStatus] = &[
            TransactionStatus::Paid,
            TransactionStatus::Pending,
            TransactionStatus::Failed,
            TransactionStatus::Refunded,
            TransactionStatus::Cancelled,
        ];

        ALL
    }

    /// Returns the badge tone for this status.
    #[must_use]
    pub fn badge_tone(&self) -> BadgeTone {
        match self {
            Self::Paid => BadgeTone::Success,
            Self::Pending => BadgeTone::Warning,
            Self::Failed => BadgeTone::Danger,
            Self::Refunded => BadgeTone::Info,
            Self::Cancelled => BadgeTone::Neutral,
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(Self::Paid),
            "pending" => Ok(Self::Pending),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(AppError::Validation(format!(
                "unknown transaction status '{value}'"
            ))),
        }
    }
}

/// One product line inside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product display name.
    pub product_name: String,
    /// Units ordered.
    pub quantity: u32,
    /// Price of one unit.
    pub unit_price: Decimal,
}

impl LineItem {
    /// Returns `quantity * unit_price`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Immutable order record used by the analytics transforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    id: NonEmptyString,
    status: TransactionStatus,
    amount: Decimal,
    occurred_at: Option<DateTime<Utc>>,
    customer_identifier: String,
    line_items: Vec<LineItem>,
}

impl TransactionRecord {
    /// Creates a validated transaction record.
    pub fn new(
        id: impl Into<String>,
        status: TransactionStatus,
        amount: Decimal,
        occurred_at: Option<DateTime<Utc>>,
        customer_identifier: impl Into<String>,
        line_items: Vec<LineItem>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: NonEmptyString::new(id)?,
            status,
            amount,
            occurred_at,
            customer_identifier: customer_identifier.into(),
            line_items,
        })
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the record status.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Returns the order amount in currency units.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the payment timestamp when one is known.
    #[must_use]
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.occurred_at
    }

    /// Returns the customer identifier (usually an email).
    #[must_use]
    pub fn customer_identifier(&self) -> &str {
        self.customer_identifier.as_str()
    }

    /// Returns the ordered line items.
    #[must_use]
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    /// Returns the paid timestamp when this record counts towards revenue.
    #[must_use]
    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            TransactionStatus::Paid => self.occurred_at,
            _ => None,
        }
    }
}

/// Parses a backend timestamp, returning `None` for anything unrecognised.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and bare
/// `YYYY-MM-DD` dates (midnight UTC).
#[must_use]
pub fn parse_occurred_at(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.and_utc());
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(parsed.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
