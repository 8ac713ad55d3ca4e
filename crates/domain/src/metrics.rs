//! Derived dashboard metrics. All functions are pure and never fail.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Bucket, Invoice, InvoiceStatus, TransactionRecord, TransactionStatus, UserCountry};

const DISPLAY_SCALE: u32 = 2;

/// Returns `part / whole * 100` rounded to two places, or zero when `whole` is zero.
#[must_use]
pub fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }

    (part * Decimal::ONE_HUNDRED / whole).round_dp(DISPLAY_SCALE)
}

/// Returns `total / count` rounded to the currency minor unit, or zero when `count` is zero.
#[must_use]
pub fn average_per_unit(total: Decimal, count: u64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }

    (total / Decimal::from(count)).round_dp(DISPLAY_SCALE)
}

/// Returns the percentage change from `previous` to `current`, or zero without a baseline.
#[must_use]
pub fn growth_rate(previous: Decimal, current: Decimal) -> Decimal {
    if previous.is_zero() {
        return Decimal::ZERO;
    }

    ((current - previous) * Decimal::ONE_HUNDRED / previous).round_dp(DISPLAY_SCALE)
}

/// Growth between the last two buckets of a series.
#[must_use]
pub fn revenue_growth(buckets: &[Bucket]) -> Decimal {
    match buckets {
        [.., previous, current] => growth_rate(previous.revenue_sum, current.revenue_sum),
        _ => Decimal::ZERO,
    }
}

/// Order totals by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// Number of records per status.
    pub status_counts: BTreeMap<TransactionStatus, u64>,
    /// Number of records considered.
    pub total_count: u64,
    /// Sum of paid amounts.
    pub paid_revenue: Decimal,
    /// Average paid order value.
    pub average_order_value: Decimal,
    /// Paid records as a percentage of all records.
    pub success_rate: Decimal,
}

/// Summarizes a list of orders.
#[must_use]
pub fn summarize_transactions(records: &[TransactionRecord]) -> TransactionSummary {
    let mut status_counts: BTreeMap<TransactionStatus, u64> = TransactionStatus::all()
        .iter()
        .map(|status| (*status, 0))
        .collect();
    let mut paid_revenue = Decimal::ZERO;

    for record in records {
        *status_counts.entry(record.status()).or_default() += 1;
        if record.status() == TransactionStatus::Paid {
            paid_revenue += record.amount();
        }
    }

    let total_count = records.len() as u64;
    let paid_count = status_counts
        .get(&TransactionStatus::Paid)
        .copied()
        .unwrap_or_default();

    TransactionSummary {
        status_counts,
        total_count,
        paid_revenue,
        average_order_value: average_per_unit(paid_revenue, paid_count),
        success_rate: percentage_of(Decimal::from(paid_count), Decimal::from(total_count)),
    }
}

/// Sales aggregate for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    /// Product display name.
    pub product_name: String,
    /// Units sold.
    pub quantity: u64,
    /// Revenue from the product's line items.
    pub revenue: Decimal,
}

/// Best-selling products across paid orders, by revenue.
#[must_use]
pub fn top_products(records: &[TransactionRecord], limit: usize) -> Vec<ProductSales> {
    let mut by_product: HashMap<&str, ProductSales> = HashMap::new();
    for record in records
        .iter()
        .filter(|record| record.status() == TransactionStatus::Paid)
    {
        for item in record.line_items() {
            let entry = by_product
                .entry(item.product_name.as_str())
                .or_insert_with(|| ProductSales {
                    product_name: item.product_name.clone(),
                    quantity: 0,
                    revenue: Decimal::ZERO,
                });
            entry.quantity = entry.quantity.saturating_add(u64::from(item.quantity));
            entry.revenue += item.total();
        }
    }

    let mut products: Vec<ProductSales> = by_product.into_values().collect();
    products.sort_by(|left, right| {
        right
            .revenue
            .cmp(&left.revenue)
            .then_with(|| left.product_name.cmp(&right.product_name))
    });
    products.truncate(limit);
    products
}

/// Share of users in one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryShare {
    /// Country name or code.
    pub country: String,
    /// Users in the country.
    pub users: u64,
    /// Percentage of all users.
    pub percentage: Decimal,
}

/// Converts raw country counts into percentages, largest first.
#[must_use]
pub fn country_shares(rows: &[UserCountry]) -> Vec<CountryShare> {
    let total: u64 = rows.iter().map(|row| row.users).sum();
    let mut shares: Vec<CountryShare> = rows
        .iter()
        .map(|row| CountryShare {
            country: row.country.clone(),
            users: row.users,
            percentage: percentage_of(Decimal::from(row.users), Decimal::from(total)),
        })
        .collect();
    shares.sort_by(|left, right| {
        right
            .users
            .cmp(&left.users)
            .then_with(|| left.country.cmp(&right.country))
    });
    shares
}

/// Invoice totals for the financial pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    /// Number of invoices per status.
    pub status_counts: BTreeMap<InvoiceStatus, u64>,
    /// Sum of paid invoice amounts.
    pub paid_total: Decimal,
    /// Sum of open invoice amounts.
    pub outstanding_total: Decimal,
}

/// Summarizes invoices by status.
#[must_use]
pub fn summarize_invoices(invoices: &[Invoice]) -> InvoiceSummary {
    let mut summary = InvoiceSummary::default();
    for invoice in invoices {
        *summary.status_counts.entry(invoice.status).or_default() += 1;
        if invoice.status == InvoiceStatus::Paid {
            summary.paid_total += invoice.amount;
        } else if invoice.status.is_outstanding() {
            summary.outstanding_total += invoice.amount;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::{
        average_per_unit, country_shares, growth_rate, percentage_of, summarize_invoices,
        summarize_transactions, top_products,
    };
    use crate::{
        Invoice, InvoiceStatus, LineItem, TransactionRecord, TransactionStatus, UserCountry,
    };

    fn order(status: TransactionStatus, amount: i64, items: Vec<(&str, u32, i64)>) -> TransactionRecord {
        TransactionRecord::new(
            "order",
            status,
            Decimal::from(amount),
            None,
            "buyer@example.com",
            items
                .into_iter()
                .map(|(name, quantity, price)| LineItem {
                    product_name: name.to_owned(),
                    quantity,
                    unit_price: Decimal::from(price),
                })
                .collect(),
        )
        .unwrap_or_else(|error| panic!("invalid test record: {error}"))
    }

    #[test]
    fn percentage_of_zero_whole_is_zero() {
        assert_eq!(percentage_of(Decimal::from(42), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percentage_of(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn percentage_of_zero_whole_is_always_zero(
            mantissa in any::<i64>(),
            scale in 0_u32..=28,
            whole_scale in 0_u32..=28,
            negative_zero in any::<bool>(),
        ) {
            let part = Decimal::new(mantissa, scale);
            let mut whole = Decimal::new(0, whole_scale);
            whole.set_sign_negative(negative_zero);

            prop_assert_eq!(percentage_of(part, whole), Decimal::ZERO);
        }
    }

    #[test]
    fn percentage_of_rounds_to_two_places() {
        assert_eq!(
            percentage_of(Decimal::ONE, Decimal::from(3)),
            Decimal::new(3333, 2)
        );
    }

    #[test]
    fn average_per_unit_guards_zero_count() {
        assert_eq!(average_per_unit(Decimal::from(10), 0), Decimal::ZERO);
        assert_eq!(average_per_unit(Decimal::from(10), 4), Decimal::new(250, 2));
    }

    #[test]
    fn growth_rate_handles_missing_baseline() {
        assert_eq!(growth_rate(Decimal::ZERO, Decimal::from(5)), Decimal::ZERO);
        assert_eq!(growth_rate(Decimal::from(50), Decimal::from(75)), Decimal::from(50));
        assert_eq!(growth_rate(Decimal::from(100), Decimal::from(25)), Decimal::from(-75));
    }

    #[test]
    fn summary_counts_statuses_and_paid_revenue() {
        let records = vec![
            order(TransactionStatus::Paid, 100, Vec::new()),
            order(TransactionStatus::Paid, 50, Vec::new()),
            order(TransactionStatus::Failed, 70, Vec::new()),
            order(TransactionStatus::Pending, 10, Vec::new()),
        ];

        let summary = summarize_transactions(&records);

        assert_eq!(summary.total_count, 4);
        assert_eq!(summary.paid_revenue, Decimal::from(150));
        assert_eq!(summary.average_order_value, Decimal::from(75));
        assert_eq!(summary.success_rate, Decimal::from(50));
        assert_eq!(summary.status_counts.get(&TransactionStatus::Refunded), Some(&0));
    }

    #[test]
    fn top_products_ranks_paid_line_items_by_revenue() {
        let records = vec![
            order(TransactionStatus::Paid, 0, vec![("Basic", 2, 10), ("Pro", 1, 50)]),
            order(TransactionStatus::Paid, 0, vec![("Basic", 1, 10)]),
            order(TransactionStatus::Failed, 0, vec![("Enterprise", 1, 900)]),
            order(TransactionStatus::Paid, 0, vec![("Addon", 3, 10)]),
        ];

        let products = top_products(&records, 2);

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product_name, "Pro");
        assert_eq!(products[1].product_name, "Addon");
        assert_eq!(products[1].quantity, 3);
    }

    #[test]
    fn country_shares_sum_to_one_hundred_for_even_split() {
        let shares = country_shares(&[
            UserCountry {
                country: "DE".to_owned(),
                users: 1,
            },
            UserCountry {
                country: "US".to_owned(),
                users: 3,
            },
        ]);

        assert_eq!(shares[0].country, "US");
        assert_eq!(shares[0].percentage, Decimal::from(75));
        assert_eq!(shares[1].percentage, Decimal::from(25));
    }

    #[test]
    fn invoice_summary_splits_paid_and_outstanding() {
        let invoice = |status: InvoiceStatus, amount: i64| Invoice {
            id: "inv".to_owned(),
            number: None,
            status,
            amount: Decimal::from(amount),
            issued_at: None,
            customer_identifier: String::new(),
        };

        let summary = summarize_invoices(&[
            invoice(InvoiceStatus::Paid, 40),
            invoice(InvoiceStatus::Open, 15),
            invoice(InvoiceStatus::Void, 99),
        ]);

        assert_eq!(summary.paid_total, Decimal::from(40));
        assert_eq!(summary.outstanding_total, Decimal::from(15));
        assert_eq!(summary.status_counts.get(&InvoiceStatus::Void), Some(&1));
    }
}
