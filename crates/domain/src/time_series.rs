//! Fixed-width, gap-free time bucketing of paid transactions.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::TransactionRecord;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Width of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One calendar month per bucket.
    Month,
    /// One calendar day per bucket.
    Day,
}

/// One aggregation slot of a chart series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Short month name (`Jan`) or ISO date (`2024-01-15`).
    pub label: String,
    /// First day covered by the bucket, inclusive.
    pub window_start: NaiveDate,
    /// First day after the bucket, exclusive.
    pub window_end: NaiveDate,
    /// Exact sum of paid amounts in the window.
    pub revenue_sum: Decimal,
    /// Number of paid records in the window.
    pub record_count: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    revenue_sum: Decimal,
    record_count: u64,
}

/// Buckets paid records into `months_back` calendar months ending at `now`.
///
/// The series is ordered oldest first and always has `months_back` entries.
#[must_use]
pub fn bucket_by_month(
    records: &[TransactionRecord],
    months_back: u32,
    now: DateTime<Utc>,
) -> Vec<Bucket> {
    let totals = group_paid(records, |paid_at| month_ordinal(paid_at.date_naive()));
    let current = month_ordinal(now.date_naive());

    (0..i64::from(months_back))
        .rev()
        .filter_map(|offset| {
            let ordinal = current - offset;
            let window_start = month_start(ordinal)?;
            let window_end = month_start(ordinal + 1)?;
            let Totals {
                revenue_sum,
                record_count,
            } = totals.get(&ordinal).copied().unwrap_or_default();

            Some(Bucket {
                label: month_label(window_start).to_owned(),
                window_start,
                window_end,
                revenue_sum,
                record_count,
            })
        })
        .collect()
}

/// Buckets paid records into `days_back` calendar days ending at `now`.
///
/// The series is ordered oldest first and always has `days_back` entries.
#[must_use]
pub fn bucket_by_day(
    records: &[TransactionRecord],
    days_back: u32,
    now: DateTime<Utc>,
) -> Vec<Bucket> {
    let totals = group_paid(records, |paid_at| paid_at.date_naive());
    let today = now.date_naive();

    (0..u64::from(days_back))
        .rev()
        .filter_map(|offset| {
            let window_start = today.checked_sub_days(Days::new(offset))?;
            let window_end = window_start.checked_add_days(Days::new(1))?;
            let Totals {
                revenue_sum,
                record_count,
            } = totals.get(&window_start).copied().unwrap_or_default();

            Some(Bucket {
                label: window_start.format("%Y-%m-%d").to_string(),
                window_start,
                window_end,
                revenue_sum,
                record_count,
            })
        })
        .collect()
}

/// Dispatches to the month or day bucketer.
#[must_use]
pub fn bucket_by(
    records: &[TransactionRecord],
    granularity: Granularity,
    window: u32,
    now: DateTime<Utc>,
) -> Vec<Bucket> {
    match granularity {
        Granularity::Month => bucket_by_month(records, window, now),
        Granularity::Day => bucket_by_day(records, window, now),
    }
}

/// Sums revenue over a whole series.
#[must_use]
pub fn total_revenue(buckets: &[Bucket]) -> Decimal {
    buckets.iter().map(|bucket| bucket.revenue_sum).sum()
}

fn group_paid<K, F>(records: &[TransactionRecord], key: F) -> HashMap<K, Totals>
where
    K: std::hash::Hash + Eq,
    F: Fn(DateTime<Utc>) -> K,
{
    let mut totals: HashMap<K, Totals> = HashMap::new();
    for record in records {
        let Some(paid_at) = record.paid_at() else {
            continue;
        };

        let entry = totals.entry(key(paid_at)).or_default();
        entry.revenue_sum += record.amount();
        entry.record_count = entry.record_count.saturating_add(1);
    }

    totals
}

// Months since year 0, so month arithmetic is plain integer arithmetic.
fn month_ordinal(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn month_start(ordinal: i64) -> Option<NaiveDate> {
    let year = i32::try_from(ordinal.div_euclid(12)).ok()?;
    let month0 = u32::try_from(ordinal.rem_euclid(12)).ok()?;
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

fn month_label(date: NaiveDate) -> &'static str {
    MONTH_LABELS[date.month0() as usize]
}
