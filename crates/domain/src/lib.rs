//! Domain entities and pure dashboard transforms.

#![forbid(unsafe_code)]

mod assignment_index;
mod metrics;
mod payments;
mod rbac;
mod time_series;
mod transaction;

pub use assignment_index::{AssignmentIndex, UserFilter, filter_users};
pub use metrics::{
    CountryShare, InvoiceSummary, ProductSales, TransactionSummary, average_per_unit,
    country_shares, growth_rate, percentage_of, revenue_growth, summarize_invoices,
    summarize_transactions, top_products,
};
pub use payments::{Invoice, InvoiceStatus, PaymentStats, UserCountry};
pub use rbac::{
    Assignment, AssignmentId, BulkPermissionOperation, BulkPermissionRequest, Permission,
    PermissionId, Role, RoleId, User, UserId,
};
pub use time_series::{
    Bucket, Granularity, bucket_by, bucket_by_day, bucket_by_month, total_revenue,
};
pub use transaction::{
    BadgeTone, LineItem, TransactionRecord, TransactionStatus, parse_occurred_at,
};
