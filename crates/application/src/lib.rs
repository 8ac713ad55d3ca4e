//! Application services and ports.

#![forbid(unsafe_code)]

mod analytics_service;
mod fail_soft;
mod ports;
mod rbac_admin_service;
mod role_assignment_reconciler;

pub use analytics_service::{
    AnalyticsDashboard, AnalyticsService, AnalyticsWindow, FinancialReport,
};
pub use fail_soft::{SoftFailure, SoftFetch, cancellable, fetch_soft, settle_batch};
pub use ports::{
    Clock, Notice, NoticeLevel, Notifier, PaymentsApi, PermissionInput, RbacApi, RoleInput,
};
pub use rbac_admin_service::{RbacAdminService, RbacOverview};
pub use role_assignment_reconciler::{
    MutationId, MutationKind, MutationOutcome, MutationStatus, PendingMutation,
    RoleAssignmentReconciler, RoleMutation,
};
