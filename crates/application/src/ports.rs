mod payments;
mod rbac;
mod runtime;

pub use payments::PaymentsApi;
pub use rbac::{PermissionInput, RbacApi, RoleInput};
pub use runtime::{Clock, Notice, NoticeLevel, Notifier};
