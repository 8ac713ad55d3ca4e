use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tallyboard_core::{AppResult, NonEmptyString};
use tallyboard_domain::{
    AssignmentIndex, Permission, PermissionId, Role, RoleId, User, UserFilter, filter_users,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::fail_soft::{fetch_soft, settle_batch};
use crate::{Notice, Notifier, PermissionInput, RbacApi, RoleInput};

/// Data rendered by the roles and permissions screens.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RbacOverview {
    /// Admin-visible users.
    pub users: Vec<User>,
    /// Roles with their permission ids.
    pub roles: Vec<Role>,
    /// Grantable permissions.
    pub permissions: Vec<Permission>,
    /// Per-user role sets.
    pub assignments: AssignmentIndex,
    /// Members per role.
    pub role_member_counts: BTreeMap<RoleId, usize>,
    /// Labels of fetches that fell back to empty data.
    pub degraded_sources: Vec<&'static str>,
}

impl RbacOverview {
    /// Returns users matching a table filter.
    #[must_use]
    pub fn filtered_users(&self, filter: &UserFilter) -> Vec<&User> {
        filter_users(&self.users, &self.assignments, filter)
    }
}

/// Application service for role and permission administration.
#[derive(Clone)]
pub struct RbacAdminService {
    api: Arc<dyn RbacApi>,
    notifier: Arc<dyn Notifier>,
}

impl RbacAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(api: Arc<dyn RbacApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Loads the RBAC screens, falling back to empty data per failed source.
    pub async fn load_overview(&self, cancel: &CancellationToken) -> AppResult<RbacOverview> {
        let (users, roles, permissions, edges) = tokio::join!(
            fetch_soft("users", cancel, self.api.list_users()),
            fetch_soft("roles", cancel, self.api.list_roles()),
            fetch_soft("permissions", cancel, self.api.list_permissions()),
            fetch_soft("role-assignments", cancel, self.api.list_role_assignments()),
        );

        let failures = settle_batch(
            cancel,
            self.notifier.as_ref(),
            "access control",
            [
                users.failure,
                roles.failure,
                permissions.failure,
                edges.failure,
            ],
        )?;

        let assignments = AssignmentIndex::build(&users.value, &edges.value);
        info!(
            users = users.value.len(),
            roles = roles.value.len(),
            permissions = permissions.value.len(),
            degraded = failures.len(),
            "rbac overview loaded"
        );

        Ok(RbacOverview {
            role_member_counts: assignments.role_member_counts(),
            assignments,
            users: users.value,
            roles: roles.value,
            permissions: permissions.value,
            degraded_sources: failures.iter().map(|failure| failure.label).collect(),
        })
    }

    /// Creates a role.
    pub async fn create_role(&self, input: RoleInput) -> AppResult<Role> {
        let input = validate_role_input(input)?;
        let result = self.api.create_role(input).await;
        self.report(result, |role| format!("Created role '{}'", role.display_name), "create role")
    }

    /// Updates a role.
    pub async fn update_role(&self, role_id: &RoleId, input: RoleInput) -> AppResult<Role> {
        let input = validate_role_input(input)?;
        let result = self.api.update_role(role_id, input).await;
        self.report(result, |role| format!("Updated role '{}'", role.display_name), "update role")
    }

    /// Deletes a role.
    pub async fn delete_role(&self, role_id: &RoleId) -> AppResult<()> {
        let result = self.api.delete_role(role_id).await;
        self.report(result, |_| format!("Deleted role '{role_id}'"), "delete role")
    }

    /// Creates a permission.
    pub async fn create_permission(&self, input: PermissionInput) -> AppResult<Permission> {
        let input = validate_permission_input(input)?;
        let result = self.api.create_permission(input).await;
        self.report(
            result,
            |permission| format!("Created permission '{}'", permission.name),
            "create permission",
        )
    }

    /// Updates a permission.
    pub async fn update_permission(
        &self,
        permission_id: &PermissionId,
        input: PermissionInput,
    ) -> AppResult<Permission> {
        let input = validate_permission_input(input)?;
        let result = self.api.update_permission(permission_id, input).await;
        self.report(
            result,
            |permission| format!("Updated permission '{}'", permission.name),
            "update permission",
        )
    }

    /// Deletes a permission.
    pub async fn delete_permission(&self, permission_id: &PermissionId) -> AppResult<()> {
        let result = self.api.delete_permission(permission_id).await;
        self.report(
            result,
            |_| format!("Deleted permission '{permission_id}'"),
            "delete permission",
        )
    }

    fn report<T>(
        &self,
        result: AppResult<T>,
        success: impl FnOnce(&T) -> String,
        action: &str,
    ) -> AppResult<T> {
        match &result {
            Ok(value) => self.notifier.notify(Notice::success(success(value))),
            Err(error) => self
                .notifier
                .notify(Notice::error(format!("Failed to {action}: {error}"))),
        }
        result
    }
}

fn validate_role_input(input: RoleInput) -> AppResult<RoleInput> {
    let name = NonEmptyString::new(input.name.trim())?;
    let display_name = if input.display_name.trim().is_empty() {
        name.as_str().to_owned()
    } else {
        input.display_name.trim().to_owned()
    };

    Ok(RoleInput {
        name: name.into(),
        display_name,
        description: input.description.trim().to_owned(),
        permission_ids: input.permission_ids,
    })
}

fn validate_permission_input(input: PermissionInput) -> AppResult<PermissionInput> {
    let name = NonEmptyString::new(input.name.trim())?;

    Ok(PermissionInput {
        name: name.into(),
        description: input.description.trim().to_owned(),
        resource: input
            .resource
            .map(|resource| resource.trim().to_owned())
            .filter(|resource| !resource.is_empty()),
    })
}
