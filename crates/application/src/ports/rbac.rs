use std::collections::BTreeSet;

use async_trait::async_trait;

use tallyboard_core::AppResult;
use tallyboard_domain::{
    Assignment, AssignmentId, BulkPermissionRequest, Permission, PermissionId, Role, RoleId, User,
    UserId,
};

/// Input payload for creating or updating roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInput {
    /// Unique machine name.
    pub name: String,
    /// Label shown in the UI.
    pub display_name: String,
    /// Free-form description.
    pub description: String,
    /// Permissions granted by the role.
    pub permission_ids: BTreeSet<PermissionId>,
}

/// Input payload for creating or updating permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionInput {
    /// Unique machine name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Resource grouping.
    pub resource: Option<String>,
}

/// Port for the RBAC section of the backend API.
#[async_trait]
pub trait RbacApi: Send + Sync {
    /// Lists admin-visible users.
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Lists roles with their permission ids.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Lists grantable permissions.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Lists authoritative user-role edges.
    async fn list_role_assignments(&self) -> AppResult<Vec<Assignment>>;

    /// Creates one user-role edge.
    async fn assign_role(&self, user_id: &UserId, role_id: &RoleId) -> AppResult<Assignment>;

    /// Deletes one user-role edge, addressed by id when the id is known.
    async fn revoke_role(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        assignment_id: Option<&AssignmentId>,
    ) -> AppResult<()>;

    /// Creates a role.
    async fn create_role(&self, input: RoleInput) -> AppResult<Role>;

    /// Replaces a role's attributes.
    async fn update_role(&self, role_id: &RoleId, input: RoleInput) -> AppResult<Role>;

    /// Deletes a role.
    async fn delete_role(&self, role_id: &RoleId) -> AppResult<()>;

    /// Creates a permission.
    async fn create_permission(&self, input: PermissionInput) -> AppResult<Permission>;

    /// Replaces a permission's attributes.
    async fn update_permission(
        &self,
        permission_id: &PermissionId,
        input: PermissionInput,
    ) -> AppResult<Permission>;

    /// Deletes a permission.
    async fn delete_permission(&self, permission_id: &PermissionId) -> AppResult<()>;

    /// Applies one batched permission operation.
    async fn apply_bulk_permission_operation(&self, request: BulkPermissionRequest)
    -> AppResult<()>;
}
