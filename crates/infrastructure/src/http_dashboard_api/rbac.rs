use async_trait::async_trait;
use reqwest::Method;
use tallyboard_application::{PermissionInput, RbacApi, RoleInput};
use tallyboard_core::AppResult;
use tallyboard_domain::{
    Assignment, AssignmentId, BulkPermissionRequest, Permission, PermissionId, Role, RoleId, User,
    UserId,
};

use super::HttpDashboardApi;
use crate::envelope::{decode_items, decode_resource};
use crate::wire::{
    AssignmentRequest, AssignmentWire, BulkPermissionWireRequest, PermissionRequest,
    PermissionWire, RoleRequest, RoleWire, UserWire,
};

fn role_request(input: &RoleInput) -> RoleRequest<'_> {
    RoleRequest {
        name: input.name.as_str(),
        display_name: input.display_name.as_str(),
        description: input.description.as_str(),
        permission_ids: input.permission_ids.iter().map(PermissionId::as_str).collect(),
    }
}

fn permission_request(input: &PermissionInput) -> PermissionRequest<'_> {
    PermissionRequest {
        name: input.name.as_str(),
        description: input.description.as_str(),
        resource: input.resource.as_deref(),
    }
}

#[async_trait]
impl RbacApi for HttpDashboardApi {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        let body = self.get(&["admin", "users"]).await?;
        decode_items(body, "users", UserWire::into_domain)
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let body = self.get(&["admin", "roles"]).await?;
        decode_items(body, "roles", RoleWire::into_domain)
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let body = self.get(&["admin", "permissions"]).await?;
        decode_items(body, "permissions", PermissionWire::into_domain)
    }

    async fn list_role_assignments(&self) -> AppResult<Vec<Assignment>> {
        let body = self.get(&["admin", "role-assignments"]).await?;
        decode_items(body, "role_assignments", AssignmentWire::into_domain)
    }

    async fn assign_role(&self, user_id: &UserId, role_id: &RoleId) -> AppResult<Assignment> {
        let request = AssignmentRequest {
            user_id: user_id.as_str(),
            role_id: role_id.as_str(),
        };
        let body = self
            .send(Method::POST, &["admin", "role-assignments"], Some(&request))
            .await?;
        decode_resource::<AssignmentWire>(body, "assignment")?.into_domain()
    }

    async fn revoke_role(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        assignment_id: Option<&AssignmentId>,
    ) -> AppResult<()> {
        match assignment_id {
            Some(assignment_id) => {
                self.send::<()>(
                    Method::DELETE,
                    &["admin", "role-assignments", assignment_id.as_str()],
                    None,
                )
                .await?;
            }
            None => {
                let request = AssignmentRequest {
                    user_id: user_id.as_str(),
                    role_id: role_id.as_str(),
                };
                self.send(
                    Method::DELETE,
                    &["admin", "role-assignments"],
                    Some(&request),
                )
                    .await?;
            }
        }

        Ok(())
    }

    async fn create_role(&self, input: RoleInput) -> AppResult<Role> {
        let body = self
            .send(
                Method::POST,
                &["admin", "roles"],
                Some(&role_request(&input)),
            )
            .await?;
        decode_resource::<RoleWire>(body, "role")?.into_domain()
    }

    async fn update_role(&self, role_id: &RoleId, input: RoleInput) -> AppResult<Role> {
        let body = self
            .send(
                Method::PUT,
                &["admin", "roles", role_id.as_str()],
                Some(&role_request(&input)),
            )
            .await?;
        decode_resource::<RoleWire>(body, "role")?.into_domain()
    }

    async fn delete_role(&self, role_id: &RoleId) -> AppResult<()> {
        self.send::<()>(Method::DELETE, &["admin", "roles", role_id.as_str()], None)
            .await?;
        Ok(())
    }

    async fn create_permission(&self, input: PermissionInput) -> AppResult<Permission> {
        let body = self
            .send(
                Method::POST,
                &["admin", "permissions"],
                Some(&permission_request(&input)),
            )
            .await?;
        decode_resource::<PermissionWire>(body, "permission")?.into_domain()
    }

    async fn update_permission(
        &self,
        permission_id: &PermissionId,
        input: PermissionInput,
    ) -> AppResult<Permission> {
        let body = self
            .send(
                Method::PUT,
                &["admin", "permissions", permission_id.as_str()],
                Some(&permission_request(&input)),
            )
            .await?;
        decode_resource::<PermissionWire>(body, "permission")?.into_domain()
    }

    async fn delete_permission(&self, permission_id: &PermissionId) -> AppResult<()> {
        self.send::<()>(
            Method::DELETE,
            &["admin", "permissions", permission_id.as_str()],
            None,
        )
        .await?;
        Ok(())
    }

    async fn apply_bulk_permission_operation(
        &self,
        request: BulkPermissionRequest,
    ) -> AppResult<()> {
        let wire = BulkPermissionWireRequest {
            permission_ids: request
                .permission_ids()
                .iter()
                .map(PermissionId::as_str)
                .collect(),
            operation: request.operation().as_str(),
            role_id: request.target_role_id().map(RoleId::as_str),
        };
        self.send(Method::POST, &["admin", "permissions", "bulk"], Some(&wire))
            .await?;
        Ok(())
    }
}
