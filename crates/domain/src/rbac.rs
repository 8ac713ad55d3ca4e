//! Role-based access control model mirrored from the admin backend.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tallyboard_core::{AppError, AppResult};

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from its transport value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the transport value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                formatter.write_str(self.0.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

string_identifier!(
    /// Backend user identifier.
    UserId
);
string_identifier!(
    /// Backend role identifier.
    RoleId
);
string_identifier!(
    /// Backend permission identifier.
    PermissionId
);
string_identifier!(
    /// Backend identifier of one user-role assignment edge.
    AssignmentId
);

/// Admin-visible user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Whether the account may sign in.
    pub is_active: bool,
}

/// Named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier.
    pub id: RoleId,
    /// Unique machine name.
    pub name: String,
    /// Label shown in the UI.
    pub display_name: String,
    /// Free-form description.
    pub description: String,
    /// Permissions granted by the role.
    pub permission_ids: std::collections::BTreeSet<PermissionId>,
}

/// Single grantable permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Permission identifier.
    pub id: PermissionId,
    /// Unique machine name, e.g. `payments.read`.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Resource the permission applies to, when the backend groups by resource.
    pub resource: Option<String>,
}

/// Authoritative user-role edge owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Edge identifier.
    pub id: AssignmentId,
    /// Assigned user.
    pub user_id: UserId,
    /// Assigned role.
    pub role_id: RoleId,
}

/// Batched permission operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkPermissionOperation {
    /// Delete the selected permissions.
    Delete,
    /// Grant the selected permissions to a role.
    AssignToRole,
    /// Remove the selected permissions from a role.
    RemoveFromRole,
}

impl BulkPermissionOperation {
    /// Returns a stable transport value for this operation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::AssignToRole => "assign_to_role",
            Self::RemoveFromRole => "remove_from_role",
        }
    }

    /// Returns true when the operation needs a target role.
    #[must_use]
    pub fn requires_target_role(&self) -> bool {
        matches!(self, Self::AssignToRole | Self::RemoveFromRole)
    }
}

/// Validated batched permission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkPermissionRequest {
    permission_ids: Vec<PermissionId>,
    operation: BulkPermissionOperation,
    target_role_id: Option<RoleId>,
}

impl BulkPermissionRequest {
    /// Validates and creates a bulk request.
    pub fn new(
        permission_ids: Vec<PermissionId>,
        operation: BulkPermissionOperation,
        target_role_id: Option<RoleId>,
    ) -> AppResult<Self> {
        if permission_ids.is_empty() {
            return Err(AppError::Validation(
                "bulk permission operation requires at least one permission".to_owned(),
            ));
        }

        if operation.requires_target_role() && target_role_id.is_none() {
            return Err(AppError::Validation(format!(
                "bulk permission operation '{}' requires a target role",
                operation.as_str()
            )));
        }

        let target_role_id = if operation.requires_target_role() {
            target_role_id
        } else {
            None
        };

        Ok(Self {
            permission_ids,
            operation,
            target_role_id,
        })
    }

    /// Returns the selected permissions.
    #[must_use]
    pub fn permission_ids(&self) -> &[PermissionId] {
        &self.permission_ids
    }

    /// Returns the requested operation.
    #[must_use]
    pub fn operation(&self) -> BulkPermissionOperation {
        self.operation
    }

    /// Returns the target role for role-scoped operations.
    #[must_use]
    pub fn target_role_id(&self) -> Option<&RoleId> {
        self.target_role_id.as_ref()
    }
}
