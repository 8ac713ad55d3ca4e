use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use tallyboard_core::AppError;
use tallyboard_domain::{AssignmentId, RoleId, UserId};

/// Identifier of one toggle mutation within a reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(u64);

impl MutationId {
    pub(super) fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for MutationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "mutation-{}", self.0)
    }
}

/// Direction of a single-edge toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Create the user-role edge.
    Assign,
    /// Delete the user-role edge.
    Revoke,
}

/// Lifecycle of one optimistic mutation.
///
/// `Pending` moves to exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    /// Optimistic state applied, backend response outstanding.
    Pending,
    /// Backend confirmed; the optimistic state stands.
    Committed,
    /// Backend rejected; the edge was restored to its pre-toggle membership.
    RolledBack,
    /// A newer toggle on the same edge took ownership before this one settled.
    Superseded,
    /// The owning page went away before the backend answered; the edge was
    /// restored and the cache marked stale.
    Cancelled,
}

impl MutationStatus {
    /// Returns true for every state except `Pending`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Tracked mutation record exposed to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMutation {
    /// Mutation identifier.
    pub id: MutationId,
    /// Target user.
    pub user_id: UserId,
    /// Toggled role.
    pub role_id: RoleId,
    /// Toggle direction.
    pub kind: MutationKind,
    /// User's role set captured when the toggle was issued.
    pub previous_roles: BTreeSet<RoleId>,
    /// Current lifecycle state.
    pub status: MutationStatus,
    /// Backend error for failed mutations.
    pub error: Option<AppError>,
}

/// Ticket returned by `begin_toggle`, carrying what the backend call needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    /// Mutation identifier.
    pub id: MutationId,
    /// Target user.
    pub user_id: UserId,
    /// Toggled role.
    pub role_id: RoleId,
    /// Toggle direction.
    pub kind: MutationKind,
    /// Backend edge id for revokes, when known.
    pub assignment_id: Option<AssignmentId>,
}

/// Local result of a settled toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Mutation identifier.
    pub id: MutationId,
    /// Terminal state.
    pub status: MutationStatus,
    /// User's role set after settling.
    pub roles: BTreeSet<RoleId>,
}
