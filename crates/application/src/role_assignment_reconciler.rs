//! Optimistic role assignment toggling with rollback.
//!
//! The reconciler owns the cached [`AssignmentIndex`] for one page. Each toggle
//! is tracked as its own mutation (`Pending -> Committed | RolledBack |
//! Superseded | Cancelled`). When two toggles overlap on the same user-role edge, the most
//! recently issued one owns the edge: responses for older toggles are recorded
//! as `Superseded` and leave local state alone.

mod mutation;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tallyboard_core::{AppError, AppResult};
use tallyboard_domain::{
    Assignment, AssignmentIndex, BulkPermissionOperation, BulkPermissionRequest, PermissionId,
    Role, RoleId, User, UserId,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fail_soft::cancellable;
use crate::{Notice, Notifier, RbacApi};

pub use mutation::{
    MutationId, MutationKind, MutationOutcome, MutationStatus, PendingMutation, RoleMutation,
};

type EdgeKey = (UserId, RoleId);

const MAX_REFRESH_ATTEMPTS: usize = 3;
const SETTLED_MUTATION_HISTORY: usize = 32;

#[derive(Default)]
struct ReconcilerState {
    index: AssignmentIndex,
    users: Vec<User>,
    roles: Vec<Role>,
    mutations: BTreeMap<MutationId, RoleMutation>,
    edge_owners: HashMap<EdgeKey, MutationId>,
    next_mutation_id: u64,
    settle_generation: u64,
    stale: bool,
    selected_permissions: BTreeSet<PermissionId>,
}

impl ReconcilerState {
    fn has_pending(&self) -> bool {
        !self.edge_owners.is_empty()
    }

    fn replay_pending(&mut self) {
        for ((user_id, role_id), mutation_id) in &self.edge_owners {
            if let Some(mutation) = self.mutations.get(mutation_id) {
                self.index.set_membership(
                    user_id,
                    role_id,
                    mutation.kind == MutationKind::Assign,
                );
            }
        }
    }

    fn prune_settled(&mut self) {
        let settled: Vec<MutationId> = self
            .mutations
            .values()
            .filter(|mutation| mutation.status.is_terminal())
            .map(|mutation| mutation.id)
            .collect();
        let excess = settled.len().saturating_sub(SETTLED_MUTATION_HISTORY);
        for id in settled.into_iter().take(excess) {
            self.mutations.remove(&id);
        }
    }
}

/// Page-scoped owner of the user-role assignment cache.
pub struct RoleAssignmentReconciler {
    api: Arc<dyn RbacApi>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ReconcilerState>,
}

impl RoleAssignmentReconciler {
    /// Creates an empty reconciler; call [`Self::refresh`] to populate it.
    #[must_use]
    pub fn new(api: Arc<dyn RbacApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            state: Mutex::new(ReconcilerState::default()),
        }
    }

    /// Refetches users, roles and assignment edges and rebuilds the index.
    ///
    /// On failure the last-known-good index is kept and the error returned.
    /// A snapshot fetched while a toggle settled is discarded and fetched again.
    pub async fn refresh(&self, cancel: &CancellationToken) -> AppResult<()> {
        for attempt in 1..=MAX_REFRESH_ATTEMPTS {
            let generation = self.state.lock().await.settle_generation;
            let (users, roles, edges) = self.fetch_snapshot(cancel).await?;

            let mut state = self.state.lock().await;
            if state.settle_generation != generation {
                debug!(attempt, "toggles settled during refresh, refetching");
                continue;
            }

            state.index = AssignmentIndex::build(&users, &edges);
            state.replay_pending();
            state.users = users;
            state.roles = roles;
            state.stale = false;

            info!(
                users = state.users.len(),
                roles = state.roles.len(),
                edges = edges.len(),
                "role assignment index rebuilt"
            );

            return Ok(());
        }

        warn!(
            attempts = MAX_REFRESH_ATTEMPTS,
            "role assignments kept changing during refresh, keeping cached index"
        );
        self.state.lock().await.stale = true;
        Err(AppError::Conflict(
            "role assignments changed while refreshing".to_owned(),
        ))
    }

    async fn fetch_snapshot(
        &self,
        cancel: &CancellationToken,
    ) -> AppResult<(Vec<User>, Vec<Role>, Vec<Assignment>)> {
        let fetched = cancellable(cancel, async {
            let (users, roles, edges) = tokio::join!(
                self.api.list_users(),
                self.api.list_roles(),
                self.api.list_role_assignments(),
            );
            Ok::<_, AppError>((users?, roles?, edges?))
        })
        .await;

        match fetched {
            Ok(fetched) => Ok(fetched),
            Err(AppError::Cancelled) => Err(AppError::Cancelled),
            Err(error) => {
                warn!(error = %error, "role assignment refresh failed, keeping cached index");
                self.notifier.notify(Notice::error(format!(
                    "Could not load role assignments: {error}"
                )));
                Err(error)
            }
        }
    }

    /// Applies the optimistic half of a toggle and returns its ticket.
    ///
    /// The caller must pass the ticket and the backend result to [`Self::settle`].
    pub async fn begin_toggle(&self, user_id: &UserId, role_id: &RoleId) -> PendingMutation {
        let mut state = self.state.lock().await;

        let previous_roles = state.index.roles_for(user_id);
        let was_assigned = previous_roles.contains(role_id);
        let kind = if was_assigned {
            MutationKind::Revoke
        } else {
            MutationKind::Assign
        };
        let assignment_id = state.index.edge_id(user_id, role_id).cloned();

        state.next_mutation_id = state.next_mutation_id.saturating_add(1);
        let id = MutationId::new(state.next_mutation_id);
        state
            .index
            .set_membership(user_id, role_id, kind == MutationKind::Assign);

        let key = (user_id.clone(), role_id.clone());
        if let Some(previous_owner) = state.edge_owners.insert(key, id) {
            debug!(
                mutation = %id,
                previous = %previous_owner,
                user_id = %user_id,
                role_id = %role_id,
                "toggle overlaps an in-flight toggle on the same edge"
            );
        }

        state.mutations.insert(
            id,
            RoleMutation {
                id,
                user_id: user_id.clone(),
                role_id: role_id.clone(),
                kind,
                previous_roles,
                status: MutationStatus::Pending,
                error: None,
            },
        );

        PendingMutation {
            id,
            user_id: user_id.clone(),
            role_id: role_id.clone(),
            kind,
            assignment_id,
        }
    }

    /// Settles a ticket with the backend result.
    ///
    /// Returns the terminal outcome; failed requests return their error after
    /// the local state was rolled back or left to the newer owner. A
    /// cancelled request is recorded as `Cancelled` and not reported to the user.
    pub async fn settle(
        &self,
        ticket: &PendingMutation,
        result: AppResult<Option<Assignment>>,
    ) -> AppResult<MutationOutcome> {
        let mut state = self.state.lock().await;
        let key = (ticket.user_id.clone(), ticket.role_id.clone());
        let owns_edge = state.edge_owners.get(&key) == Some(&ticket.id);
        if owns_edge {
            state.edge_owners.remove(&key);
        }

        let (status, error) = match result {
            Ok(confirmed_edge) => {
                if owns_edge {
                    if let Some(edge) = confirmed_edge {
                        state.index.record_edge(&edge);
                    }
                    (MutationStatus::Committed, None)
                } else {
                    (MutationStatus::Superseded, None)
                }
            }
            Err(error) => {
                if owns_edge {
                    let was_assigned = ticket.kind == MutationKind::Revoke;
                    state
                        .index
                        .set_membership(&ticket.user_id, &ticket.role_id, was_assigned);
                    if let (true, Some(assignment_id)) = (was_assigned, &ticket.assignment_id) {
                        state.index.record_edge(&Assignment {
                            id: assignment_id.clone(),
                            user_id: ticket.user_id.clone(),
                            role_id: ticket.role_id.clone(),
                        });
                    }
                }
                state.stale = true;
                let status = if error.is_cancelled() {
                    MutationStatus::Cancelled
                } else if owns_edge {
                    MutationStatus::RolledBack
                } else {
                    MutationStatus::Superseded
                };
                (status, Some(error))
            }
        };

        state.settle_generation = state.settle_generation.wrapping_add(1);
        if let Some(mutation) = state.mutations.get_mut(&ticket.id) {
            mutation.status = status;
            mutation.error = error.clone();
        }
        state.prune_settled();

        let roles = state.index.roles_for(&ticket.user_id);
        drop(state);

        match error {
            Some(AppError::Cancelled) => {
                debug!(mutation = %ticket.id, "role toggle cancelled before the backend answered");
                Err(AppError::Cancelled)
            }
            None => {
                debug!(mutation = %ticket.id, status = ?status, "role toggle settled");
                Ok(MutationOutcome {
                    id: ticket.id,
                    status,
                    roles,
                })
            }
            Some(error) => {
                warn!(
                    mutation = %ticket.id,
                    user_id = %ticket.user_id,
                    role_id = %ticket.role_id,
                    status = ?status,
                    error = %error,
                    "role toggle rejected"
                );
                self.notifier.notify(Notice::error(format!(
                    "Could not update role '{}' for user '{}': {error}",
                    ticket.role_id, ticket.user_id
                )));
                Err(error)
            }
        }
    }

    /// Toggles one user-role edge optimistically.
    ///
    /// After a rejection the cache is refetched once no other toggle is in flight.
    /// `cancel` is the owning page's token; a cancelled toggle skips the refetch.
    pub async fn toggle_role(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        cancel: &CancellationToken,
    ) -> AppResult<MutationOutcome> {
        let ticket = self.begin_toggle(user_id, role_id).await;

        let result = match ticket.kind {
            MutationKind::Assign => {
                cancellable(cancel, self.api.assign_role(user_id, role_id))
                    .await
                    .map(Some)
            }
            MutationKind::Revoke => cancellable(
                cancel,
                self.api
                    .revoke_role(user_id, role_id, ticket.assignment_id.as_ref()),
            )
            .await
            .map(|()| None),
        };

        let outcome = self.settle(&ticket, result).await;
        self.refresh_if_stale(cancel).await;
        outcome
    }

    /// Sends one batched permission request built from the current selection.
    ///
    /// On success the selection is cleared and the whole cache is refetched.
    pub async fn apply_bulk_operation(
        &self,
        operation: BulkPermissionOperation,
        target_role_id: Option<RoleId>,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let selected: Vec<PermissionId> = self
            .state
            .lock()
            .await
            .selected_permissions
            .iter()
            .cloned()
            .collect();
        let request = BulkPermissionRequest::new(selected, operation, target_role_id)?;
        let affected = request.permission_ids().len();

        if let Err(error) = cancellable(
            cancel,
            self.api.apply_bulk_permission_operation(request),
        )
        .await
        {
            if !error.is_cancelled() {
                warn!(operation = operation.as_str(), error = %error, "bulk permission operation failed");
                self.notifier.notify(Notice::error(format!(
                    "Bulk '{}' failed: {error}",
                    operation.as_str()
                )));
            }
            return Err(error);
        }

        self.state.lock().await.selected_permissions.clear();
        self.notifier.notify(Notice::success(format!(
            "Applied '{}' to {affected} permission(s)",
            operation.as_str()
        )));

        if let Err(error) = self.refresh(cancel).await {
            debug!(error = %error, "refresh after bulk operation did not complete");
        }

        Ok(())
    }

    /// Adds a permission to the bulk selection.
    pub async fn select_permission(&self, permission_id: PermissionId) {
        self.state
            .lock()
            .await
            .selected_permissions
            .insert(permission_id);
    }

    /// Removes a permission from the bulk selection.
    pub async fn deselect_permission(&self, permission_id: &PermissionId) {
        self.state
            .lock()
            .await
            .selected_permissions
            .remove(permission_id);
    }

    /// Empties the bulk selection.
    pub async fn clear_selection(&self) {
        self.state.lock().await.selected_permissions.clear();
    }

    /// Returns the bulk selection.
    pub async fn selected_permissions(&self) -> BTreeSet<PermissionId> {
        self.state.lock().await.selected_permissions.clone()
    }

    /// Returns the locally reconciled role set for a user.
    pub async fn roles_for(&self, user_id: &UserId) -> BTreeSet<RoleId> {
        self.state.lock().await.index.roles_for(user_id)
    }

    /// Returns a copy of the current index.
    pub async fn index(&self) -> AssignmentIndex {
        self.state.lock().await.index.clone()
    }

    /// Returns the users from the last successful refresh.
    pub async fn users(&self) -> Vec<User> {
        self.state.lock().await.users.clone()
    }

    /// Returns the roles from the last successful refresh.
    pub async fn roles(&self) -> Vec<Role> {
        self.state.lock().await.roles.clone()
    }

    /// Returns one tracked mutation.
    pub async fn mutation(&self, id: MutationId) -> Option<RoleMutation> {
        self.state.lock().await.mutations.get(&id).cloned()
    }

    /// Returns the status of one tracked mutation.
    pub async fn mutation_status(&self, id: MutationId) -> Option<MutationStatus> {
        self.state
            .lock()
            .await
            .mutations
            .get(&id)
            .map(|mutation| mutation.status)
    }

    /// Returns mutations still waiting for a backend response.
    pub async fn pending_mutations(&self) -> Vec<RoleMutation> {
        self.state
            .lock()
            .await
            .mutations
            .values()
            .filter(|mutation| mutation.status == MutationStatus::Pending)
            .cloned()
            .collect()
    }

    /// Returns true when a rejection left the cache awaiting a refetch.
    pub async fn is_stale(&self) -> bool {
        self.state.lock().await.stale
    }

    async fn refresh_if_stale(&self, cancel: &CancellationToken) {
        let should_refresh = {
            let state = self.state.lock().await;
            state.stale && !state.has_pending() && !cancel.is_cancelled()
        };

        if !should_refresh {
            return;
        }

        if let Err(error) = self.refresh(cancel).await {
            debug!(error = %error, "refresh after rejected toggle did not complete");
        }
    }
}

#[cfg(test)]
mod tests;
