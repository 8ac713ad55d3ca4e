use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tallyboard_core::{AppError, AppResult};
use tallyboard_domain::{
    Assignment, AssignmentId, BulkPermissionOperation, BulkPermissionRequest, Permission,
    PermissionId, Role, RoleId, User, UserId,
};
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use super::{MutationId, MutationKind, MutationStatus, RoleAssignmentReconciler};
use crate::{Notice, NoticeLevel, Notifier, PermissionInput, RbacApi, RoleInput};

#[derive(Default)]
struct FakeRbacApi {
    users: Vec<User>,
    edges: Mutex<Vec<Assignment>>,
    bulk_requests: Mutex<Vec<BulkPermissionRequest>>,
    next_edge: AtomicUsize,
    list_calls: AtomicUsize,
    fail_mutations: AtomicBool,
    fail_lists: AtomicBool,
    stall_mutations: AtomicBool,
    hold_next_listing: AtomicBool,
    listing_taken: Notify,
    release_listing: Notify,
}

impl FakeRbacApi {
    fn with_example_data() -> Self {
        Self {
            users: vec![user("1"), user("2")],
            edges: Mutex::new(vec![edge("e1", "1", "A")]),
            next_edge: AtomicUsize::new(100),
            ..Self::default()
        }
    }

    fn rejected() -> AppError {
        AppError::UpstreamStatus {
            status: 500,
            message: "assignment store unavailable".to_owned(),
        }
    }
}

#[async_trait]
impl RbacApi for FakeRbacApi {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(AppError::Transport("offline".to_owned()));
        }
        Ok(self.users.clone())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(Vec::new())
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(Vec::new())
    }

    async fn list_role_assignments(&self) -> AppResult<Vec<Assignment>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(AppError::Transport("offline".to_owned()));
        }
        let edges = self.edges.lock().await.clone();
        if self.hold_next_listing.swap(false, Ordering::SeqCst) {
            self.listing_taken.notify_one();
            self.release_listing.notified().await;
        }
        Ok(edges)
    }

    async fn assign_role(&self, user_id: &UserId, role_id: &RoleId) -> AppResult<Assignment> {
        if self.stall_mutations.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        let id = self.next_edge.fetch_add(1, Ordering::SeqCst);
        let created = Assignment {
            id: AssignmentId::new(format!("e{id}")),
            user_id: user_id.clone(),
            role_id: role_id.clone(),
        };
        self.edges.lock().await.push(created.clone());
        Ok(created)
    }

    async fn revoke_role(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        _assignment_id: Option<&AssignmentId>,
    ) -> AppResult<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        self.edges
            .lock()
            .await
            .retain(|edge| !(edge.user_id == *user_id && edge.role_id == *role_id));
        Ok(())
    }

    async fn create_role(&self, _input: RoleInput) -> AppResult<Role> {
        Err(AppError::Internal("not used".to_owned()))
    }

    async fn update_role(&self, _role_id: &RoleId, _input: RoleInput) -> AppResult<Role> {
        Err(AppError::Internal("not used".to_owned()))
    }

    async fn delete_role(&self, _role_id: &RoleId) -> AppResult<()> {
        Err(AppError::Internal("not used".to_owned()))
    }

    async fn create_permission(&self, _input: PermissionInput) -> AppResult<Permission> {
        Err(AppError::Internal("not used".to_owned()))
    }

    async fn update_permission(
        &self,
        _permission_id: &PermissionId,
        _input: PermissionInput,
    ) -> AppResult<Permission> {
        Err(AppError::Internal("not used".to_owned()))
    }

    async fn delete_permission(&self, _permission_id: &PermissionId) -> AppResult<()> {
        Err(AppError::Internal("not used".to_owned()))
    }

    async fn apply_bulk_permission_operation(
        &self,
        request: BulkPermissionRequest,
    ) -> AppResult<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        self.bulk_requests.lock().await.push(request);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: std::sync::Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn levels(&self) -> Vec<NoticeLevel> {
        self.notices
            .lock()
            .map(|notices| notices.iter().map(|notice| notice.level).collect())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

fn user(id: &str) -> User {
    User {
        id: UserId::from(id),
        username: format!("user{id}"),
        email: format!("user{id}@example.com"),
        is_active: true,
    }
}

fn edge(id: &str, user_id: &str, role_id: &str) -> Assignment {
    Assignment {
        id: AssignmentId::from(id),
        user_id: UserId::from(user_id),
        role_id: RoleId::from(role_id),
    }
}

fn roles(values: &[&str]) -> BTreeSet<RoleId> {
    values.iter().map(|value| RoleId::from(*value)).collect()
}

async fn loaded_reconciler() -> (
    RoleAssignmentReconciler,
    Arc<FakeRbacApi>,
    Arc<RecordingNotifier>,
) {
    let api = Arc::new(FakeRbacApi::with_example_data());
    let notifier = Arc::new(RecordingNotifier::default());
    let reconciler = RoleAssignmentReconciler::new(api.clone(), notifier.clone());
    let loaded = reconciler.refresh(&CancellationToken::new()).await;
    assert!(loaded.is_ok());
    (reconciler, api, notifier)
}

#[tokio::test]
async fn refresh_builds_entry_for_every_user() {
    let (reconciler, _, _) = loaded_reconciler().await;

    assert_eq!(reconciler.roles_for(&UserId::from("1")).await, roles(&["A"]));
    assert!(reconciler.roles_for(&UserId::from("2")).await.is_empty());
    assert_eq!(reconciler.index().await.len(), 2);
}

#[tokio::test]
async fn toggle_applies_optimistically_then_rolls_back_on_rejection() {
    let (reconciler, _, notifier) = loaded_reconciler().await;
    let user_id = UserId::from("1");
    let role_id = RoleId::from("B");

    let ticket = reconciler.begin_toggle(&user_id, &role_id).await;
    assert_eq!(ticket.kind, MutationKind::Assign);
    assert_eq!(reconciler.roles_for(&user_id).await, roles(&["A", "B"]));
    assert_eq!(
        reconciler.mutation_status(ticket.id).await,
        Some(MutationStatus::Pending)
    );

    let settled = reconciler
        .settle(&ticket, Err(FakeRbacApi::rejected()))
        .await;

    assert!(settled.is_err());
    assert_eq!(reconciler.roles_for(&user_id).await, roles(&["A"]));
    assert_eq!(
        reconciler.mutation_status(ticket.id).await,
        Some(MutationStatus::RolledBack)
    );
    assert!(reconciler.is_stale().await);
    assert_eq!(notifier.levels(), vec![NoticeLevel::Error]);
}

#[tokio::test]
async fn toggle_role_round_trip_restores_initial_set() {
    let (reconciler, api, _) = loaded_reconciler().await;
    let user_id = UserId::from("1");
    let role_id = RoleId::from("B");
    let initial = reconciler.roles_for(&user_id).await;

    let assigned = reconciler
        .toggle_role(&user_id, &role_id, &CancellationToken::new())
        .await;
    assert_eq!(
        assigned.map(|outcome| (outcome.status, outcome.roles)),
        Ok((MutationStatus::Committed, roles(&["A", "B"])))
    );

    let revoked = reconciler
        .toggle_role(&user_id, &role_id, &CancellationToken::new())
        .await;
    assert_eq!(
        revoked.map(|outcome| outcome.status),
        Ok(MutationStatus::Committed)
    );

    assert_eq!(reconciler.roles_for(&user_id).await, initial);
    assert_eq!(api.edges.lock().await.len(), 1);
}

#[tokio::test]
async fn rejected_toggle_role_restores_and_refetches() {
    let (reconciler, api, _) = loaded_reconciler().await;
    api.fail_mutations.store(true, Ordering::SeqCst);
    let calls_before = api.list_calls.load(Ordering::SeqCst);

    let result = reconciler
        .toggle_role(
            &UserId::from("1"),
            &RoleId::from("A"),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(AppError::UpstreamStatus { status: 500, .. })
    ));
    assert_eq!(reconciler.roles_for(&UserId::from("1")).await, roles(&["A"]));
    assert_eq!(api.list_calls.load(Ordering::SeqCst), calls_before + 1);
    assert!(!reconciler.is_stale().await);
}

#[tokio::test]
async fn overlapping_toggles_on_different_roles_are_independent() {
    let (reconciler, _, _) = loaded_reconciler().await;
    let user_id = UserId::from("2");

    let first = reconciler.begin_toggle(&user_id, &RoleId::from("A")).await;
    let second = reconciler.begin_toggle(&user_id, &RoleId::from("B")).await;
    assert_eq!(reconciler.pending_mutations().await.len(), 2);

    let second_result = reconciler.settle(&second, Ok(None)).await;
    let first_result = reconciler
        .settle(&first, Err(FakeRbacApi::rejected()))
        .await;

    assert!(second_result.is_ok());
    assert!(first_result.is_err());
    assert_eq!(reconciler.roles_for(&user_id).await, roles(&["B"]));
    assert!(reconciler.pending_mutations().await.is_empty());
}

#[tokio::test]
async fn newest_toggle_on_same_edge_wins() {
    let (reconciler, _, _) = loaded_reconciler().await;
    let user_id = UserId::from("2");
    let role_id = RoleId::from("C");

    let assign = reconciler.begin_toggle(&user_id, &role_id).await;
    let revoke = reconciler.begin_toggle(&user_id, &role_id).await;
    assert_eq!(assign.kind, MutationKind::Assign);
    assert_eq!(revoke.kind, MutationKind::Revoke);

    let revoke_result = reconciler
        .settle(&revoke, Err(FakeRbacApi::rejected()))
        .await;
    let assign_result = reconciler
        .settle(&assign, Ok(Some(edge("e9", "2", "C"))))
        .await;

    assert!(revoke_result.is_err());
    assert_eq!(
        assign_result.map(|outcome| outcome.status),
        Ok(MutationStatus::Superseded)
    );
    assert_eq!(
        reconciler.mutation_status(revoke.id).await,
        Some(MutationStatus::RolledBack)
    );
    assert_eq!(reconciler.roles_for(&user_id).await, roles(&["C"]));
}

#[tokio::test]
async fn failed_refresh_keeps_last_known_good_index() {
    let (reconciler, api, notifier) = loaded_reconciler().await;
    api.fail_lists.store(true, Ordering::SeqCst);

    let result = reconciler.refresh(&CancellationToken::new()).await;

    assert!(matches!(result, Err(AppError::Transport(_))));
    assert_eq!(reconciler.roles_for(&UserId::from("1")).await, roles(&["A"]));
    assert_eq!(notifier.levels(), vec![NoticeLevel::Error]);
}

#[tokio::test]
async fn refresh_keeps_pending_optimistic_changes() {
    let (reconciler, _, _) = loaded_reconciler().await;
    let user_id = UserId::from("2");

    let ticket = reconciler.begin_toggle(&user_id, &RoleId::from("B")).await;
    let refreshed = reconciler.refresh(&CancellationToken::new()).await;

    assert!(refreshed.is_ok());
    assert_eq!(reconciler.roles_for(&user_id).await, roles(&["B"]));
    assert!(reconciler.settle(&ticket, Ok(None)).await.is_ok());
}

#[tokio::test]
async fn bulk_operation_clears_selection_and_refetches() {
    let (reconciler, api, notifier) = loaded_reconciler().await;
    reconciler.select_permission(PermissionId::from("p1")).await;
    reconciler.select_permission(PermissionId::from("p2")).await;
    reconciler.deselect_permission(&PermissionId::from("p2")).await;
    let calls_before = api.list_calls.load(Ordering::SeqCst);

    let result = reconciler
        .apply_bulk_operation(
            BulkPermissionOperation::AssignToRole,
            Some(RoleId::from("A")),
            &CancellationToken::new(),
        )
        .await;

    assert!(result.is_ok());
    assert!(reconciler.selected_permissions().await.is_empty());
    assert_eq!(api.list_calls.load(Ordering::SeqCst), calls_before + 1);
    let requests = api.bulk_requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].permission_ids(), &[PermissionId::from("p1")]);
    assert_eq!(notifier.levels(), vec![NoticeLevel::Success]);
}

#[tokio::test]
async fn failed_bulk_operation_keeps_selection() {
    let (reconciler, api, notifier) = loaded_reconciler().await;
    api.fail_mutations.store(true, Ordering::SeqCst);
    reconciler.select_permission(PermissionId::from("p1")).await;

    let result = reconciler
        .apply_bulk_operation(BulkPermissionOperation::Delete, None, &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(reconciler.selected_permissions().await.len(), 1);
    assert_eq!(notifier.levels(), vec![NoticeLevel::Error]);
}

#[tokio::test]
async fn bulk_operation_without_selection_is_rejected() {
    let (reconciler, api, _) = loaded_reconciler().await;

    let result = reconciler
        .apply_bulk_operation(BulkPermissionOperation::Delete, None, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(api.bulk_requests.lock().await.is_empty());
}

#[tokio::test]
async fn toggle_committed_during_refresh_survives_the_rebuild() {
    let (reconciler, api, _) = loaded_reconciler().await;
    let user_id = UserId::from("2");
    let role_id = RoleId::from("B");
    api.hold_next_listing.store(true, Ordering::SeqCst);

    let refresh_cancel = CancellationToken::new();
    let refresh = reconciler.refresh(&refresh_cancel);
    let toggle = async {
        api.listing_taken.notified().await;
        let outcome = reconciler
            .toggle_role(&user_id, &role_id, &CancellationToken::new())
            .await;
        api.release_listing.notify_one();
        outcome
    };
    let (refreshed, toggled) = tokio::join!(refresh, toggle);

    assert!(refreshed.is_ok());
    assert_eq!(
        toggled.map(|outcome| outcome.status),
        Ok(MutationStatus::Committed)
    );
    let server_roles: BTreeSet<RoleId> = api
        .edges
        .lock()
        .await
        .iter()
        .filter(|edge| edge.user_id == user_id)
        .map(|edge| edge.role_id.clone())
        .collect();
    assert_eq!(server_roles, roles(&["B"]));
    assert_eq!(reconciler.roles_for(&user_id).await, server_roles);
}

#[tokio::test]
async fn rollback_during_refresh_keeps_cache_stale_until_refetched() {
    let (reconciler, api, _) = loaded_reconciler().await;
    let user_id = UserId::from("1");
    let ticket = reconciler.begin_toggle(&user_id, &RoleId::from("C")).await;
    api.hold_next_listing.store(true, Ordering::SeqCst);

    let refresh_cancel = CancellationToken::new();
    let refresh = reconciler.refresh(&refresh_cancel);
    let rejection = async {
        api.listing_taken.notified().await;
        let settled = reconciler
            .settle(&ticket, Err(FakeRbacApi::rejected()))
            .await;
        api.release_listing.notify_one();
        settled
    };
    let (refreshed, settled) = tokio::join!(refresh, rejection);

    assert!(refreshed.is_ok());
    assert!(settled.is_err());
    assert_eq!(reconciler.roles_for(&user_id).await, roles(&["A"]));
    assert!(!reconciler.is_stale().await);
}

#[tokio::test]
async fn cancelled_toggle_restores_edge_without_notice() {
    let (reconciler, api, notifier) = loaded_reconciler().await;
    api.stall_mutations.store(true, Ordering::SeqCst);
    let user_id = UserId::from("2");
    let cancel = CancellationToken::new();
    let calls_before = api.list_calls.load(Ordering::SeqCst);

    let role_id = RoleId::from("B");
    let toggle = reconciler.toggle_role(&user_id, &role_id, &cancel);
    let page_closed = async {
        tokio::task::yield_now().await;
        cancel.cancel();
    };
    let (result, ()) = tokio::join!(toggle, page_closed);

    assert_eq!(result, Err(AppError::Cancelled));
    assert!(reconciler.roles_for(&user_id).await.is_empty());
    assert!(reconciler.pending_mutations().await.is_empty());
    assert_eq!(
        reconciler.mutation_status(MutationId::new(1)).await,
        Some(MutationStatus::Cancelled)
    );
    assert!(notifier.levels().is_empty());
    assert!(reconciler.is_stale().await);
    assert_eq!(api.list_calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn settled_mutation_history_is_bounded() {
    let (reconciler, _, _) = loaded_reconciler().await;
    let user_id = UserId::from("2");
    let role_id = RoleId::from("B");

    let mut last = None;
    let mut first = None;
    for _ in 0..40 {
        let ticket = reconciler.begin_toggle(&user_id, &role_id).await;
        first.get_or_insert(ticket.id);
        assert!(reconciler.settle(&ticket, Ok(None)).await.is_ok());
        last = Some(ticket.id);
    }

    let (Some(first), Some(last)) = (first, last) else {
        panic!("toggles should have been issued");
    };
    assert_eq!(reconciler.mutation_status(first).await, None);
    assert_eq!(
        reconciler.mutation_status(last).await,
        Some(MutationStatus::Committed)
    );
}
