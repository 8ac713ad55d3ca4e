//! Per-user role membership derived from authoritative assignment edges.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{Assignment, AssignmentId, RoleId, User, UserId};

/// Local, rebuildable view of which roles each user holds.
///
/// The index is a cache of backend state. It is rebuilt from scratch on every
/// successful fetch and never merged incrementally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentIndex {
    roles_by_user: BTreeMap<UserId, BTreeSet<RoleId>>,
    #[serde(skip)]
    edge_ids: HashMap<(UserId, RoleId), AssignmentId>,
}

impl AssignmentIndex {
    /// Builds the index, giving every listed user an entry even without edges.
    #[must_use]
    pub fn build(users: &[User], edges: &[Assignment]) -> Self {
        let mut roles_by_user: BTreeMap<UserId, BTreeSet<RoleId>> = users
            .iter()
            .map(|user| (user.id.clone(), BTreeSet::new()))
            .collect();
        let mut edge_ids = HashMap::with_capacity(edges.len());

        for edge in edges {
            roles_by_user
                .entry(edge.user_id.clone())
                .or_default()
                .insert(edge.role_id.clone());
            edge_ids.insert(
                (edge.user_id.clone(), edge.role_id.clone()),
                edge.id.clone(),
            );
        }

        Self {
            roles_by_user,
            edge_ids,
        }
    }

    /// Returns the role set for a user, empty when unknown.
    #[must_use]
    pub fn roles_for(&self, user_id: &UserId) -> BTreeSet<RoleId> {
        self.roles_by_user
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns whether the user currently holds the role.
    #[must_use]
    pub fn is_assigned(&self, user_id: &UserId, role_id: &RoleId) -> bool {
        self.roles_by_user
            .get(user_id)
            .is_some_and(|roles| roles.contains(role_id))
    }

    /// Returns the backend edge id for a membership, when known.
    #[must_use]
    pub fn edge_id(&self, user_id: &UserId, role_id: &RoleId) -> Option<&AssignmentId> {
        self.edge_ids.get(&(user_id.clone(), role_id.clone()))
    }

    /// Sets one membership, returning whether it was set before.
    pub fn set_membership(&mut self, user_id: &UserId, role_id: &RoleId, assigned: bool) -> bool {
        let roles = self.roles_by_user.entry(user_id.clone()).or_default();
        if assigned {
            !roles.insert(role_id.clone())
        } else {
            self.edge_ids.remove(&(user_id.clone(), role_id.clone()));
            roles.remove(role_id)
        }
    }

    /// Records the backend id of a confirmed edge.
    pub fn record_edge(&mut self, edge: &Assignment) {
        self.edge_ids.insert(
            (edge.user_id.clone(), edge.role_id.clone()),
            edge.id.clone(),
        );
    }

    /// Iterates users and their role sets in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &BTreeSet<RoleId>)> {
        self.roles_by_user.iter()
    }

    /// Returns the number of indexed users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles_by_user.len()
    }

    /// Returns true when no users are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles_by_user.is_empty()
    }

    /// Counts members per role.
    #[must_use]
    pub fn role_member_counts(&self) -> BTreeMap<RoleId, usize> {
        let mut counts = BTreeMap::new();
        for role_id in self.roles_by_user.values().flatten() {
            *counts.entry(role_id.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Filter applied to the user management table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive substring matched against username and email.
    pub search: Option<String>,
    /// Restrict to active or inactive accounts.
    pub active: Option<bool>,
    /// Restrict to holders of a role.
    pub role_id: Option<RoleId>,
}

/// Filters users, keeping input order.
#[must_use]
pub fn filter_users<'a>(
    users: &'a [User],
    index: &AssignmentIndex,
    filter: &UserFilter,
) -> Vec<&'a User> {
    let needle = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase);

    users
        .iter()
        .filter(|user| {
            needle.as_deref().is_none_or(|needle| {
                user.username.to_lowercase().contains(needle)
                    || user.email.to_lowercase().contains(needle)
            })
        })
        .filter(|user| filter.active.is_none_or(|active| user.is_active == active))
        .filter(|user| {
            filter
                .role_id
                .as_ref()
                .is_none_or(|role_id| index.is_assigned(&user.id, role_id))
        })
        .collect()
}
