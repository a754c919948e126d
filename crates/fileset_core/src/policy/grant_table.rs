//! In-memory grant table evaluator.

use super::{PolicyEvaluator, PolicyTarget};
use crate::model::principal::Principal;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ObjectGrants {
    edit_users: BTreeSet<String>,
    edit_groups: BTreeSet<String>,
    read_users: BTreeSet<String>,
    read_groups: BTreeSet<String>,
    public_read: bool,
}

/// Per-object user/group grants. Edit implies read; nothing is inherited
/// between objects.
#[derive(Debug, Clone, Default)]
pub struct GrantTable {
    grants: BTreeMap<Uuid, ObjectGrants>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_edit_user(&mut self, object_id: Uuid, user_id: impl Into<String>) -> &mut Self {
        self.entry(object_id).edit_users.insert(user_id.into());
        self
    }

    pub fn grant_edit_group(&mut self, object_id: Uuid, group: impl Into<String>) -> &mut Self {
        self.entry(object_id).edit_groups.insert(group.into());
        self
    }

    pub fn grant_read_user(&mut self, object_id: Uuid, user_id: impl Into<String>) -> &mut Self {
        self.entry(object_id).read_users.insert(user_id.into());
        self
    }

    pub fn grant_read_group(&mut self, object_id: Uuid, group: impl Into<String>) -> &mut Self {
        self.entry(object_id).read_groups.insert(group.into());
        self
    }

    /// Makes `object_id` readable by everyone, including anonymous callers.
    pub fn grant_public_read(&mut self, object_id: Uuid) -> &mut Self {
        self.entry(object_id).public_read = true;
        self
    }

    /// Removes every grant on `object_id`.
    pub fn revoke_all(&mut self, object_id: Uuid) -> &mut Self {
        self.grants.remove(&object_id);
        self
    }

    fn entry(&mut self, object_id: Uuid) -> &mut ObjectGrants {
        self.grants.entry(object_id).or_default()
    }
}

impl PolicyEvaluator for GrantTable {
    fn can_edit(&self, principal: &Principal, target: PolicyTarget<'_>) -> bool {
        let Some(grants) = self.grants.get(&target.object_id()) else {
            return false;
        };
        matches_any(principal, &grants.edit_users, &grants.edit_groups)
    }

    fn can_read(&self, principal: &Principal, target: PolicyTarget<'_>) -> bool {
        let Some(grants) = self.grants.get(&target.object_id()) else {
            return false;
        };
        grants.public_read
            || matches_any(principal, &grants.read_users, &grants.read_groups)
            || matches_any(principal, &grants.edit_users, &grants.edit_groups)
    }
}

fn matches_any(principal: &Principal, users: &BTreeSet<String>, groups: &BTreeSet<String>) -> bool {
    let Some(user_id) = principal.user_id() else {
        return false;
    };
    users.contains(user_id) || principal.groups().iter().any(|group| groups.contains(group))
}
