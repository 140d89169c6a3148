// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::tenant::TenantId;

/// Identifier of a group within a tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A role name bound to the tenant it grants access within
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub tenant_id: TenantId,
}

impl Role {
    pub fn new(name: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            name: name.into(),
            tenant_id,
        }
    }
}

/// Desired state of one group, computed from a template and a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedGroup {
    pub group_id: GroupId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub roles: BTreeSet<Role>,
}

impl RenderedGroup {
    pub fn role_names(&self) -> BTreeSet<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }
}

/// Group as persisted by the group directory
///
/// `members` belongs to administrators and other processes; reconciliation
/// only ever re-submits what it read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGroup {
    pub group_id: GroupId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub members: BTreeSet<String>,
}

impl StoredGroup {
    /// New group for a first reconciliation: rendered fields, no members
    pub fn from_rendered(rendered: RenderedGroup) -> Self {
        Self {
            group_id: rendered.group_id,
            tenant_id: rendered.tenant_id,
            name: rendered.name,
            description: rendered.description,
            roles: rendered.roles,
            members: BTreeSet::new(),
        }
    }

    pub fn role_names(&self) -> BTreeSet<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }
}

/// Full replacement state submitted to `GroupDirectory::update_group`.
///
/// Update is a total overwrite of name, description, roles and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupUpdate {
    pub group_id: GroupId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub roles: BTreeSet<String>,
    pub members: BTreeSet<String>,
}

impl GroupUpdate {
    /// Rendered fields with the existing group's members carried over
    pub fn preserving_members(rendered: &RenderedGroup, existing: &StoredGroup) -> Self {
        Self {
            group_id: rendered.group_id.clone(),
            tenant_id: rendered.tenant_id.clone(),
            name: rendered.name.clone(),
            description: rendered.description.clone(),
            roles: rendered.role_names(),
            members: existing.members.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered() -> RenderedGroup {
        let tenant_id = TenantId::new("acme");
        RenderedGroup {
            group_id: GroupId::new("NEWS_ACME"),
            tenant_id: tenant_id.clone(),
            name: "News Team (Acme Corp)".to_string(),
            description: "News team for Acme Corp".to_string(),
            roles: BTreeSet::from([
                Role::new("ROLE_NEWS_ADMIN", tenant_id.clone()),
                Role::new("ROLE_NEWS_EDITOR", tenant_id),
            ]),
        }
    }

    #[test]
    fn test_from_rendered_starts_without_members() {
        let group = StoredGroup::from_rendered(rendered());
        assert_eq!(group.group_id.as_str(), "NEWS_ACME");
        assert!(group.members.is_empty());
        assert_eq!(group.roles.len(), 2);
    }

    #[test]
    fn test_update_carries_existing_members() {
        let mut existing = StoredGroup::from_rendered(rendered());
        existing.members = BTreeSet::from(["alice".to_string(), "bob".to_string()]);
        existing.description = "old".to_string();

        let update = GroupUpdate::preserving_members(&rendered(), &existing);
        assert_eq!(update.description, "News team for Acme Corp");
        assert_eq!(update.members, existing.members);
        assert_eq!(
            update.roles,
            BTreeSet::from(["ROLE_NEWS_ADMIN".to_string(), "ROLE_NEWS_EDITOR".to_string()])
        );
    }
}
