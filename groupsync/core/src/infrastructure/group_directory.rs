// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory group directory
//!
//! Reference [`GroupDirectory`] used for development, the CLI and tests.
//! Optionally loaded from and saved to a YAML snapshot so that repeated CLI
//! runs observe the groups (and hand-edited members) of earlier runs.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use crate::domain::directory::{DirectoryError, GroupDirectory};
use crate::domain::group::{GroupId, GroupUpdate, Role, StoredGroup};
use crate::domain::security_context::TenantScope;
use crate::domain::tenant::TenantId;

type GroupKey = (TenantId, GroupId);

#[derive(Clone, Default)]
pub struct InMemoryGroupDirectory {
    groups: Arc<RwLock<BTreeMap<GroupKey, StoredGroup>>>,
}

impl InMemoryGroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(groups: impl IntoIterator<Item = StoredGroup>) -> Self {
        let directory = Self::new();
        {
            let mut guard = directory.groups.write();
            for group in groups {
                guard.insert((group.tenant_id.clone(), group.group_id.clone()), group);
            }
        }
        directory
    }

    /// Load a YAML snapshot; a missing file yields an empty directory
    pub fn from_snapshot(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No group snapshot at {:?}, starting empty", path);
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let groups: Vec<StoredGroup> = serde_yaml::from_str(&content)?;
        tracing::info!("Loaded {} groups from snapshot {:?}", groups.len(), path);
        Ok(Self::with_groups(groups))
    }

    /// Write all groups to a YAML snapshot
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), DirectoryError> {
        let yaml = serde_yaml::to_string(&self.list_all())?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn get(&self, tenant_id: &TenantId, group_id: &GroupId) -> Option<StoredGroup> {
        self.groups
            .read()
            .get(&(tenant_id.clone(), group_id.clone()))
            .cloned()
    }

    pub fn list_all(&self) -> Vec<StoredGroup> {
        self.groups.read().values().cloned().collect()
    }

    pub fn list_by_tenant(&self, tenant_id: &TenantId) -> Vec<StoredGroup> {
        self.groups
            .read()
            .values()
            .filter(|g| &g.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    /// Membership change made outside reconciliation (e.g. by an administrator)
    pub fn add_members<I, S>(&self, tenant_id: &TenantId, group_id: &GroupId, members: I) -> Result<(), DirectoryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut guard = self.groups.write();
        let group = guard
            .get_mut(&(tenant_id.clone(), group_id.clone()))
            .ok_or_else(|| DirectoryError::NotFound(format!("group {} in tenant {}", group_id, tenant_id)))?;
        group.members.extend(members.into_iter().map(Into::into));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

fn check_scope(scope: &TenantScope, tenant_id: &TenantId) -> Result<(), DirectoryError> {
    if scope.covers(tenant_id) {
        Ok(())
    } else {
        Err(DirectoryError::Unauthorized(format!(
            "{} may not access groups of tenant {}",
            scope.principal, tenant_id
        )))
    }
}

#[async_trait]
impl GroupDirectory for InMemoryGroupDirectory {
    async fn load_group(
        &self,
        scope: &TenantScope,
        group_id: &GroupId,
        tenant_id: &TenantId,
    ) -> Result<Option<StoredGroup>, DirectoryError> {
        check_scope(scope, tenant_id)?;
        Ok(self.get(tenant_id, group_id))
    }

    async fn create_group(&self, scope: &TenantScope, group: StoredGroup) -> Result<(), DirectoryError> {
        check_scope(scope, &group.tenant_id)?;
        let mut guard = self.groups.write();
        let key = (group.tenant_id.clone(), group.group_id.clone());
        if guard.contains_key(&key) {
            return Err(DirectoryError::Unexpected(format!(
                "group {} already exists in tenant {}",
                group.group_id, group.tenant_id
            )));
        }
        guard.insert(key, group);
        Ok(())
    }

    async fn update_group(&self, scope: &TenantScope, update: GroupUpdate) -> Result<(), DirectoryError> {
        check_scope(scope, &update.tenant_id)?;
        let mut guard = self.groups.write();
        let group = guard
            .get_mut(&(update.tenant_id.clone(), update.group_id.clone()))
            .ok_or_else(|| {
                DirectoryError::NotFound(format!("group {} in tenant {}", update.group_id, update.tenant_id))
            })?;

        let roles: BTreeSet<Role> = update
            .roles
            .into_iter()
            .map(|name| Role::new(name, update.tenant_id.clone()))
            .collect();
        group.name = update.name;
        group.description = update.description;
        group.roles = roles;
        group.members = update.members;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(tenant: &str) -> TenantScope {
        TenantScope {
            tenant_id: TenantId::new(tenant),
            principal: format!("system@{}", tenant),
            roles: BTreeSet::new(),
        }
    }

    fn group(tenant: &str, id: &str) -> StoredGroup {
        StoredGroup {
            group_id: GroupId::new(id),
            tenant_id: TenantId::new(tenant),
            name: "Name".to_string(),
            description: "Description".to_string(),
            roles: BTreeSet::from([Role::new("ROLE_A", TenantId::new(tenant))]),
            members: BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn test_foreign_scope_is_unauthorized() {
        let directory = InMemoryGroupDirectory::with_groups([group("acme", "G")]);

        let result = directory
            .load_group(&scope("globex"), &GroupId::new("G"), &TenantId::new("acme"))
            .await;
        assert!(matches!(result, Err(DirectoryError::Unauthorized(_))));

        let result = directory.create_group(&scope("globex"), group("acme", "H")).await;
        assert!(matches!(result, Err(DirectoryError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_same_group_id_in_two_tenants() {
        let directory = InMemoryGroupDirectory::new();
        directory.create_group(&scope("acme"), group("acme", "G")).await.unwrap();
        directory.create_group(&scope("globex"), group("globex", "G")).await.unwrap();

        assert_eq!(directory.len(), 2);
        let duplicate = directory.create_group(&scope("acme"), group("acme", "G")).await;
        assert!(matches!(duplicate, Err(DirectoryError::Unexpected(_))));
    }

    #[tokio::test]
    async fn test_update_overwrites_all_fields() {
        let directory = InMemoryGroupDirectory::with_groups([group("acme", "G")]);
        directory
            .add_members(&TenantId::new("acme"), &GroupId::new("G"), ["alice"])
            .unwrap();

        directory
            .update_group(
                &scope("acme"),
                GroupUpdate {
                    group_id: GroupId::new("G"),
                    tenant_id: TenantId::new("acme"),
                    name: "New".to_string(),
                    description: "New description".to_string(),
                    roles: BTreeSet::from(["ROLE_B".to_string()]),
                    members: BTreeSet::from(["bob".to_string()]),
                },
            )
            .await
            .unwrap();

        let stored = directory.get(&TenantId::new("acme"), &GroupId::new("G")).unwrap();
        assert_eq!(stored.name, "New");
        assert_eq!(stored.role_names(), BTreeSet::from(["ROLE_B".to_string()]));
        assert_eq!(stored.members, BTreeSet::from(["bob".to_string()]));
    }

    #[tokio::test]
    async fn test_update_missing_group_is_not_found() {
        let directory = InMemoryGroupDirectory::new();
        let result = directory
            .update_group(
                &scope("acme"),
                GroupUpdate {
                    group_id: GroupId::new("G"),
                    tenant_id: TenantId::new("acme"),
                    name: "n".to_string(),
                    description: "d".to_string(),
                    roles: BTreeSet::new(),
                    members: BTreeSet::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(DirectoryError::NotFound(_))));
    }

    #[test]
    fn test_snapshot_roundtrip_keeps_members() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.yaml");

        let directory = InMemoryGroupDirectory::with_groups([group("acme", "G")]);
        directory
            .add_members(&TenantId::new("acme"), &GroupId::new("G"), ["alice", "bob"])
            .unwrap();
        directory.save_snapshot(&path).unwrap();

        let restored = InMemoryGroupDirectory::from_snapshot(&path).unwrap();
        let stored = restored.get(&TenantId::new("acme"), &GroupId::new("G")).unwrap();
        assert_eq!(stored.members.len(), 2);

        let empty = InMemoryGroupDirectory::from_snapshot(dir.path().join("missing.yaml")).unwrap();
        assert!(empty.is_empty());
    }
}
