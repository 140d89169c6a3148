// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::directory::DirectoryError;

/// Stable identifier of a tenant (organization)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A tenant as exposed by the tenant directory.
///
/// Owned by the directory service; the core never creates, renames or deletes tenants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,

    pub display_name: String,

    /// False for tenants served by a read-only provider that cannot hold
    /// persisted groups. Such tenants are skipped by reconciliation.
    #[serde(default = "default_managed")]
    pub managed: bool,
}

impl Tenant {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: TenantId::new(id),
            display_name: display_name.into(),
            managed: true,
        }
    }

    /// Same tenant, flagged as backed by a read-only provider
    pub fn unmanaged(mut self) -> Self {
        self.managed = false;
        self
    }
}

fn default_managed() -> bool {
    true
}

/// Tenant enumerator contract
///
/// `list_tenants` is re-enumerated on every full reconciliation pass.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// List all tenants currently known to the directory
    async fn list_tenants(&self) -> Result<Vec<Tenant>, DirectoryError>;

    /// Look up a single tenant; `DirectoryError::NotFound` when unknown
    async fn get_tenant(&self, id: &TenantId) -> Result<Tenant, DirectoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_managed_defaults_to_true() {
        let tenant: Tenant = serde_yaml::from_str("id: acme\ndisplay_name: Acme Corp\n").unwrap();
        assert_eq!(tenant.id, TenantId::new("acme"));
        assert!(tenant.managed);
        assert!(!tenant.unmanaged().managed);
    }
}
