// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Security Context
//!
//! Reconciliation of a tenant's groups runs as a tenant-scoped system
//! identity. Instead of an ambient thread-local identity, the switcher hands
//! out a [`TenantScope`] capability that is passed explicitly to every
//! [`GroupDirectory`](crate::domain::directory::GroupDirectory) call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use thiserror::Error;

use crate::domain::tenant::{Tenant, TenantId};

/// Capability to read and write one tenant's groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantScope {
    pub tenant_id: TenantId,

    /// System principal the work runs as (e.g. "system@acme")
    pub principal: String,

    pub roles: BTreeSet<String>,
}

impl TenantScope {
    /// Whether this scope may act on `tenant_id`
    pub fn covers(&self, tenant_id: &TenantId) -> bool {
        &self.tenant_id == tenant_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityContextError {
    #[error("impersonation of tenant '{tenant_id}' denied: {reason}")]
    Denied { tenant_id: TenantId, reason: String },
}

/// Host security subsystem contract
#[async_trait]
pub trait SecurityContextSwitcher: Send + Sync {
    /// Produce the tenant-scoped system identity, or refuse the impersonation
    async fn impersonate(&self, tenant: &Tenant) -> Result<TenantScope, SecurityContextError>;
}

/// Execute `work` as the tenant's system identity.
///
/// Whatever `work` returns (including its own errors) is handed back
/// unmodified; only a refused impersonation surfaces as `Err`.
pub async fn run_as<F, Fut, T>(
    switcher: &dyn SecurityContextSwitcher,
    tenant: &Tenant,
    work: F,
) -> Result<T, SecurityContextError>
where
    F: FnOnce(TenantScope) -> Fut,
    Fut: Future<Output = T>,
{
    let scope = switcher.impersonate(tenant).await?;
    tracing::debug!(tenant_id = %tenant.id, principal = %scope.principal, "Entering tenant scope");
    Ok(work(scope).await)
}
