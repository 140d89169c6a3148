// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};

use crate::domain::security_context::{SecurityContextError, SecurityContextSwitcher, TenantScope};
use crate::domain::sync_config::SecurityConfig;
use crate::domain::tenant::{Tenant, TenantId};

/// Issues a per-tenant system identity `<principal>@<tenant id>`
pub struct SystemSecurityContextSwitcher {
    principal: String,
    roles: BTreeSet<String>,
    denied: HashSet<TenantId>,
}

impl SystemSecurityContextSwitcher {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            roles: BTreeSet::new(),
            denied: HashSet::new(),
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            principal: config.system_principal.clone(),
            roles: config.roles.iter().cloned().collect(),
            denied: config.denied_tenants.iter().cloned().collect(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Refuse impersonation of `tenant_id`
    pub fn deny(mut self, tenant_id: TenantId) -> Self {
        self.denied.insert(tenant_id);
        self
    }
}

#[async_trait]
impl SecurityContextSwitcher for SystemSecurityContextSwitcher {
    async fn impersonate(&self, tenant: &Tenant) -> Result<TenantScope, SecurityContextError> {
        if self.denied.contains(&tenant.id) {
            return Err(SecurityContextError::Denied {
                tenant_id: tenant.id.clone(),
                reason: format!("system principal '{}' is not allowed in this tenant", self.principal),
            });
        }

        Ok(TenantScope {
            tenant_id: tenant.id.clone(),
            principal: format!("{}@{}", self.principal, tenant.id),
            roles: self.roles.clone(),
        })
    }
}
