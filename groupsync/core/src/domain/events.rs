// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::group::GroupId;
use crate::domain::tenant::{Tenant, TenantId};

/// Tenant lifecycle notifications emitted by the tenant directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TenantLifecycleEvent {
    TenantRegistered {
        tenant: Tenant,
        occurred_at: DateTime<Utc>,
    },
    TenantUpdated {
        tenant: Tenant,
        occurred_at: DateTime<Utc>,
    },
    TenantRemoved {
        tenant: Tenant,
        occurred_at: DateTime<Utc>,
    },
}

impl TenantLifecycleEvent {
    pub fn registered(tenant: Tenant) -> Self {
        Self::TenantRegistered { tenant, occurred_at: Utc::now() }
    }

    pub fn updated(tenant: Tenant) -> Self {
        Self::TenantUpdated { tenant, occurred_at: Utc::now() }
    }

    pub fn removed(tenant: Tenant) -> Self {
        Self::TenantRemoved { tenant, occurred_at: Utc::now() }
    }

    pub fn tenant(&self) -> &Tenant {
        match self {
            Self::TenantRegistered { tenant, .. }
            | Self::TenantUpdated { tenant, .. }
            | Self::TenantRemoved { tenant, .. } => tenant,
        }
    }
}

/// Outcome of reconciling one (template, tenant) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReconciliationEvent {
    GroupCreated {
        group_id: GroupId,
        tenant_id: TenantId,
        template: String,
        reconciled_at: DateTime<Utc>,
    },
    GroupUpdated {
        group_id: GroupId,
        tenant_id: TenantId,
        template: String,
        reconciled_at: DateTime<Utc>,
    },
    GroupReconciliationFailed {
        group_id: GroupId,
        tenant_id: TenantId,
        template: String,
        reason: String,
        failed_at: DateTime<Utc>,
    },
}

impl ReconciliationEvent {
    pub fn tenant_id(&self) -> &TenantId {
        match self {
            Self::GroupCreated { tenant_id, .. }
            | Self::GroupUpdated { tenant_id, .. }
            | Self::GroupReconciliationFailed { tenant_id, .. } => tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_event_serialization_tag() {
        let event = TenantLifecycleEvent::registered(Tenant::new("acme", "Acme Corp"));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"tenant_registered\""));

        let restored: TenantLifecycleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.tenant().id.as_str(), "acme");
    }
}
