// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory tenant directory
//!
//! Holds the tenant set and, when wired to an [`EventBus`], announces every
//! registration, update and removal as a [`TenantLifecycleEvent`].

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::domain::directory::DirectoryError;
use crate::domain::events::TenantLifecycleEvent;
use crate::domain::tenant::{Tenant, TenantDirectory, TenantId};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantSyncReport {
    pub registered: usize,
    pub updated: usize,
    pub removed: usize,
}

impl TenantSyncReport {
    pub fn is_empty(&self) -> bool {
        self.registered + self.updated + self.removed == 0
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTenantDirectory {
    tenants: Arc<RwLock<BTreeMap<TenantId, Tenant>>>,
    event_bus: Option<Arc<EventBus>>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenants(tenants: Vec<Tenant>) -> Self {
        let map = tenants.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            tenants: Arc::new(RwLock::new(map)),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Add a tenant and publish `TenantRegistered`
    pub fn register_tenant(&self, tenant: Tenant) -> Result<(), DirectoryError> {
        {
            let mut guard = self.tenants.write();
            if guard.contains_key(&tenant.id) {
                return Err(DirectoryError::Unexpected(format!(
                    "tenant {} is already registered",
                    tenant.id
                )));
            }
            guard.insert(tenant.id.clone(), tenant.clone());
        }
        info!(tenant_id = %tenant.id, "Tenant registered");
        self.publish(TenantLifecycleEvent::registered(tenant));
        Ok(())
    }

    /// Replace a tenant's attributes and publish `TenantUpdated`
    pub fn update_tenant(&self, tenant: Tenant) -> Result<(), DirectoryError> {
        {
            let mut guard = self.tenants.write();
            let slot = guard
                .get_mut(&tenant.id)
                .ok_or_else(|| DirectoryError::NotFound(format!("tenant {}", tenant.id)))?;
            *slot = tenant.clone();
        }
        info!(tenant_id = %tenant.id, "Tenant updated");
        self.publish(TenantLifecycleEvent::updated(tenant));
        Ok(())
    }

    /// Remove a tenant and publish `TenantRemoved`
    pub fn remove_tenant(&self, tenant_id: &TenantId) -> Result<Tenant, DirectoryError> {
        let removed = self
            .tenants
            .write()
            .remove(tenant_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("tenant {}", tenant_id)))?;
        info!(tenant_id = %tenant_id, "Tenant removed");
        self.publish(TenantLifecycleEvent::removed(removed.clone()));
        Ok(removed)
    }

    /// Bring the directory in line with `desired`, publishing one lifecycle
    /// event per registered, changed or removed tenant
    pub fn sync(&self, desired: Vec<Tenant>) -> Result<TenantSyncReport, DirectoryError> {
        let current = self.tenants.read().clone();
        let desired: BTreeMap<TenantId, Tenant> = desired.into_iter().map(|t| (t.id.clone(), t)).collect();
        let mut report = TenantSyncReport::default();

        for id in current.keys().filter(|id| !desired.contains_key(*id)) {
            self.remove_tenant(id)?;
            report.removed += 1;
        }
        for (id, tenant) in desired {
            match current.get(&id) {
                None => {
                    self.register_tenant(tenant)?;
                    report.registered += 1;
                }
                Some(existing) if existing != &tenant => {
                    self.update_tenant(tenant)?;
                    report.updated += 1;
                }
                Some(_) => {}
            }
        }

        Ok(report)
    }

    fn publish(&self, event: TenantLifecycleEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish_tenant_event(event);
        }
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, DirectoryError> {
        Ok(self.tenants.read().values().cloned().collect())
    }

    async fn get_tenant(&self, tenant_id: &TenantId) -> Result<Tenant, DirectoryError> {
        self.tenants
            .read()
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(format!("tenant {}", tenant_id)))
    }
}
