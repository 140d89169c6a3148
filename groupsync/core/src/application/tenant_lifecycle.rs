// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tenant Lifecycle Listener Application Service
//!
//! Subscribes to tenant lifecycle events on the event bus and keeps each
//! tenant's template groups in place:
//!
//! - `TenantRegistered` / `TenantUpdated`: reconcile every registered template
//! - `TenantRemoved`: nothing; groups are never deleted here
//!
//! Reconciliation errors are logged and never stop the listener. When the
//! listener falls behind and lifecycle events are lost, every tenant is
//! reconciled again.

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::reconciler::{GroupReconciliationService, ReconciliationSummary, TenantReconciliation};
use crate::application::template_registry::TemplateRegistry;
use crate::domain::events::TenantLifecycleEvent;
use crate::domain::tenant::TenantDirectory;
use crate::infrastructure::event_bus::{EventBus, EventBusError};

// ============================================================================
// Service
// ============================================================================

pub struct TenantLifecycleListener {
    reconciler: Arc<dyn GroupReconciliationService>,
    registry: Arc<TemplateRegistry>,
    tenants: Arc<dyn TenantDirectory>,
    event_bus: Arc<EventBus>,
    shutdown: Notify,
}

impl TenantLifecycleListener {
    pub fn new(
        reconciler: Arc<dyn GroupReconciliationService>,
        registry: Arc<TemplateRegistry>,
        tenants: Arc<dyn TenantDirectory>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            reconciler,
            registry,
            tenants,
            event_bus,
            shutdown: Notify::new(),
        }
    }

    /// Startup pass: reconcile every tenant currently in the directory
    pub async fn bootstrap(&self) -> anyhow::Result<ReconciliationSummary> {
        let tenants = self
            .tenants
            .list_tenants()
            .await
            .context("Failed to list tenants for the startup reconciliation")?;

        info!(
            "Reconciling {} templates across {} tenants at startup",
            self.registry.len(),
            tenants.len()
        );
        Ok(self
            .reconciler
            .reconcile_all_tenants(&tenants, self.registry.templates())
            .await)
    }

    /// Process one lifecycle event.
    ///
    /// Returns the reconciliation result, or `None` when the event requires no
    /// action or the reconciliation failed (the failure is logged).
    pub async fn handle_event(&self, event: &TenantLifecycleEvent) -> Option<TenantReconciliation> {
        let tenant = match event {
            TenantLifecycleEvent::TenantRegistered { tenant, .. } => {
                debug!(tenant_id = %tenant.id, "Tenant registered, reconciling groups");
                tenant
            }
            TenantLifecycleEvent::TenantUpdated { tenant, .. } => {
                debug!(tenant_id = %tenant.id, "Tenant updated, reconciling groups");
                tenant
            }
            TenantLifecycleEvent::TenantRemoved { tenant, .. } => {
                debug!(tenant_id = %tenant.id, "Tenant removed, leaving its groups untouched");
                return None;
            }
        };

        match self
            .reconciler
            .reconcile_tenant(tenant, self.registry.templates())
            .await
        {
            Ok(reconciliation) => Some(reconciliation),
            Err(e) => {
                error!(
                    tenant_id = %tenant.id,
                    "Unable to reconcile groups for tenant {}: {}",
                    tenant.id,
                    e
                );
                None
            }
        }
    }

    /// Start the background listener task.
    ///
    /// Lifecycle events are read from the bus's dedicated lifecycle channel;
    /// the subscription is taken before this returns, so events published
    /// afterwards are never missed. If the channel overflows, the dropped
    /// events are unknown and a full reconciliation of the directory runs
    /// instead. The task runs until the event bus closes or
    /// [`shutdown`](Self::shutdown) is called.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!("Starting tenant lifecycle listener");
        let mut receiver = self.event_bus.subscribe_lifecycle();

        tokio::spawn(async move {
            let mut events_processed = 0u64;
            let mut recoveries = 0u64;

            loop {
                let received = tokio::select! {
                    received = receiver.recv() => received,
                    _ = self.shutdown.notified() => {
                        info!("Shutdown requested for tenant lifecycle listener");
                        break;
                    }
                };

                match received {
                    Ok(event) => {
                        events_processed += 1;
                        self.handle_event(&event).await;
                    }
                    Err(EventBusError::Closed) => {
                        info!("Event bus closed, shutting down tenant lifecycle listener");
                        break;
                    }
                    Err(EventBusError::Lagged(n)) => {
                        recoveries += 1;
                        warn!(
                            "Tenant lifecycle listener lagged by {} events, reconciling all tenants",
                            n
                        );
                        if let Err(e) = self.bootstrap().await {
                            error!(error = ?e, "Full reconciliation after lag failed");
                        }
                    }
                    Err(e) => {
                        error!(error = ?e, "Unexpected error receiving lifecycle event");
                    }
                }
            }

            info!(
                "Tenant lifecycle listener stopped (processed {} events, {} lag recoveries)",
                events_processed,
                recoveries
            );
        })
    }

    /// Ask the background task to stop after the event in progress
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
