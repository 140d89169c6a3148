// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Group Reconciler Application Service
//!
//! Renders every group template for a tenant and upserts the result into the
//! group directory, under the tenant's security scope:
//!
//! - absent group: created with the rendered fields and no members
//! - existing group: name, description and roles overwritten, members re-submitted unchanged
//!
//! Failures are recovered per (template, tenant) pair. A directory error is
//! logged and recorded as [`GroupOutcome::Failed`]; the next template still
//! runs. Tenant-level errors (lookup, impersonation) are returned to the
//! caller, and the bulk pass logs them without stopping other tenants.

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::domain::directory::{DirectoryError, GroupDirectory};
use crate::domain::events::ReconciliationEvent;
use crate::domain::group::{GroupId, GroupUpdate, RenderedGroup, StoredGroup};
use crate::domain::security_context::{run_as, SecurityContextError, SecurityContextSwitcher, TenantScope};
use crate::domain::template::GroupTemplate;
use crate::domain::tenant::{Tenant, TenantDirectory, TenantId};
use crate::infrastructure::event_bus::EventBus;

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    Created,
    Updated,
    Failed(DirectoryError),
}

/// Result of reconciling one template against one tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOutcome {
    pub template: String,
    pub group_id: GroupId,
    pub outcome: GroupOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantReconciliation {
    Reconciled {
        tenant_id: TenantId,
        outcomes: Vec<TemplateOutcome>,
    },
    /// Tenant cannot hold persisted groups
    Skipped { tenant_id: TenantId, reason: String },
}

impl TenantReconciliation {
    pub fn tenant_id(&self) -> &TenantId {
        match self {
            Self::Reconciled { tenant_id, .. } | Self::Skipped { tenant_id, .. } => tenant_id,
        }
    }

    pub fn outcomes(&self) -> &[TemplateOutcome] {
        match self {
            Self::Reconciled { outcomes, .. } => outcomes,
            Self::Skipped { .. } => &[],
        }
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Created))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Updated))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&GroupOutcome) -> bool) -> usize {
        self.outcomes().iter().filter(|o| pred(&o.outcome)).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantFailure {
    pub tenant_id: TenantId,
    pub error: String,
}

/// Aggregate of a full reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationSummary {
    pub tenants_reconciled: usize,
    pub tenants_skipped: usize,
    pub tenant_failures: Vec<TenantFailure>,
    pub groups_created: usize,
    pub groups_updated: usize,
    pub group_failures: usize,
}

impl ReconciliationSummary {
    fn absorb(&mut self, reconciliation: &TenantReconciliation) {
        match reconciliation {
            TenantReconciliation::Reconciled { .. } => self.tenants_reconciled += 1,
            TenantReconciliation::Skipped { .. } => self.tenants_skipped += 1,
        }
        self.groups_created += reconciliation.created();
        self.groups_updated += reconciliation.updated();
        self.group_failures += reconciliation.failed();
    }

    /// True when every tenant and every group reconciled cleanly
    pub fn is_clean(&self) -> bool {
        self.tenant_failures.is_empty() && self.group_failures == 0
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("tenant '{0}' no longer exists in the tenant directory")]
    TenantNotFound(TenantId),

    #[error("unable to look up tenant '{tenant_id}': {source}")]
    TenantLookup {
        tenant_id: TenantId,
        #[source]
        source: DirectoryError,
    },

    #[error(transparent)]
    SecurityContext(#[from] SecurityContextError),
}

// ============================================================================
// Per-tenant serialization
// ============================================================================

/// One async mutex per tenant id; reconciliations of the same tenant never interleave
#[derive(Default)]
pub struct TenantLocks {
    locks: DashMap<TenantId, Arc<Mutex<()>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, tenant_id: &TenantId) -> Arc<Mutex<()>> {
        self.locks
            .entry(tenant_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the tenant's mutex once no caller holds or awaits it.
    ///
    /// Callers must drop their own `Arc` from [`lock_for`](Self::lock_for) first.
    pub fn release(&self, tenant_id: &TenantId) {
        self.locks
            .remove_if(tenant_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

// ============================================================================
// Service Trait
// ============================================================================

#[async_trait]
pub trait GroupReconciliationService: Send + Sync {
    /// Reconcile every template against one tenant
    async fn reconcile_tenant(
        &self,
        tenant: &Tenant,
        templates: &[GroupTemplate],
    ) -> Result<TenantReconciliation, ReconcileError>;

    /// Reconcile every template against each of `tenants`, isolating tenant failures
    async fn reconcile_all_tenants(
        &self,
        tenants: &[Tenant],
        templates: &[GroupTemplate],
    ) -> ReconciliationSummary;

    /// Enumerate the tenant directory and reconcile all of its tenants
    async fn reconcile_directory(&self, templates: &[GroupTemplate]) -> anyhow::Result<ReconciliationSummary>;
}

// ============================================================================
// Standard Implementation
// ============================================================================

pub struct StandardGroupReconciler {
    groups: Arc<dyn GroupDirectory>,
    tenants: Arc<dyn TenantDirectory>,
    security: Arc<dyn SecurityContextSwitcher>,
    event_bus: Option<Arc<EventBus>>,
    locks: TenantLocks,
    max_concurrent_tenants: usize,
}

impl StandardGroupReconciler {
    pub fn new(
        groups: Arc<dyn GroupDirectory>,
        tenants: Arc<dyn TenantDirectory>,
        security: Arc<dyn SecurityContextSwitcher>,
    ) -> Self {
        Self {
            groups,
            tenants,
            security,
            event_bus: None,
            locks: TenantLocks::new(),
            max_concurrent_tenants: 1,
        }
    }

    /// Publish a `ReconciliationEvent` for every group outcome
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_max_concurrent_tenants(mut self, max: usize) -> Self {
        self.max_concurrent_tenants = max.max(1);
        self
    }

    async fn reconcile_group(
        &self,
        scope: &TenantScope,
        template: &GroupTemplate,
        tenant: &Tenant,
    ) -> TemplateOutcome {
        let rendered = template.render(tenant);
        let group_id = rendered.group_id.clone();

        let outcome = match self.upsert(scope, rendered).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    group_id = %group_id,
                    tenant_id = %tenant.id,
                    template = %template.key,
                    error_kind = e.kind(),
                    "Unable to reconcile group {} for tenant {}: {}",
                    group_id,
                    tenant.id,
                    e
                );
                GroupOutcome::Failed(e)
            }
        };

        self.record(&template.key, &group_id, &tenant.id, &outcome);

        TemplateOutcome {
            template: template.key.clone(),
            group_id,
            outcome,
        }
    }

    async fn upsert(&self, scope: &TenantScope, rendered: RenderedGroup) -> Result<GroupOutcome, DirectoryError> {
        let existing = self
            .groups
            .load_group(scope, &rendered.group_id, &rendered.tenant_id)
            .await?;

        match existing {
            None => {
                info!("Creating group {} for tenant {}", rendered.group_id, rendered.tenant_id);
                self.groups
                    .create_group(scope, StoredGroup::from_rendered(rendered))
                    .await?;
                Ok(GroupOutcome::Created)
            }
            Some(existing) => {
                info!("Updating group {} for tenant {}", rendered.group_id, rendered.tenant_id);
                let update = GroupUpdate::preserving_members(&rendered, &existing);
                self.groups.update_group(scope, update).await?;
                Ok(GroupOutcome::Updated)
            }
        }
    }

    /// Body of `reconcile_tenant`, run while holding the tenant's lock
    async fn reconcile_locked(
        &self,
        tenant: &Tenant,
        templates: &[GroupTemplate],
    ) -> Result<TenantReconciliation, ReconcileError> {
        debug!(tenant_id = %tenant.id, templates = templates.len(), "Reconciling tenant groups");

        let tenant_id = tenant.id.clone();
        run_as(self.security.as_ref(), tenant, |scope| async move {
            // Re-resolve so the latest display name is rendered
            let current = match self.tenants.get_tenant(&tenant_id).await {
                Ok(current) => current,
                Err(DirectoryError::NotFound(_)) => {
                    return Err(ReconcileError::TenantNotFound(tenant_id));
                }
                Err(source) => return Err(ReconcileError::TenantLookup { tenant_id, source }),
            };

            if !current.managed {
                info!(
                    "Ignoring tenant {} because it is not backed by a writable directory",
                    tenant_id
                );
                return Ok(TenantReconciliation::Skipped {
                    tenant_id,
                    reason: "tenant is served by a read-only provider".to_string(),
                });
            }

            let mut outcomes = Vec::with_capacity(templates.len());
            for template in templates {
                outcomes.push(self.reconcile_group(&scope, template, &current).await);
            }

            Ok(TenantReconciliation::Reconciled { tenant_id, outcomes })
        })
        .await?
    }

    fn record(&self, template: &str, group_id: &GroupId, tenant_id: &TenantId, outcome: &GroupOutcome) {
        let event = match outcome {
            GroupOutcome::Created => {
                metrics::counter!("groupsync_groups_created_total", "template" => template.to_string())
                    .increment(1);
                ReconciliationEvent::GroupCreated {
                    group_id: group_id.clone(),
                    tenant_id: tenant_id.clone(),
                    template: template.to_string(),
                    reconciled_at: Utc::now(),
                }
            }
            GroupOutcome::Updated => {
                metrics::counter!("groupsync_groups_updated_total", "template" => template.to_string())
                    .increment(1);
                ReconciliationEvent::GroupUpdated {
                    group_id: group_id.clone(),
                    tenant_id: tenant_id.clone(),
                    template: template.to_string(),
                    reconciled_at: Utc::now(),
                }
            }
            GroupOutcome::Failed(e) => {
                metrics::counter!("groupsync_group_failures_total", "kind" => e.kind())
                    .increment(1);
                ReconciliationEvent::GroupReconciliationFailed {
                    group_id: group_id.clone(),
                    tenant_id: tenant_id.clone(),
                    template: template.to_string(),
                    reason: e.to_string(),
                    failed_at: Utc::now(),
                }
            }
        };

        if let Some(bus) = &self.event_bus {
            bus.publish_reconciliation_event(event);
        }
    }
}

#[async_trait]
impl GroupReconciliationService for StandardGroupReconciler {
    async fn reconcile_tenant(
        &self,
        tenant: &Tenant,
        templates: &[GroupTemplate],
    ) -> Result<TenantReconciliation, ReconcileError> {
        let lock = self.locks.lock_for(&tenant.id);
        let result = {
            let _guard = lock.lock().await;
            self.reconcile_locked(tenant, templates).await
        };
        drop(lock);
        self.locks.release(&tenant.id);
        result
    }

    async fn reconcile_all_tenants(
        &self,
        tenants: &[Tenant],
        templates: &[GroupTemplate],
    ) -> ReconciliationSummary {
        // Built eagerly; a stream closure over `&Tenant` is not Send
        let pending: Vec<_> = tenants
            .iter()
            .map(|tenant| {
                let tenant_id = tenant.id.clone();
                let reconciliation = self.reconcile_tenant(tenant, templates);
                async move { (tenant_id, reconciliation.await) }.boxed()
            })
            .collect();

        let results: Vec<(TenantId, Result<TenantReconciliation, ReconcileError>)> =
            futures::stream::iter(pending)
                .buffer_unordered(self.max_concurrent_tenants)
                .collect()
                .await;

        let mut summary = ReconciliationSummary::default();
        for (tenant_id, result) in results {
            match result {
                Ok(reconciliation) => summary.absorb(&reconciliation),
                Err(e) => {
                    error!(tenant_id = %tenant_id, "Unable to reconcile groups for tenant {}: {}", tenant_id, e);
                    summary.tenant_failures.push(TenantFailure {
                        tenant_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        summary.tenant_failures.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));

        info!(
            "Reconciled {} tenants ({} skipped, {} failed): {} groups created, {} updated, {} failed",
            summary.tenants_reconciled,
            summary.tenants_skipped,
            summary.tenant_failures.len(),
            summary.groups_created,
            summary.groups_updated,
            summary.group_failures
        );

        summary
    }

    async fn reconcile_directory(&self, templates: &[GroupTemplate]) -> anyhow::Result<ReconciliationSummary> {
        let tenants = self
            .tenants
            .list_tenants()
            .await
            .context("Failed to list tenants")?;

        info!("Ensuring groups exist for {} tenants", tenants.len());
        Ok(self.reconcile_all_tenants(&tenants, templates).await)
    }
}
