// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the tenant lifecycle listener running against the
//! event bus: registered and updated tenants are reconciled, removed tenants
//! leave the group directory untouched.

use async_trait::async_trait;
use groupsync_core::application::reconciler::StandardGroupReconciler;
use groupsync_core::application::template_registry::TemplateRegistry;
use groupsync_core::application::tenant_lifecycle::TenantLifecycleListener;
use groupsync_core::domain::directory::{DirectoryError, GroupDirectory};
use groupsync_core::domain::events::ReconciliationEvent;
use groupsync_core::domain::group::{GroupId, GroupUpdate, StoredGroup};
use groupsync_core::domain::security_context::TenantScope;
use groupsync_core::domain::tenant::{Tenant, TenantId};
use groupsync_core::infrastructure::event_bus::EventBus;
use groupsync_core::infrastructure::group_directory::InMemoryGroupDirectory;
use groupsync_core::infrastructure::security_context::SystemSecurityContextSwitcher;
use groupsync_core::infrastructure::tenant_directory::InMemoryTenantDirectory;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Group directory that records every write it receives
#[derive(Default)]
struct RecordingGroupDirectory {
    inner: InMemoryGroupDirectory,
    writes: Mutex<Vec<(TenantId, GroupId)>>,
}

impl RecordingGroupDirectory {
    fn writes_for(&self, tenant: &str) -> usize {
        self.writes
            .lock()
            .iter()
            .filter(|(tenant_id, _)| tenant_id.as_str() == tenant)
            .count()
    }
}

#[async_trait]
impl GroupDirectory for RecordingGroupDirectory {
    async fn load_group(
        &self,
        scope: &TenantScope,
        group_id: &GroupId,
        tenant_id: &TenantId,
    ) -> Result<Option<StoredGroup>, DirectoryError> {
        self.inner.load_group(scope, group_id, tenant_id).await
    }

    async fn create_group(&self, scope: &TenantScope, group: StoredGroup) -> Result<(), DirectoryError> {
        self.writes
            .lock()
            .push((group.tenant_id.clone(), group.group_id.clone()));
        self.inner.create_group(scope, group).await
    }

    async fn update_group(&self, scope: &TenantScope, update: GroupUpdate) -> Result<(), DirectoryError> {
        self.writes
            .lock()
            .push((update.tenant_id.clone(), update.group_id.clone()));
        self.inner.update_group(scope, update).await
    }
}

struct Harness {
    bus: Arc<EventBus>,
    tenants: Arc<InMemoryTenantDirectory>,
    groups: Arc<RecordingGroupDirectory>,
    listener: Arc<TenantLifecycleListener>,
}

fn template_properties(keys: &[&str]) -> Vec<(String, String)> {
    keys.iter()
        .flat_map(|key| {
            let upper = key.to_uppercase();
            let title = format!("{}{}", key[..1].to_uppercase(), &key[1..]);
            [
                (format!("media.groups.{key}.id_tmpl"), format!("{upper}_%s")),
                (format!("media.groups.{key}.name_tmpl"), format!("{title} Team (%s)")),
                (format!("media.groups.{key}.description_tmpl"), format!("{title} team for %s")),
                (format!("media.groups.{key}.roles"), format!("ROLE_{upper}")),
            ]
        })
        .collect()
}

fn harness(seed: Vec<Tenant>) -> Harness {
    harness_with(seed, 64, &["news"])
}

fn harness_with(seed: Vec<Tenant>, capacity: usize, templates: &[&str]) -> Harness {
    let bus = Arc::new(EventBus::new(capacity));
    let tenants = Arc::new(InMemoryTenantDirectory::with_tenants(seed).with_event_bus(bus.clone()));
    let groups = Arc::new(RecordingGroupDirectory::default());

    let registry = Arc::new(TemplateRegistry::load("media.groups", template_properties(templates)));
    let reconciler = StandardGroupReconciler::new(
        groups.clone(),
        tenants.clone(),
        Arc::new(SystemSecurityContextSwitcher::new("system")),
    )
    .with_event_bus(bus.clone());

    let listener = Arc::new(TenantLifecycleListener::new(
        Arc::new(reconciler),
        registry,
        tenants.clone(),
        bus.clone(),
    ));

    Harness {
        bus,
        tenants,
        groups,
        listener,
    }
}

/// Wait until every tenant holds `per_tenant` groups; false on timeout
async fn wait_for_groups(groups: &RecordingGroupDirectory, tenants: &[String], per_tenant: usize) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let done = tenants
            .iter()
            .all(|t| groups.inner.list_by_tenant(&TenantId::new(t.as_str())).len() == per_tenant);
        if done {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_registered_tenant_is_reconciled_by_background_listener() {
    let h = harness(vec![]);
    let handle = h.listener.clone().start();

    let mut receiver = h.bus.subscribe_tenant(TenantId::new("acme"));
    h.tenants
        .register_tenant(Tenant::new("acme", "Acme Corp"))
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        event,
        ReconciliationEvent::GroupCreated { ref group_id, .. } if group_id.as_str() == "NEWS_ACME"
    ));

    let stored = h
        .groups
        .inner
        .get(&TenantId::new("acme"), &GroupId::new("NEWS_ACME"))
        .unwrap();
    assert_eq!(stored.name, "News Team (Acme Corp)");

    h.listener.shutdown();
    tokio_test::assert_ok!(handle.await);
}

#[tokio::test]
async fn test_updated_tenant_refreshes_group_and_keeps_members() {
    let acme = Tenant::new("acme", "Acme Corp");
    let h = harness(vec![acme.clone()]);
    h.listener.bootstrap().await.unwrap();
    h.groups
        .inner
        .add_members(&acme.id, &GroupId::new("NEWS_ACME"), ["alice", "bob"])
        .unwrap();

    let handle = h.listener.clone().start();
    let mut receiver = h.bus.subscribe_tenant(acme.id.clone());
    h.tenants
        .update_tenant(Tenant::new("acme", "Acme Worldwide"))
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, ReconciliationEvent::GroupUpdated { .. }));

    let stored = h.groups.inner.get(&acme.id, &GroupId::new("NEWS_ACME")).unwrap();
    assert_eq!(stored.name, "News Team (Acme Worldwide)");
    assert_eq!(stored.members.len(), 2);

    h.listener.shutdown();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_removed_tenant_causes_no_directory_writes() {
    let acme = Tenant::new("acme", "Acme Corp");
    let h = harness(vec![acme.clone()]);
    h.listener.bootstrap().await.unwrap();
    let writes_before = h.groups.writes_for("acme");

    let handle = h.listener.clone().start();
    h.tenants.remove_tenant(&acme.id).unwrap();

    // Events are handled in order: once globex is reconciled, the removal has been processed
    let mut marker = h.bus.subscribe_tenant(TenantId::new("globex"));
    h.tenants
        .register_tenant(Tenant::new("globex", "Globex"))
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), marker.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(h.groups.writes_for("acme"), writes_before);
    assert!(h
        .groups
        .inner
        .get(&acme.id, &GroupId::new("NEWS_ACME"))
        .is_some());

    h.listener.shutdown();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_burst_of_registrations_all_get_groups() {
    // Reconciliation output (6 x 3 events) far exceeds the channel capacity
    let h = harness_with(vec![], 8, &["news", "sports", "weather"]);
    let handle = h.listener.clone().start();

    let ids: Vec<String> = (0..6).map(|i| format!("t{}", i)).collect();
    for id in &ids {
        h.tenants
            .register_tenant(Tenant::new(id.as_str(), id.to_uppercase()))
            .unwrap();
    }

    assert!(wait_for_groups(&h.groups, &ids, 3).await);

    h.listener.shutdown();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_overflow_triggers_full_reconciliation() {
    let h = harness_with(vec![], 2, &["news"]);
    let handle = h.listener.clone().start();

    // Published before the listener task gets to run, so its lifecycle channel overflows
    let ids: Vec<String> = (0..10).map(|i| format!("t{}", i)).collect();
    for id in &ids {
        h.tenants
            .register_tenant(Tenant::new(id.as_str(), id.to_uppercase()))
            .unwrap();
    }

    assert!(wait_for_groups(&h.groups, &ids, 1).await);

    h.listener.shutdown();
    handle.await.unwrap();
}
