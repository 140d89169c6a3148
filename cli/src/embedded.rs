// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Embedded service wiring
//!
//! Creates the reconciliation services in-process from a configuration
//! manifest: event bus, template registry, in-memory directories, security
//! context switcher, reconciler and lifecycle listener.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use groupsync_core::{
    application::{
        reconciler::StandardGroupReconciler, template_registry::TemplateRegistry,
        tenant_lifecycle::TenantLifecycleListener,
    },
    domain::sync_config::GroupSyncConfigManifest,
    infrastructure::{
        event_bus::EventBus, group_directory::InMemoryGroupDirectory,
        security_context::SystemSecurityContextSwitcher,
        tenant_directory::InMemoryTenantDirectory,
    },
};

pub struct EmbeddedServices {
    pub config: GroupSyncConfigManifest,
    pub event_bus: Arc<EventBus>,
    pub registry: Arc<TemplateRegistry>,
    pub groups: Arc<InMemoryGroupDirectory>,
    pub tenants: Arc<InMemoryTenantDirectory>,
    pub reconciler: Arc<StandardGroupReconciler>,
}

impl EmbeddedServices {
    /// Discover, load and validate configuration, then build the services
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = GroupSyncConfigManifest::load_or_default(config_path)
            .context("Failed to load configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: GroupSyncConfigManifest) -> Result<Self> {
        config
            .validate()
            .context("Configuration validation failed")?;

        let event_bus = Arc::new(EventBus::new(config.spec.reconciliation.event_bus_capacity));
        let registry = Arc::new(TemplateRegistry::from_config(&config.spec.templates));

        let groups = Arc::new(match &config.spec.directory.snapshot_path {
            Some(path) => InMemoryGroupDirectory::from_snapshot(path)
                .with_context(|| format!("Failed to load group snapshot {:?}", path))?,
            None => InMemoryGroupDirectory::new(),
        });
        let tenants = Arc::new(
            InMemoryTenantDirectory::with_tenants(config.spec.tenants.clone())
                .with_event_bus(event_bus.clone()),
        );
        let security = Arc::new(SystemSecurityContextSwitcher::from_config(&config.spec.security));

        let reconciler = Arc::new(
            StandardGroupReconciler::new(groups.clone(), tenants.clone(), security)
                .with_event_bus(event_bus.clone())
                .with_max_concurrent_tenants(config.spec.reconciliation.max_concurrent_tenants),
        );

        info!(
            "Services initialized: {} templates, {} tenants",
            registry.len(),
            config.spec.tenants.len()
        );

        Ok(Self {
            config,
            event_bus,
            registry,
            groups,
            tenants,
            reconciler,
        })
    }

    pub fn listener(&self) -> Arc<TenantLifecycleListener> {
        Arc::new(TenantLifecycleListener::new(
            self.reconciler.clone(),
            self.registry.clone(),
            self.tenants.clone(),
            self.event_bus.clone(),
        ))
    }

    /// Write the group directory back to the configured snapshot, if any
    pub fn persist(&self) -> Result<()> {
        if let Some(path) = &self.config.spec.directory.snapshot_path {
            self.groups
                .save_snapshot(path)
                .with_context(|| format!("Failed to write group snapshot {:?}", path))?;
            info!("Saved {} groups to {:?}", self.groups.len(), path);
        }
        Ok(())
    }
}
