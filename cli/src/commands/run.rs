// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Long-running mode
//!
//! Installs the Prometheus exporter when enabled, reconciles every tenant
//! once, then follows tenant lifecycle events until Ctrl-C. With
//! `--reload-interval` the tenant list is re-read from the configuration file
//! and changes are published as lifecycle events. The group snapshot is saved
//! on shutdown.

use anyhow::{Context, Result};
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use groupsync_core::domain::events::ReconciliationEvent;
use groupsync_core::domain::sync_config::GroupSyncConfigManifest;
use groupsync_core::infrastructure::event_bus::{DomainEvent, EventBusError};

use crate::embedded::EmbeddedServices;

pub async fn execute(config_path: Option<PathBuf>, reload_interval: Option<u64>) -> Result<()> {
    let services = EmbeddedServices::load(config_path.clone())?;

    install_metrics_exporter(&services)?;

    let listener = services.listener();
    let summary = listener.bootstrap().await?;
    println!(
        "{}",
        format!(
            "✓ Startup reconciliation: {} tenants, {} created, {} updated, {} failed",
            summary.tenants_reconciled,
            summary.groups_created,
            summary.groups_updated,
            summary.group_failures + summary.tenant_failures.len()
        )
        .green()
    );
    services.persist()?;

    let mut events = services.event_bus.subscribe();
    let mut reload = reload_interval.map(|secs| tokio::time::interval(Duration::from_secs(secs.max(1))));
    let handle = listener.clone().start();

    println!("{}", "Following tenant lifecycle events (Ctrl-C to stop)".dimmed());

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
            _ = next_tick(reload.as_mut()) => reload_tenants(&services, config_path.clone()),
            received = events.recv() => match received {
                Ok(DomainEvent::Reconciliation(event)) => print_event(&event),
                Ok(DomainEvent::TenantLifecycle(_)) => {}
                Err(EventBusError::Lagged(n)) => warn!("Skipped {} events while printing", n),
                Err(_) => break,
            }
        }
    }

    info!("Shutting down");
    listener.shutdown();
    handle.await.context("Lifecycle listener task failed")?;

    services.persist()
}

async fn next_tick(interval: Option<&mut tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Re-read the tenant list and publish the differences
fn reload_tenants(services: &EmbeddedServices, config_path: Option<PathBuf>) {
    let config = match GroupSyncConfigManifest::load_or_default(config_path)
        .and_then(|c| c.validate().map(|_| c))
    {
        Ok(config) => config,
        Err(e) => {
            warn!("Keeping current tenants, configuration reload failed: {:#}", e);
            return;
        }
    };

    match services.tenants.sync(config.spec.tenants) {
        Ok(report) if !report.is_empty() => info!(
            "Tenant list reloaded: {} registered, {} updated, {} removed",
            report.registered, report.updated, report.removed
        ),
        Ok(_) => {}
        Err(e) => warn!("Tenant list reload failed: {}", e),
    }
}

fn install_metrics_exporter(services: &EmbeddedServices) -> Result<()> {
    let metrics = services
        .config
        .spec
        .observability
        .as_ref()
        .and_then(|o| o.metrics.as_ref());

    let Some(metrics) = metrics.filter(|m| m.enabled) else {
        return Ok(());
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], metrics.port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Prometheus metrics available on {}", addr);
    Ok(())
}

fn print_event(event: &ReconciliationEvent) {
    match event {
        ReconciliationEvent::GroupCreated { group_id, tenant_id, .. } => {
            println!("{} {} ({})", "created".green(), group_id, tenant_id);
        }
        ReconciliationEvent::GroupUpdated { group_id, tenant_id, .. } => {
            println!("{} {} ({})", "updated".cyan(), group_id, tenant_id);
        }
        ReconciliationEvent::GroupReconciliationFailed {
            group_id,
            tenant_id,
            reason,
            ..
        } => {
            println!("{} {} ({}) - {}", "failed".red(), group_id, tenant_id, reason);
        }
    }
}
