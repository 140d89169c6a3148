// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! One-shot reconciliation
//!
//! Reconciles the whole tenant directory, or a single tenant with `--tenant`,
//! prints the outcome and saves the group snapshot.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use groupsync_core::application::reconciler::{
    GroupOutcome, GroupReconciliationService, ReconciliationSummary, TenantReconciliation,
};
use groupsync_core::domain::tenant::{TenantDirectory, TenantId};

use crate::embedded::EmbeddedServices;

pub async fn execute(config_path: Option<PathBuf>, tenant: Option<String>) -> Result<()> {
    let services = EmbeddedServices::load(config_path)?;

    if services.registry.is_empty() {
        println!("{}", "⚠ No valid group templates configured, nothing to do".yellow());
        return Ok(());
    }

    match tenant {
        Some(tenant_id) => reconcile_one(&services, TenantId::new(tenant_id)).await?,
        None => {
            let summary = services
                .reconciler
                .reconcile_directory(services.registry.templates())
                .await?;
            print_summary(&summary);
        }
    }

    services.persist()
}

async fn reconcile_one(services: &EmbeddedServices, tenant_id: TenantId) -> Result<()> {
    let tenant = services
        .tenants
        .get_tenant(&tenant_id)
        .await
        .with_context(|| format!("Unknown tenant '{}'", tenant_id))?;

    let reconciliation = services
        .reconciler
        .reconcile_tenant(&tenant, services.registry.templates())
        .await
        .with_context(|| format!("Failed to reconcile tenant '{}'", tenant_id))?;

    print_tenant(&reconciliation);
    Ok(())
}

fn print_tenant(reconciliation: &TenantReconciliation) {
    match reconciliation {
        TenantReconciliation::Skipped { tenant_id, reason } => {
            println!("{} {} ({})", "Skipped".yellow(), tenant_id, reason);
        }
        TenantReconciliation::Reconciled { tenant_id, outcomes } => {
            println!("{}", format!("Tenant {}", tenant_id).bold());
            for outcome in outcomes {
                let status = match &outcome.outcome {
                    GroupOutcome::Created => "created".green(),
                    GroupOutcome::Updated => "updated".cyan(),
                    GroupOutcome::Failed(e) => format!("failed: {}", e).red(),
                };
                println!("  {} [{}] {}", outcome.group_id, outcome.template, status);
            }
        }
    }
}

fn print_summary(summary: &ReconciliationSummary) {
    println!("{}", "Reconciliation summary:".bold());
    println!("  Tenants reconciled: {}", summary.tenants_reconciled);
    println!("  Tenants skipped:    {}", summary.tenants_skipped);
    println!("  Groups created:     {}", summary.groups_created);
    println!("  Groups updated:     {}", summary.groups_updated);

    if summary.is_clean() {
        println!("{}", "✓ All groups reconciled".green());
        return;
    }

    if summary.group_failures > 0 {
        println!(
            "{}",
            format!("✗ {} group(s) failed, see log for details", summary.group_failures).red()
        );
    }
    for failure in &summary.tenant_failures {
        println!("{} {}: {}", "✗ Tenant".red(), failure.tenant_id, failure.error);
    }
}
