// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod reconciler;
pub mod template_registry;
pub mod tenant_lifecycle;

pub use reconciler::{
    GroupOutcome, GroupReconciliationService, ReconcileError, ReconciliationSummary,
    StandardGroupReconciler, TenantReconciliation,
};
pub use template_registry::TemplateRegistry;
pub use tenant_lifecycle::TenantLifecycleListener;
