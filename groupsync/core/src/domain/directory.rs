// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Group Directory Interface
//!
//! Persistence contract for tenant groups. The trait lives in the domain layer
//! and is implemented in `crate::infrastructure::group_directory`.
//!
//! | Operation | Contract |
//! |-----------|----------|
//! | `load_group` | `Some(group)` or `None` when absent |
//! | `create_group` | persists a new group; fails if it already exists |
//! | `update_group` | total overwrite of name, description, roles and members |
//!
//! Every call carries the [`TenantScope`] obtained from the security context
//! switcher. A scope issued for another tenant must be refused with
//! [`DirectoryError::Unauthorized`].

use async_trait::async_trait;

use crate::domain::group::{GroupId, GroupUpdate, StoredGroup};
use crate::domain::security_context::TenantScope;
use crate::domain::tenant::TenantId;

#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Load a group by (group id, tenant id)
    async fn load_group(
        &self,
        scope: &TenantScope,
        group_id: &GroupId,
        tenant_id: &TenantId,
    ) -> Result<Option<StoredGroup>, DirectoryError>;

    /// Create a new group
    async fn create_group(&self, scope: &TenantScope, group: StoredGroup) -> Result<(), DirectoryError>;

    /// Replace the mutable state of an existing group
    async fn update_group(&self, scope: &TenantScope, update: GroupUpdate) -> Result<(), DirectoryError>;
}

/// Directory errors, shared by the group and tenant directories
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unexpected directory error: {0}")]
    Unexpected(String),
}

impl DirectoryError {
    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            DirectoryError::NotFound(_) => "not_found",
            DirectoryError::Unauthorized(_) => "unauthorized",
            DirectoryError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<serde_yaml::Error> for DirectoryError {
    fn from(err: serde_yaml::Error) -> Self {
        DirectoryError::Unexpected(err.to_string())
    }
}

impl From<std::io::Error> for DirectoryError {
    fn from(err: std::io::Error) -> Self {
        DirectoryError::Unexpected(err.to_string())
    }
}
