// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer
//!
//! Tenants, group templates, rendered and stored groups, plus the collaborator
//! contracts (tenant directory, group directory, security context) the
//! reconciler depends on.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer

pub mod tenant;
pub mod group;
pub mod template;
pub mod directory;
pub mod security_context;
pub mod events;
pub mod sync_config;
