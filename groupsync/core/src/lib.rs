// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! groupsync core
//!
//! Declarative, multi-tenant group reconciliation: configured group templates
//! are rendered per tenant and upserted into a group directory.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, reconciliation services and reference adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
