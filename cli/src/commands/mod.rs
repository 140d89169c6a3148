// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for groupsync CLI

pub mod config;
pub mod reconcile;
pub mod run;
pub mod templates;

pub use self::config::ConfigCommand;
