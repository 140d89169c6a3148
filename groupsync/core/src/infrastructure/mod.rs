// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod group_directory;
pub mod security_context;
pub mod tenant_directory;
