// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Template inspection

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use groupsync_core::application::template_registry::TemplateRegistry;
use groupsync_core::domain::sync_config::GroupSyncConfigManifest;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = GroupSyncConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    let registry = TemplateRegistry::from_config(&config.spec.templates);

    println!(
        "{} {}",
        "Group templates under".bold(),
        registry.namespace().bold()
    );
    println!();

    if registry.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for template in registry.templates() {
        println!("  {}", template.key.bold());
        println!("    id:          {}", template.id_pattern);
        println!("    name:        {}", template.name_pattern);
        println!("    description: {}", template.description_pattern);
        println!(
            "    roles:       {}",
            template.roles.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    if !registry.rejected().is_empty() {
        println!();
        println!("{}", "Rejected templates:".red().bold());
        for rejected in registry.rejected() {
            println!("  {} - {}", rejected.key.red(), rejected.reason);
        }
    }

    Ok(())
}
