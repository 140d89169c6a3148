// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use groupsync_core::application::template_registry::parse_templates;
use groupsync_core::domain::sync_config::GroupSyncConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the resolved manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./groupsync-config.yaml)
        #[arg(short, long, default_value = "./groupsync-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples),
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = GroupSyncConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. GROUPSYNC_CONFIG_PATH: {}",
            std::env::var("GROUPSYNC_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./groupsync-config.yaml");
        println!("  4. ~/.groupsync/config.yaml");
        println!("  5. /etc/groupsync/config.yaml");
        println!();
    }

    if as_yaml {
        let rendered = serde_yaml::to_string(&config).context("Failed to render configuration")?;
        print!("{}", rendered);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Templates:".bold());
    println!("  Namespace: {}", config.spec.templates.namespace);
    println!("  Properties: {}", config.spec.templates.properties.len());
    println!();

    println!("{}", "Tenants:".bold());
    if config.spec.tenants.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for tenant in &config.spec.tenants {
        let managed = if tenant.managed { "" } else { " (read-only, skipped)" };
        println!("  {} - {}{}", tenant.id.as_str().bold(), tenant.display_name, managed.dimmed());
    }
    println!();

    println!("{}", "Reconciliation:".bold());
    println!(
        "  Max concurrent tenants: {}",
        config.spec.reconciliation.max_concurrent_tenants
    );
    println!("  Event bus capacity: {}", config.spec.reconciliation.event_bus_capacity);
    println!("  System principal: {}", config.spec.security.system_principal);
    if let Some(path) = &config.spec.directory.snapshot_path {
        println!("  Group snapshot: {}", path.display());
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = GroupSyncConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    // Invalid templates never fail startup, but are worth reporting here
    let parsed = parse_templates(
        &config.spec.templates.namespace,
        &config.spec.templates.properties,
    );
    for rejected in &parsed.rejected {
        println!(
            "{}",
            format!("⚠ Template '{}' will be ignored: {}", rejected.key, rejected.reason).yellow()
        );
    }

    println!(
        "{}",
        format!("✓ Configuration is valid ({} templates)", parsed.templates.len()).green()
    );

    Ok(())
}

fn sample(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

fn generate(output: &Path, with_examples: bool) -> Result<()> {
    std::fs::write(output, sample(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_samples_are_valid() {
        let dir = tempfile::tempdir().unwrap();

        for with_examples in [false, true] {
            let path = dir.path().join(format!("config-{}.yaml", with_examples));
            generate(&path, with_examples).unwrap();

            let config = GroupSyncConfigManifest::from_yaml_file(&path).unwrap();
            config.validate().unwrap();

            let parsed = parse_templates(
                &config.spec.templates.namespace,
                &config.spec.templates.properties,
            );
            assert!(parsed.rejected.is_empty());
            assert!(!parsed.templates.is_empty());
        }
    }
}
