// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # groupsync CLI
//!
//! The `groupsync` binary keeps per-tenant groups in line with the configured
//! group templates.
//!
//! ## Commands
//!
//! - `groupsync reconcile [--tenant ID]` - One-shot reconciliation pass
//! - `groupsync run [--reload-interval SECS]` - Startup pass, then follow tenant lifecycle events until Ctrl-C
//! - `groupsync templates` - Show parsed templates and rejected configuration
//! - `groupsync config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use groupsync::commands::{self, ConfigCommand};
use groupsync_core::domain::sync_config::GroupSyncConfigManifest;

/// groupsync - Declarative multi-tenant group reconciliation
#[derive(Parser)]
#[command(name = "groupsync")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "GROUPSYNC_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "GROUPSYNC_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile group templates against tenants once
    #[command(name = "reconcile")]
    Reconcile {
        /// Reconcile a single tenant instead of the whole directory
        #[arg(long, value_name = "TENANT_ID")]
        tenant: Option<String>,
    },

    /// Reconcile all tenants, then follow tenant lifecycle events
    #[command(name = "run")]
    Run {
        /// Re-read tenants from the configuration file every SECS seconds
        #[arg(long, value_name = "SECS")]
        reload_interval: Option<u64>,
    },

    /// Show parsed group templates
    #[command(name = "templates")]
    Templates,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (level, format) = logging_settings(cli.config.clone(), cli.log_level.as_deref());
    init_logging(&level, &format)?;

    match cli.command {
        Some(Commands::Reconcile { tenant }) => {
            commands::reconcile::execute(cli.config, tenant).await
        }
        Some(Commands::Run { reload_interval }) => {
            commands::run::execute(cli.config, reload_interval).await
        }
        Some(Commands::Templates) => commands::templates::execute(cli.config).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Level and format for the subscriber: the flag wins, then the config file
fn logging_settings(config_path: Option<PathBuf>, level_flag: Option<&str>) -> (String, String) {
    let configured = GroupSyncConfigManifest::load_or_default(config_path)
        .ok()
        .and_then(|c| c.spec.observability)
        .and_then(|o| o.logging);

    let level = level_flag
        .map(str::to_string)
        .or_else(|| configured.as_ref().map(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let format = configured
        .map(|l| l.format)
        .unwrap_or_else(|| "text".to_string());

    (level, format)
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
