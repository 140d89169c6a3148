// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// groupsync Configuration Types
//
// Defines the configuration schema for a groupsync node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Flat template properties (<namespace>.<groupKey>.<field>)
// - Seed tenants for the in-process tenant directory
// - Reconciliation, security, directory and observability settings

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::domain::tenant::{Tenant, TenantId};

pub const API_VERSION: &str = "groupsync/v1";
pub const KIND: &str = "GroupSyncConfig";
pub const DEFAULT_TEMPLATE_NAMESPACE: &str = "groupsync.groups";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSyncConfigManifest {
    /// API version (must be "groupsync/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "GroupSyncConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: GroupSyncSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupSyncSpec {
    /// Group template properties
    #[serde(default)]
    pub templates: TemplateSourceConfig,

    /// Tenants served by the in-process tenant directory
    #[serde(default)]
    pub tenants: Vec<Tenant>,

    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSourceConfig {
    /// Key prefix shared by all template properties
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Flat key/value properties, e.g. `groupsync.groups.news.id_tmpl: "NEWS_%s"`
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Default for TemplateSourceConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            properties: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Upper bound on tenants reconciled concurrently during a full pass
    #[serde(default = "default_max_concurrent_tenants")]
    pub max_concurrent_tenants: usize,

    /// Buffered events before slow subscribers start lagging
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tenants: default_max_concurrent_tenants(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Name of the system account impersonated per tenant
    #[serde(default = "default_system_principal")]
    pub system_principal: String,

    /// Roles granted to the system account inside the tenant scope
    #[serde(default = "default_system_roles")]
    pub roles: Vec<String>,

    /// Tenants the system account may not impersonate
    #[serde(default)]
    pub denied_tenants: Vec<TenantId>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            system_principal: default_system_principal(),
            roles: default_system_roles(),
            denied_tenants: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// YAML snapshot the in-memory group directory is loaded from and saved to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prometheus exporter port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_namespace() -> String {
    DEFAULT_TEMPLATE_NAMESPACE.to_string()
}

fn default_max_concurrent_tenants() -> usize {
    4
}

fn default_event_bus_capacity() -> usize {
    1000
}

fn default_system_principal() -> String {
    "system".to_string()
}

fn default_system_roles() -> Vec<String> {
    vec!["ROLE_ADMIN".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9464
}

impl Default for GroupSyncConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "groupsync".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: GroupSyncSpec::default(),
        }
    }
}

impl GroupSyncConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. GROUPSYNC_CONFIG_PATH environment variable
    /// 2. ./groupsync-config.yaml (working directory)
    /// 3. ~/.groupsync/config.yaml (user home)
    /// 4. /etc/groupsync/config.yaml (system, Unix) or C:\ProgramData\groupsync\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("GROUPSYNC_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./groupsync-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".groupsync").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/groupsync/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\groupsync\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails hard when missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using empty defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GROUPSYNC_TEMPLATE_NAMESPACE") {
            let val = val.trim();
            if val.is_empty() {
                tracing::warn!("Ignoring empty GROUPSYNC_TEMPLATE_NAMESPACE");
            } else {
                tracing::info!("Environment override: GROUPSYNC_TEMPLATE_NAMESPACE={}", val);
                self.spec.templates.namespace = val.to_string();
            }
        }

        if let Ok(val) = std::env::var("GROUPSYNC_MAX_CONCURRENT_TENANTS") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => {
                    tracing::info!("Environment override: GROUPSYNC_MAX_CONCURRENT_TENANTS={}", n);
                    self.spec.reconciliation.max_concurrent_tenants = n;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for GROUPSYNC_MAX_CONCURRENT_TENANTS: '{}'. Expected a positive integer. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let namespace = &self.spec.templates.namespace;
        if namespace.trim().is_empty() {
            anyhow::bail!("spec.templates.namespace cannot be empty");
        }
        if namespace.starts_with('.') || namespace.ends_with('.') {
            anyhow::bail!(
                "spec.templates.namespace '{}' must not start or end with '.'",
                namespace
            );
        }

        if self.spec.reconciliation.max_concurrent_tenants == 0 {
            anyhow::bail!("spec.reconciliation.max_concurrent_tenants must be at least 1");
        }

        if self.spec.reconciliation.event_bus_capacity == 0 {
            anyhow::bail!("spec.reconciliation.event_bus_capacity must be at least 1");
        }

        if self.spec.security.system_principal.trim().is_empty() {
            anyhow::bail!("spec.security.system_principal cannot be empty");
        }

        let mut seen = HashSet::new();
        for tenant in &self.spec.tenants {
            if tenant.id.as_str().trim().is_empty() {
                anyhow::bail!("Tenant id cannot be empty");
            }
            if !seen.insert(&tenant.id) {
                anyhow::bail!("Duplicate tenant id: {}", tenant.id);
            }
        }

        Ok(())
    }
}
