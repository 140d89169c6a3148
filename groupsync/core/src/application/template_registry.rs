// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Template Registry
//!
//! Parses flat configuration properties into [`GroupTemplate`]s. Keys follow
//! `<namespace>.<groupKey>.<field>` where field is one of `id_tmpl`,
//! `name_tmpl`, `description_tmpl` or `roles`. Failures are per group key:
//! an incomplete definition is rejected and every other key still loads.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::sync_config::TemplateSourceConfig;
use crate::domain::template::{
    GroupTemplate, TemplateError, FIELD_DESCRIPTION, FIELD_ID, FIELD_NAME, FIELD_ROLES,
};

/// A group key whose definition could not be turned into a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTemplate {
    pub key: String,
    pub reason: TemplateError,
}

/// Result of parsing a property map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTemplates {
    /// Valid templates, ordered by group key
    pub templates: Vec<GroupTemplate>,
    /// Rejected group keys, ordered by group key
    pub rejected: Vec<RejectedTemplate>,
}

#[derive(Default)]
struct RawTemplate {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    roles: Option<String>,
}

/// Parse template definitions out of a flat property map.
///
/// Pure: logging of rejections is left to the caller.
pub fn parse_templates<I, K, V>(namespace: &str, properties: I) -> ParsedTemplates
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let prefix = format!("{}.", namespace.trim().trim_end_matches('.'));
    let mut raw: BTreeMap<String, RawTemplate> = BTreeMap::new();

    for (key, value) in properties {
        let key = key.as_ref();
        let Some(rest) = key.strip_prefix(&prefix) else {
            continue;
        };
        let Some((group_key, field)) = rest.rsplit_once('.') else {
            debug!(key, "Ignoring template property without a field suffix");
            continue;
        };
        if group_key.is_empty() {
            debug!(key, "Ignoring template property without a group key");
            continue;
        }

        if ![FIELD_ID, FIELD_NAME, FIELD_DESCRIPTION, FIELD_ROLES].contains(&field) {
            debug!(key, field, "Ignoring unknown template field");
            continue;
        }

        let entry = raw.entry(group_key.to_string()).or_default();
        let value = Some(value.as_ref().to_string());
        match field {
            FIELD_ID => entry.id = value,
            FIELD_NAME => entry.name = value,
            FIELD_DESCRIPTION => entry.description = value,
            _ => entry.roles = value,
        }
    }

    let mut parsed = ParsedTemplates::default();
    for (key, fields) in raw {
        let roles = fields.roles.unwrap_or_default();
        let result = GroupTemplate::new(
            key.clone(),
            fields.id.as_deref().unwrap_or_default(),
            fields.name.as_deref().unwrap_or_default(),
            fields.description.as_deref().unwrap_or_default(),
            roles.split(','),
        );
        match result {
            Ok(template) => parsed.templates.push(template),
            // An absent or blank roles value is an incomplete definition, not an empty list
            Err(TemplateError::EmptyRoles) if roles.trim().is_empty() => {
                parsed.rejected.push(RejectedTemplate {
                    key,
                    reason: TemplateError::MissingField(FIELD_ROLES),
                })
            }
            Err(reason) => parsed.rejected.push(RejectedTemplate { key, reason }),
        }
    }
    parsed
}

/// Read-only set of group templates, built once at startup
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    namespace: String,
    templates: Arc<[GroupTemplate]>,
    rejected: Arc<[RejectedTemplate]>,
}

impl TemplateRegistry {
    /// Parse `properties` and log every rejected definition
    pub fn load<I, K, V>(namespace: &str, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let parsed = parse_templates(namespace, properties);

        for rejected in &parsed.rejected {
            error!(
                template = %rejected.key,
                reason = %rejected.reason,
                "The configuration for group template '{}' is incomplete",
                rejected.key
            );
        }
        for template in parsed.templates.iter().filter(|t| t.has_constant_pattern()) {
            warn!(
                template = %template.key,
                "Group template has a pattern without a tenant slot; it renders identically for every tenant"
            );
        }
        info!(
            "Loaded {} group templates under '{}' ({} rejected)",
            parsed.templates.len(),
            namespace,
            parsed.rejected.len()
        );

        Self {
            namespace: namespace.to_string(),
            templates: parsed.templates.into(),
            rejected: parsed.rejected.into(),
        }
    }

    pub fn from_config(config: &TemplateSourceConfig) -> Self {
        Self::load(&config.namespace, &config.properties)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn templates(&self) -> &[GroupTemplate] {
        &self.templates
    }

    pub fn rejected(&self) -> &[RejectedTemplate] {
        &self.rejected
    }

    pub fn get(&self, key: &str) -> Option<&GroupTemplate> {
        self.templates.iter().find(|t| t.key == key)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn props(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_isolates_incomplete_template() {
        let properties = props(&[
            ("media.groups.news.id_tmpl", "NEWS_%s"),
            ("media.groups.news.name_tmpl", "News Team (%s)"),
            ("media.groups.news.description_tmpl", "News team for %s"),
            ("media.groups.news.roles", "ROLE_NEWS_ADMIN,ROLE_NEWS_EDITOR"),
            ("media.groups.sports.id_tmpl", "SPORTS_%s"),
            ("media.groups.sports.name_tmpl", "Sports (%s)"),
            ("media.groups.sports.description_tmpl", "Sports desk for %s"),
            ("media.groups.weather.id_tmpl", "WEATHER_%s"),
            ("media.groups.weather.name_tmpl", "Weather (%s)"),
            ("media.groups.weather.description_tmpl", "Weather desk for %s"),
            ("media.groups.weather.roles", "ROLE_WEATHER"),
        ]);

        let parsed = parse_templates("media.groups", &properties);

        let keys: Vec<_> = parsed.templates.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["news", "weather"]);
        assert_eq!(
            parsed.rejected,
            vec![RejectedTemplate {
                key: "sports".to_string(),
                reason: TemplateError::MissingField(FIELD_ROLES),
            }]
        );
    }

    #[test]
    fn test_parse_trims_and_splits_roles() {
        let properties = props(&[
            ("ns.ops.id_tmpl", "  OPS_%s "),
            ("ns.ops.name_tmpl", " Ops (%s)"),
            ("ns.ops.description_tmpl", "Ops for %s "),
            ("ns.ops.roles", " ROLE_A , ,ROLE_B,ROLE_A,"),
        ]);

        let parsed = parse_templates("ns", &properties);
        assert!(parsed.rejected.is_empty());
        let template = &parsed.templates[0];
        assert_eq!(template.id_pattern, "OPS_%s");
        assert_eq!(template.name_pattern, "Ops (%s)");
        assert_eq!(template.description_pattern, "Ops for %s");
        assert_eq!(template.roles.iter().collect::<Vec<_>>(), vec!["ROLE_A", "ROLE_B"]);
    }

    #[test]
    fn test_parse_ignores_foreign_and_unknown_keys() {
        let properties = props(&[
            ("other.ops.id_tmpl", "OPS_%s"),
            ("ns.ops.colour", "blue"),
            ("ns.id_tmpl", "ORPHAN_%s"),
            ("ns..id_tmpl", "EMPTY_%s"),
        ]);

        let parsed = parse_templates("ns.", &properties);
        assert!(parsed.templates.is_empty());
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn test_unknown_suffix_does_not_create_template() {
        let properties = props(&[
            ("ns.news.id_tmpl", "NEWS_%s"),
            ("ns.news.name_tmpl", "News (%s)"),
            ("ns.news.description_tmpl", "News for %s"),
            ("ns.news.roles", "ROLE_NEWS"),
            ("ns.news.extra.flag", "true"),
        ]);

        let parsed = parse_templates("ns", &properties);
        assert_eq!(parsed.templates.len(), 1);
        assert_eq!(parsed.templates[0].key, "news");
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn test_group_keys_may_contain_dots() {
        let properties = props(&[
            ("ns.team.a.id_tmpl", "A_%s"),
            ("ns.team.a.name_tmpl", "A"),
            ("ns.team.a.description_tmpl", "A for %s"),
            ("ns.team.a.roles", "ROLE_A"),
        ]);
        let parsed = parse_templates("ns", &properties);
        assert_eq!(parsed.templates[0].key, "team.a");
    }

    #[test]
    fn test_registry_exposes_templates_and_rejections() {
        let properties = props(&[
            ("ns.a.id_tmpl", "A_%s"),
            ("ns.a.name_tmpl", "A (%s)"),
            ("ns.a.description_tmpl", "A for %s"),
            ("ns.a.roles", "ROLE_A"),
            ("ns.b.id_tmpl", "B_%s_%s"),
            ("ns.b.name_tmpl", "B"),
            ("ns.b.description_tmpl", "B"),
            ("ns.b.roles", "ROLE_B"),
        ]);

        let registry = TemplateRegistry::load("ns", &properties);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("a").is_some());
        assert!(registry.get("b").is_none());
        assert_eq!(registry.rejected().len(), 1);
        assert!(matches!(
            registry.rejected()[0].reason,
            TemplateError::TooManySlots { .. }
        ));
    }
}
