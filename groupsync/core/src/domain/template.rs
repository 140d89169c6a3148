// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Group templates
//!
//! A template is a rule for deriving one group per tenant. Patterns use a
//! single `%s` slot (`%%` for a literal percent sign):
//!
//! | Pattern | Substituted value |
//! |---------|-------------------|
//! | `id_pattern` | tenant id, upper-cased |
//! | `name_pattern` | tenant display name |
//! | `description_pattern` | tenant display name |
//!
//! Role names carry no slot; they are bound to the tenant at render time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::domain::group::{GroupId, RenderedGroup, Role};
use crate::domain::tenant::Tenant;

/// Configuration field names of a template
pub const FIELD_ID: &str = "id_tmpl";
pub const FIELD_NAME: &str = "name_tmpl";
pub const FIELD_DESCRIPTION: &str = "description_tmpl";
pub const FIELD_ROLES: &str = "roles";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("missing or empty field '{0}'")]
    MissingField(&'static str),

    #[error("role list contains no role names")]
    EmptyRoles,

    #[error("field '{field}' has {count} substitution slots, at most one is supported")]
    TooManySlots { field: &'static str, count: usize },

    #[error("field '{field}' uses unsupported format directive '%{directive}'")]
    UnsupportedDirective { field: &'static str, directive: String },
}

/// A validated group template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTemplate {
    /// The `<groupKey>` this template was configured under
    pub key: String,
    pub id_pattern: String,
    pub name_pattern: String,
    pub description_pattern: String,
    pub roles: BTreeSet<String>,
}

impl GroupTemplate {
    /// Build a template from raw field values.
    ///
    /// Values are trimmed; role names are trimmed and empty ones dropped.
    pub fn new<I, S>(
        key: impl Into<String>,
        id_pattern: &str,
        name_pattern: &str,
        description_pattern: &str,
        roles: I,
    ) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let id_pattern = required(FIELD_ID, id_pattern)?;
        let name_pattern = required(FIELD_NAME, name_pattern)?;
        let description_pattern = required(FIELD_DESCRIPTION, description_pattern)?;

        for (field, pattern) in [
            (FIELD_ID, &id_pattern),
            (FIELD_NAME, &name_pattern),
            (FIELD_DESCRIPTION, &description_pattern),
        ] {
            let count = slot_count(field, pattern)?;
            if count > 1 {
                return Err(TemplateError::TooManySlots { field, count });
            }
        }

        let roles: BTreeSet<String> = roles
            .into_iter()
            .map(|r| r.as_ref().trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if roles.is_empty() {
            return Err(TemplateError::EmptyRoles);
        }

        Ok(Self {
            key: key.into(),
            id_pattern,
            name_pattern,
            description_pattern,
            roles,
        })
    }

    /// Whether any pattern renders verbatim (no tenant attribute slot)
    pub fn has_constant_pattern(&self) -> bool {
        [&self.id_pattern, &self.name_pattern, &self.description_pattern]
            .iter()
            .any(|p| !p.contains("%s"))
    }

    /// Render the desired group for a tenant. Pure: same inputs, same output.
    pub fn render(&self, tenant: &Tenant) -> RenderedGroup {
        let group_id = GroupId::new(substitute(
            &self.id_pattern,
            &tenant.id.as_str().to_uppercase(),
        ));
        RenderedGroup {
            group_id,
            tenant_id: tenant.id.clone(),
            name: substitute(&self.name_pattern, &tenant.display_name),
            description: substitute(&self.description_pattern, &tenant.display_name),
            roles: self
                .roles
                .iter()
                .map(|name| Role::new(name.clone(), tenant.id.clone()))
                .collect(),
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String, TemplateError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TemplateError::MissingField(field));
    }
    Ok(value.to_string())
}

fn slot_count(field: &'static str, pattern: &str) -> Result<usize, TemplateError> {
    let mut count = 0;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        match chars.next() {
            Some('s') => count += 1,
            Some('%') => {}
            Some(other) => {
                return Err(TemplateError::UnsupportedDirective {
                    field,
                    directive: other.to_string(),
                })
            }
            None => {
                return Err(TemplateError::UnsupportedDirective {
                    field,
                    directive: String::new(),
                })
            }
        }
    }
    Ok(count)
}

/// Replace the `%s` slot with `value` and `%%` with `%`.
fn substitute(pattern: &str, value: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + value.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push_str(value),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn news_template() -> GroupTemplate {
        GroupTemplate::new(
            "news",
            "NEWS_%s",
            "News Team (%s)",
            "News team for %s",
            ["ROLE_NEWS_ADMIN", "ROLE_NEWS_EDITOR"],
        )
        .unwrap()
    }

    #[test]
    fn test_render_news_template_for_acme() {
        let rendered = news_template().render(&Tenant::new("acme", "Acme Corp"));

        assert_eq!(rendered.group_id.as_str(), "NEWS_ACME");
        assert_eq!(rendered.name, "News Team (Acme Corp)");
        assert_eq!(rendered.description, "News team for Acme Corp");
        assert_eq!(
            rendered.role_names(),
            BTreeSet::from(["ROLE_NEWS_ADMIN".to_string(), "ROLE_NEWS_EDITOR".to_string()])
        );
        assert!(rendered.roles.iter().all(|r| r.tenant_id.as_str() == "acme"));
    }

    #[test]
    fn test_group_id_ignores_display_name() {
        let template = news_template();
        let a = template.render(&Tenant::new("acme", "Acme Corp"));
        let b = template.render(&Tenant::new("acme", "ACME Corporation International"));
        assert_eq!(a.group_id, b.group_id);
        assert_ne!(a.name, b.name);
    }

    #[test]
    fn test_roles_are_trimmed_and_deduplicated() {
        let template = GroupTemplate::new(
            "ops",
            " OPS_%s ",
            "Ops",
            "Ops for %s",
            [" ROLE_A", "ROLE_A ", "", "ROLE_B"],
        )
        .unwrap();
        assert_eq!(template.id_pattern, "OPS_%s");
        assert_eq!(template.roles.len(), 2);
        assert!(template.has_constant_pattern());
    }

    #[test]
    fn test_incomplete_template_is_rejected() {
        let err = GroupTemplate::new("x", "X_%s", "  ", "d %s", ["ROLE"]).unwrap_err();
        assert_eq!(err, TemplateError::MissingField(FIELD_NAME));

        let err = GroupTemplate::new("x", "X_%s", "n", "d %s", [" ", ""]).unwrap_err();
        assert_eq!(err, TemplateError::EmptyRoles);
    }

    #[test]
    fn test_pattern_slot_validation() {
        let err = GroupTemplate::new("x", "X_%s_%s", "n", "d", ["ROLE"]).unwrap_err();
        assert!(matches!(err, TemplateError::TooManySlots { field: FIELD_ID, count: 2 }));

        let err = GroupTemplate::new("x", "X_%d", "n", "d", ["ROLE"]).unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedDirective { .. }));
    }

    #[test]
    fn test_percent_escape_renders_literal() {
        let template =
            GroupTemplate::new("quota", "Q_%s", "100%% (%s)", "d", ["ROLE"]).unwrap();
        let rendered = template.render(&Tenant::new("t1", "Tenant One"));
        assert_eq!(rendered.name, "100% (Tenant One)");
        assert_eq!(rendered.group_id.as_str(), "Q_T1");
    }
}
