//! Rule definitions loaded from TOML configuration.
//!
//! # Architecture
//!
//! ```text
//! TOML text
//!   ↓ serde (DTO layer)
//! dto types
//!   ↓ validate + convert
//! RuleSet (validated Rule records, unique names)
//! ```

use crate::rule::RuleSet;
use std::path::Path;

pub mod dto;
pub mod loader;

/// Errors from parsing TOML and loading rule definitions.
#[derive(Debug, thiserror::Error)]
pub enum LoadRulesError {
    /// TOML deserialization failed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Rule validation failed.
    #[error("{0}")]
    Load(#[from] loader::LoadError),
}

/// Parses TOML content and builds the rule set from its `[[rule]]` tables.
///
/// Returns an empty set if no rules are defined.
///
/// # Errors
///
/// Returns an error if TOML parsing or rule validation fails.
pub fn load_rules_from_toml(content: &str, source: Option<&Path>) -> Result<RuleSet, LoadRulesError> {
    let dto: dto::RulesConfigDto = toml::from_str(content)?;
    Ok(loader::load(dto, source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleScope;
    use crate::types::Severity;

    #[test]
    fn empty_content_yields_no_rules() {
        let rules = load_rules_from_toml("", None).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn settings_only_config_yields_no_rules() {
        let toml = r#"
[linter]
concurrency = 2

[rules]
no-console = "warn"
"#;
        let rules = load_rules_from_toml(toml, None).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn loads_full_rule_definition() {
        let toml = r#"
[[rule]]
name = "no-console"
title = "Avoid console logging"
description = "Use the project logger instead of console.*"
severity = "warn"
languages = ["javascript"]
include = ["src/**"]

[[rule.negative]]
code = "console.log('debug')"
language = "javascript"

[[rule.positive]]
code = "logger.info('debug')"

[[rule]]
name = "@acme/one-readme"
description = "The repository has exactly one README."
scope = "repo"
"#;
        let rules = load_rules_from_toml(toml, Some(Path::new("llm-lint.toml"))).unwrap();
        assert_eq!(rules.len(), 2);

        let rule = rules.get("no-console").unwrap();
        assert_eq!(rule.title, "Avoid console logging");
        assert_eq!(rule.severity, Severity::Warn);
        assert_eq!(rule.negative_examples.len(), 1);
        assert_eq!(rule.negative_examples[0].language.as_deref(), Some("javascript"));
        assert_eq!(rule.positive_examples.len(), 1);
        assert_eq!(rule.include[0].as_str(), "src/**");
        assert_eq!(rule.source.as_deref(), Some(Path::new("llm-lint.toml")));

        let repo = rules.get("@acme/one-readme").unwrap();
        assert_eq!(repo.scope, RuleScope::Repo);
        assert_eq!(repo.title, "@acme/one-readme");
    }
}
