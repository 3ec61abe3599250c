//! DTO → Rule conversion with validation.

use std::path::Path;

use crate::rule::{Example, GlobPattern, Rule, RuleName, RuleScope, RuleSet, RuleSetError};
use crate::types::Severity;

use super::dto::{ExampleDto, RuleDto, RulesConfigDto};

/// Errors during DTO → Rule conversion.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A field-level validation error.
    #[error("{context}: {message}")]
    Validation {
        /// Where the error occurred (e.g., "rule[0].name").
        context: String,
        /// What is wrong with the field.
        message: String,
    },

    /// Unknown scope string.
    #[error("{context}: unknown scope `{value}`, expected: file, project, repo")]
    UnknownScope {
        /// Where the error occurred.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// Two rules share a name.
    #[error("{0}")]
    Duplicate(#[from] RuleSetError),
}

/// Converts a `RulesConfigDto` to a validated `RuleSet`.
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load(dto: RulesConfigDto, source: Option<&Path>) -> Result<RuleSet, LoadError> {
    let rules = dto
        .rules
        .into_iter()
        .enumerate()
        .map(|(i, r)| convert_rule(r, i, source))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RuleSet::new(rules)?)
}

fn convert_rule(dto: RuleDto, index: usize, source: Option<&Path>) -> Result<Rule, LoadError> {
    let ctx = format!("rule[{index}]");
    let name = RuleName::new(&dto.name).map_err(|e| LoadError::Validation {
        context: format!("{ctx}.name"),
        message: e.to_string(),
    })?;

    let severity = dto
        .severity
        .parse::<Severity>()
        .map_err(|e| LoadError::Validation {
            context: format!("{ctx}.severity"),
            message: e.to_string(),
        })?;

    let scope = parse_scope(&dto.scope, &format!("{ctx}.scope"))?;
    let include = convert_globs(&dto.include, &format!("{ctx}.include"))?;
    let exclude = convert_globs(&dto.exclude, &format!("{ctx}.exclude"))?;

    let title = dto
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| name.to_string());

    Ok(Rule {
        name,
        title,
        description: dto.description,
        positive_examples: dto.positive.into_iter().map(convert_example).collect(),
        negative_examples: dto.negative.into_iter().map(convert_example).collect(),
        severity,
        scope,
        languages: dto.languages,
        model: dto.model,
        include,
        exclude,
        fixable: dto.fixable,
        source: source.map(Path::to_path_buf),
    })
}

fn convert_example(dto: ExampleDto) -> Example {
    Example {
        code: dto.code,
        language: dto.language,
    }
}

fn convert_globs(patterns: &[String], context: &str) -> Result<Vec<GlobPattern>, LoadError> {
    patterns
        .iter()
        .enumerate()
        .map(|(i, p)| {
            GlobPattern::new(p).map_err(|e| LoadError::Validation {
                context: format!("{context}[{i}]"),
                message: e.to_string(),
            })
        })
        .collect()
}

fn parse_scope(s: &str, context: &str) -> Result<RuleScope, LoadError> {
    match s {
        "file" => Ok(RuleScope::File),
        "project" => Ok(RuleScope::Project),
        "repo" => Ok(RuleScope::Repo),
        other => Err(LoadError::UnknownScope {
            context: context.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_dto(name: &str) -> RuleDto {
        RuleDto {
            name: name.to_string(),
            title: None,
            description: "desc".to_string(),
            positive: vec![],
            negative: vec![],
            severity: "error".to_string(),
            scope: "file".to_string(),
            languages: vec![],
            model: None,
            include: vec![],
            exclude: vec![],
            fixable: false,
        }
    }

    fn load_one(dto: RuleDto) -> Result<RuleSet, LoadError> {
        load(RulesConfigDto { rules: vec![dto] }, None)
    }

    #[test]
    fn invalid_name_reports_context() {
        let err = load_one(rule_dto("Bad_Name")).unwrap_err();
        assert!(err.to_string().starts_with("rule[0].name:"), "{err}");
    }

    #[test]
    fn invalid_severity_reports_context() {
        let mut dto = rule_dto("no-console");
        dto.severity = "fatal".to_string();
        let err = load_one(dto).unwrap_err();
        assert!(err.to_string().starts_with("rule[0].severity:"), "{err}");
    }

    #[test]
    fn unknown_scope_rejected() {
        let mut dto = rule_dto("no-console");
        dto.scope = "module".to_string();
        let err = load_one(dto).unwrap_err();
        assert!(matches!(err, LoadError::UnknownScope { .. }));
    }

    #[test]
    fn invalid_glob_reports_index() {
        let mut dto = rule_dto("no-console");
        dto.exclude = vec!["ok/**".to_string(), "[".to_string()];
        let err = load_one(dto).unwrap_err();
        assert!(err.to_string().starts_with("rule[0].exclude[1]:"), "{err}");
    }

    #[test]
    fn duplicate_names_are_fatal() {
        let dto = RulesConfigDto {
            rules: vec![rule_dto("no-console"), rule_dto("no-console")],
        };
        let err = load(dto, None).unwrap_err();
        assert!(matches!(err, LoadError::Duplicate(_)));
    }
}
