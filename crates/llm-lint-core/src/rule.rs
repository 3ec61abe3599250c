//! Rule records judged by the oracle.
//!
//! Rules are plain data: a name, a natural-language description and a set of
//! correct/incorrect examples. All invariants are enforced at construction
//! time via validated newtypes.

use crate::source::SourceFile;
use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Errors from validating rule names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleNameError {
    /// Name is empty.
    #[error("rule name must not be empty")]
    Empty,
    /// Name contains characters other than `[a-z0-9-]`, or misplaced hyphens.
    #[error("invalid rule name `{name}`: expected lowercase kebab-case, optionally `@scope/name`")]
    Invalid {
        /// The rejected name.
        name: String,
    },
}

/// A validated rule name: lowercase kebab-case, optionally namespaced as
/// `@scope/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RuleName(String);

impl RuleName {
    /// Creates a new rule name.
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or not kebab-case.
    pub fn new(name: &str) -> Result<Self, RuleNameError> {
        if name.is_empty() {
            return Err(RuleNameError::Empty);
        }
        let valid = match name.strip_prefix('@') {
            Some(scoped) => scoped
                .split_once('/')
                .is_some_and(|(scope, base)| is_kebab(scope) && is_kebab(base)),
            None => is_kebab(name),
        };
        if !valid {
            return Err(RuleNameError::Invalid {
                name: name.to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_kebab(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('-')
        && !segment.ends_with('-')
        && !segment.contains("--")
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors from compiling glob filters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GlobError {
    /// Pattern is empty.
    #[error("glob pattern must not be empty")]
    Empty,
    /// Pattern does not compile.
    #[error("invalid glob pattern `{pattern}`: {reason}")]
    Invalid {
        /// The rejected pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// A validated glob pattern for relative file path matching.
///
/// The glob is compiled once at construction and reused for all match calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    raw: String,
    compiled: glob::Pattern,
}

impl GlobPattern {
    /// Creates a new glob pattern.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is empty or has invalid glob syntax.
    pub fn new(pattern: &str) -> Result<Self, GlobError> {
        if pattern.is_empty() {
            return Err(GlobError::Empty);
        }
        let compiled = glob::Pattern::new(pattern).map_err(|e| GlobError::Invalid {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests whether a relative file path matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        if self.compiled.matches(&path_str) {
            return true;
        }
        // `dir/**` should also match everything below `dir/`.
        if let Some(prefix) = self.raw.strip_suffix("/**") {
            let normalized = prefix.trim_end_matches('/');
            if path_str.starts_with(normalized)
                && path_str
                    .as_bytes()
                    .get(normalized.len())
                    .is_some_and(|&b| b == b'/')
            {
                return true;
            }
        }
        false
    }

    /// Returns the pattern as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Serialize for GlobPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// A code example attached to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Example source code.
    pub code: String,
    /// Optional language tag (e.g., "typescript").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Example {
    /// Creates an example without a language tag.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: None,
        }
    }

    /// Sets the language tag.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// What a rule is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    /// One task per matching file.
    #[default]
    File,
    /// One task for the whole project.
    Project,
    /// One task for the whole repository.
    Repo,
}

impl RuleScope {
    /// Returns true for project- and repo-wide scopes.
    #[must_use]
    pub fn is_project_wide(self) -> bool {
        !matches!(self, Self::File)
    }
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Project => write!(f, "project"),
            Self::Repo => write!(f, "repo"),
        }
    }
}

/// A natural-language coding rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    /// Unique rule name.
    pub name: RuleName,
    /// Human title.
    pub title: String,
    /// Free-text description of the rule.
    pub description: String,
    /// Examples of code that follows the rule.
    pub positive_examples: Vec<Example>,
    /// Examples of code that breaks the rule.
    pub negative_examples: Vec<Example>,
    /// Default severity.
    pub severity: Severity,
    /// Application scope.
    pub scope: RuleScope,
    /// Languages this rule is restricted to (empty means any).
    pub languages: Vec<String>,
    /// Model override for this rule.
    pub model: Option<String>,
    /// Only files matching one of these globs are checked (empty means all).
    pub include: Vec<GlobPattern>,
    /// Files matching one of these globs are skipped.
    pub exclude: Vec<GlobPattern>,
    /// Whether the rule offers automatic fixes.
    pub fixable: bool,
    /// Where the rule was defined.
    pub source: Option<PathBuf>,
}

impl Rule {
    /// Creates a file-scoped `error` rule with no examples or filters.
    #[must_use]
    pub fn new(name: RuleName, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name,
            title: title.into(),
            description: description.into(),
            positive_examples: Vec::new(),
            negative_examples: Vec::new(),
            severity: Severity::Error,
            scope: RuleScope::File,
            languages: Vec::new(),
            model: None,
            include: Vec::new(),
            exclude: Vec::new(),
            fixable: false,
            source: None,
        }
    }

    /// Adds an example of correct code.
    #[must_use]
    pub fn with_positive(mut self, example: Example) -> Self {
        self.positive_examples.push(example);
        self
    }

    /// Adds an example of incorrect code.
    #[must_use]
    pub fn with_negative(mut self, example: Example) -> Self {
        self.negative_examples.push(example);
        self
    }

    /// Sets the default severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the application scope.
    #[must_use]
    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    /// Restricts the rule to a language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.languages.push(language.into());
        self
    }

    /// Tests whether this file-scoped rule should run on `file`.
    #[must_use]
    pub fn applies_to(&self, file: &SourceFile) -> bool {
        if !self.languages.is_empty() {
            let Some(language) = file.language.as_deref() else {
                return false;
            };
            if !self.languages.iter().any(|l| l == language) {
                return false;
            }
        }
        let path = file.relative_path.as_path();
        if !self.include.is_empty() && !self.include.iter().any(|g| g.matches(path)) {
            return false;
        }
        !self.exclude.iter().any(|g| g.matches(path))
    }

    /// The rule fields that change what the oracle is asked.
    ///
    /// Severity, fixability, and provenance are deliberately left out so that
    /// changing them does not invalidate cached verdicts.
    #[must_use]
    pub fn fingerprint(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "title": self.title,
            "description": self.description,
            "positiveExamples": self.positive_examples,
            "negativeExamples": self.negative_examples,
            "scope": self.scope,
            "languages": self.languages,
        })
    }
}

/// Errors from assembling a rule set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleSetError {
    /// Two rules share a name.
    #[error("duplicate rule name `{name}`")]
    Duplicate {
        /// The duplicated name.
        name: String,
    },
}

/// A collection of rules with unique names.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Arc<Rule>>,
    index: HashMap<RuleName, usize>,
}

impl RuleSet {
    /// Builds a rule set, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first duplicated rule.
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Result<Self, RuleSetError> {
        let mut set = Self::default();
        for rule in rules {
            set.push(rule)?;
        }
        Ok(set)
    }

    /// Adds one rule.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule with the same name is already present.
    pub fn push(&mut self, rule: Rule) -> Result<(), RuleSetError> {
        if self.index.contains_key(&rule.name) {
            return Err(RuleSetError::Duplicate {
                name: rule.name.to_string(),
            });
        }
        self.index.insert(rule.name.clone(), self.rules.len());
        self.rules.push(Arc::new(rule));
        Ok(())
    }

    /// Looks up a rule by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Rule>> {
        let name = RuleName::new(name).ok()?;
        self.index.get(&name).map(|&i| &self.rules[i])
    }

    /// Iterates over rules in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.iter()
    }

    /// Keeps only the rules whose names are listed.
    #[must_use]
    pub fn retain_named(self, names: &[&str]) -> Self {
        let rules = self
            .rules
            .into_iter()
            .filter(|r| names.contains(&r.name.as_str()))
            .collect::<Vec<_>>();
        let index = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Self { rules, index }
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
