//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization.
//! They are converted to [`crate::rule::Rule`] records via the loader.

use serde::Deserialize;

/// Raw TOML representation of rule definitions.
///
/// Shares the file with [`crate::Config`]; only the `[[rule]]` tables are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfigDto {
    /// Rule definitions.
    #[serde(rename = "rule", default)]
    pub rules: Vec<RuleDto>,
}

/// TOML representation of one rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDto {
    /// Rule name (e.g., "no-console").
    pub name: String,
    /// Human title (defaults to the name).
    #[serde(default)]
    pub title: Option<String>,
    /// Natural-language description.
    #[serde(default)]
    pub description: String,
    /// Examples of correct code.
    #[serde(default)]
    pub positive: Vec<ExampleDto>,
    /// Examples of incorrect code.
    #[serde(default)]
    pub negative: Vec<ExampleDto>,
    /// Severity (default: "error").
    #[serde(default = "default_severity_str")]
    pub severity: String,
    /// Scope (default: "file").
    #[serde(default = "default_scope_str")]
    pub scope: String,
    /// Language restriction.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Include globs.
    #[serde(default)]
    pub include: Vec<String>,
    /// Exclude globs.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Whether the rule is fixable.
    #[serde(default)]
    pub fixable: bool,
}

/// TOML representation of a code example.
#[derive(Debug, Clone, Deserialize)]
pub struct ExampleDto {
    /// Example code.
    pub code: String,
    /// Optional language tag.
    #[serde(default)]
    pub language: Option<String>,
}

fn default_severity_str() -> String {
    "error".to_string()
}

fn default_scope_str() -> String {
    "file".to_string()
}
