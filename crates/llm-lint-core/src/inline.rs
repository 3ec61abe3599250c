//! Inline override directives embedded in source comments.
//!
//! Supports directives like:
//! ```text
//! // llm-lint-disable
//! // llm-lint-enable
//! /* llm-lint: no-console: off, @acme/prefer-fetch: warn */
//! # llm-lint: no-print: error
//! ```
//!
//! The file is disabled when its last `llm-lint-disable` comes after its last
//! `llm-lint-enable` (or no enable exists). Rule settings accumulate across
//! directives; a repeated rule takes the last value.

use crate::rule::RuleName;
use crate::types::Severity;

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Resolved inline override for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineOverride {
    /// Linting is disabled for the whole file.
    Disabled,
    /// Per-rule severity settings that win over the ambient config.
    Rules(BTreeMap<String, Severity>),
}

/// Errors from malformed inline directives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InlineError {
    /// The directive has no settings or a setting lacks `name: value` shape.
    #[error("line {line}: malformed directive `{directive}`, expected `llm-lint: <rule>: <off|warn|error>[, ...]`")]
    Malformed {
        /// 1-indexed line of the directive.
        line: usize,
        /// Directive text.
        directive: String,
    },

    /// A rule name fails validation.
    #[error("line {line}: invalid rule name `{name}`")]
    InvalidRuleName {
        /// 1-indexed line of the directive.
        line: usize,
        /// The rejected name.
        name: String,
    },

    /// A setting is not one of off/warn/error.
    #[error("line {line}: invalid setting `{value}` for rule `{name}`, expected: off, warn, error")]
    InvalidSetting {
        /// 1-indexed line of the directive.
        line: usize,
        /// Rule the setting applies to.
        name: String,
        /// The rejected value.
        value: String,
    },
}

fn directive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Comment opener, then the directive keyword and its terminator.
        Regex::new(r"(?://+|/\*+|#+|--|<!--)\s*llm-lint(?:-(disable|enable)(?:\s|\*/|-->|$)|:(.*))")
            .unwrap_or_else(|e| unreachable!("directive regex is valid: {e}"))
    })
}

/// Scans `content` for inline directives.
///
/// Returns `Ok(None)` if the file contains no recognized directive, or only
/// toggles that leave it enabled with no rule settings.
///
/// # Errors
///
/// Returns an error if any rule-setting directive is malformed. A single bad
/// directive invalidates the whole file's inline config.
pub fn resolve(content: &str) -> Result<Option<InlineOverride>, InlineError> {
    let mut last_disable: Option<usize> = None;
    let mut last_enable: Option<usize> = None;
    let mut settings = BTreeMap::new();

    for (index, line) in content.lines().enumerate() {
        for caps in directive_regex().captures_iter(line) {
            match (caps.get(1).map(|m| m.as_str()), caps.get(2)) {
                (Some("disable"), _) => last_disable = Some(index),
                (Some(_), _) => last_enable = Some(index),
                (None, Some(body)) => parse_settings(body.as_str(), index + 1, &mut settings)?,
                (None, None) => {}
            }
        }
    }

    let disabled = match (last_disable, last_enable) {
        (Some(d), Some(e)) => d > e,
        (Some(_), None) => true,
        (None, _) => false,
    };

    if disabled {
        return Ok(Some(InlineOverride::Disabled));
    }
    if settings.is_empty() {
        return Ok(None);
    }
    Ok(Some(InlineOverride::Rules(settings)))
}

fn parse_settings(
    body: &str,
    line: usize,
    settings: &mut BTreeMap<String, Severity>,
) -> Result<(), InlineError> {
    let body = strip_comment_close(body);
    let malformed = || InlineError::Malformed {
        line,
        directive: body.to_string(),
    };

    if body.is_empty() {
        return Err(malformed());
    }

    for entry in body.split(',') {
        let (name, value) = entry.split_once(':').ok_or_else(malformed)?;
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() {
            return Err(malformed());
        }
        RuleName::new(name).map_err(|_| InlineError::InvalidRuleName {
            line,
            name: name.to_string(),
        })?;
        let severity = value
            .parse::<Severity>()
            .map_err(|_| InlineError::InvalidSetting {
                line,
                name: name.to_string(),
                value: value.to_string(),
            })?;
        settings.insert(name.to_string(), severity);
    }
    Ok(())
}

fn strip_comment_close(body: &str) -> &str {
    let body = body.trim();
    let body = body.strip_suffix("-->").unwrap_or(body);
    let body = body.trim_end_matches('/').trim_end_matches('*');
    body.trim()
}
