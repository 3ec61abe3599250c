//! Core types for oracle verdicts, lint errors, and results.

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Severity setting for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Rule is disabled.
    Off,
    /// Violations are reported but do not fail the run.
    Warn,
    /// Violations fail the run.
    Error,
}

impl Severity {
    /// Returns true if the rule is switched off.
    #[must_use]
    pub fn is_off(self) -> bool {
        self == Self::Off
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Error returned when a severity string is not one of `off`, `warn`, `error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity `{0}`, expected: off, warn, error")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "off" => Ok(Self::Off),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

/// Confidence tier reported by the oracle for a candidate violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Low confidence.
    Low,
    /// Medium confidence.
    Medium,
    /// High confidence.
    High,
}

/// Where the oracle claims a snippet came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetSource {
    /// The snippet was taken from the rule's own examples.
    Examples,
    /// The snippet was taken from the file under test.
    Source,
}

/// Why a task settled without consulting the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Served from the cache.
    Cached,
    /// File content was empty or whitespace only.
    Empty,
    /// Rule is `off` for this file.
    RuleDisabled,
    /// The file disables linting with an inline directive.
    InlineLinterDisabled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cached => write!(f, "cached"),
            Self::Empty => write!(f, "empty"),
            Self::RuleDisabled => write!(f, "rule-disabled"),
            Self::InlineLinterDisabled => write!(f, "inline-linter-disabled"),
        }
    }
}

/// Oracle usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Oracle calls actually made.
    pub model_calls: u64,
    /// Oracle calls avoided because the result was cached.
    pub model_calls_cached: u64,
    /// Prompt tokens consumed.
    pub prompt_tokens: u64,
    /// Completion tokens produced.
    pub completion_tokens: u64,
    /// Total tokens.
    pub total_tokens: u64,
    /// Accumulated monetary cost.
    pub cost: f64,
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.model_calls += other.model_calls;
        self.model_calls_cached += other.model_calls_cached;
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.cost += other.cost;
    }
}

impl std::ops::Add for Usage {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

/// Position of a snippet inside the file it was reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed, in characters).
    pub column: usize,
    /// Byte offset in file.
    pub offset: usize,
    /// Length of the snippet in bytes.
    pub length: usize,
}

impl Location {
    /// Finds the first verbatim occurrence of `snippet` in `content`.
    #[must_use]
    pub fn locate(content: &str, snippet: &str) -> Option<Self> {
        let needle = snippet.trim();
        if needle.is_empty() {
            return None;
        }
        let offset = content.find(needle)?;
        let before = &content[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = content[line_start..offset].chars().count() + 1;
        Some(Self {
            line,
            column,
            offset,
            length: needle.len(),
        })
    }
}

/// A candidate violation as reported by the oracle, before filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationCandidate {
    /// Offending snippet.
    pub code_snippet: String,
    /// Rule name echoed by the oracle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    /// Claimed provenance of the snippet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet_source: Option<SnippetSource>,
    /// Natural-language justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Whether the oracle judged this a violation.
    pub violation: bool,
    /// Confidence tier.
    pub confidence: Confidence,
}

/// A filtered, enriched violation ready to be reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintError {
    /// Rule name (e.g., "no-console").
    pub rule: String,
    /// File path relative to the working root; absent for project-wide rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Detected language of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Model that produced the verdict.
    pub model: String,
    /// Effective severity for this rule and file.
    pub severity: Severity,
    /// Offending snippet.
    pub code_snippet: String,
    /// Justification given by the oracle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Where the snippet occurs in the file, when it could be located.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl LintError {
    /// Formats the error for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!("{} at {}\n", self.rule, self.position());
        let _ = writeln!(output, "  {}: {}", self.severity, first_line(&self.code_snippet));
        if let Some(reasoning) = &self.reasoning {
            let _ = writeln!(output, "  = reason: {reasoning}");
        }
        let _ = writeln!(output, "  = model: {}", self.model);
        output
    }

    /// Returns `file:line:column`, `file`, or `<project>`.
    #[must_use]
    pub fn position(&self) -> String {
        match (&self.file, &self.location) {
            (Some(file), Some(loc)) => format!("{}:{}:{}", file.display(), loc.line, loc.column),
            (Some(file), None) => file.display().to_string(),
            (None, _) => "<project>".to_string(),
        }
    }
}

fn first_line(text: &str) -> &str {
    text.trim().lines().next().unwrap_or_default()
}

impl std::fmt::Display for LintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.position(),
            self.severity,
            self.rule,
            first_line(&self.code_snippet)
        )
    }
}

/// Converts a [`LintError`] to a miette Diagnostic for rich error display.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("[{rule}] {message}")]
pub struct LintErrorDiagnostic {
    rule: String,
    message: String,
    #[source_code]
    source_code: NamedSource<String>,
    #[label("{rule}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
}

impl LintErrorDiagnostic {
    /// Builds a diagnostic over the content of the file the error belongs to.
    #[must_use]
    pub fn new(error: &LintError, content: &str) -> Self {
        let name = error
            .file
            .as_ref()
            .map_or_else(|| "<project>".to_string(), |p| p.display().to_string());
        let span = error
            .location
            .map_or_else(|| SourceSpan::from((0, 0)), |l| SourceSpan::from((l.offset, l.length)));
        Self {
            rule: error.rule.clone(),
            message: format!("{} violation", error.severity),
            source_code: NamedSource::new(name, content.to_string()),
            span,
            help: error.reasoning.clone(),
        }
    }
}

/// Returns the current time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Result of linting one task, or the aggregate of many.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LintResult {
    /// Violations that survived filtering.
    pub lint_errors: Vec<LintError>,
    /// Optional human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Oracle usage counters.
    #[serde(default)]
    pub usage: Usage,
    /// Start time (Unix milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    /// End time (Unix milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<u64>,
    /// Set when the task settled without consulting the oracle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

impl LintResult {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty result stamped with the current time as its start.
    #[must_use]
    pub fn started() -> Self {
        Self {
            started_at: Some(now_millis()),
            ..Self::default()
        }
    }

    /// Creates an empty, finished result marked as skipped.
    #[must_use]
    pub fn skipped(reason: SkipReason) -> Self {
        let now = now_millis();
        Self {
            skipped: Some(reason),
            started_at: Some(now),
            finished_at: Some(now),
            ..Self::default()
        }
    }

    /// Stamps the end time.
    pub fn finish(&mut self) {
        self.finished_at = Some(now_millis());
    }

    /// Returns true if the task settled without consulting the oracle.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    /// Returns true if any lint error has `error` severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.lint_errors
            .iter()
            .any(|e| e.severity == Severity::Error)
    }

    /// Counts lint errors as `(errors, warnings)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize) {
        let errors = self
            .lint_errors
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .count();
        let warnings = self
            .lint_errors
            .iter()
            .filter(|e| e.severity == Severity::Warn)
            .count();
        (errors, warnings)
    }

    /// Combines two results.
    ///
    /// Lint errors are concatenated in order, counters are summed, the
    /// earliest start and latest end are kept, and `other`'s message and skip
    /// marker win when present.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.merge_from(other);
        self
    }

    /// In-place form of [`LintResult::merge`].
    pub fn merge_from(&mut self, other: Self) {
        self.lint_errors.extend(other.lint_errors);
        self.usage += other.usage;
        self.started_at = min_opt(self.started_at, other.started_at);
        self.finished_at = max_opt(self.finished_at, other.finished_at);
        if other.message.as_deref().is_some_and(|m| !m.is_empty()) {
            self.message = other.message;
        }
        if other.skipped.is_some() {
            self.skipped = other.skipped;
        }
    }
}

fn min_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn max_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
