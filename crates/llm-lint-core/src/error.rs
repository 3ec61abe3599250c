//! Failure taxonomy of the lint pipeline.

use crate::cache::CacheError;
use crate::inline::InlineError;
use crate::oracle::OracleError;
use crate::response::ParseError;
use crate::types::Usage;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while processing a task.
#[derive(Debug, Error, Diagnostic)]
pub enum LintFailure {
    /// Malformed inline directive; never retried.
    #[error("invalid inline config in {path}: {source}")]
    #[diagnostic(code(llm_lint::validation), help("fix or remove the llm-lint directive"))]
    Inline {
        /// File containing the directive.
        path: PathBuf,
        /// What is wrong with it.
        source: InlineError,
    },

    /// The oracle reply could not be parsed, even after re-prompting.
    #[error("{0}")]
    #[diagnostic(code(llm_lint::parse))]
    Parse(#[from] ParseError),

    /// Transport or timeout failure talking to the oracle.
    #[error("oracle call failed: {0}")]
    #[diagnostic(code(llm_lint::oracle))]
    Oracle(OracleError),

    /// Cache storage failure.
    #[error("{0}")]
    #[diagnostic(code(llm_lint::cache))]
    Cache(#[from] CacheError),

    /// Explicit cancellation.
    #[error("lint run aborted")]
    #[diagnostic(code(llm_lint::aborted))]
    Aborted,
}

impl From<OracleError> for LintFailure {
    fn from(error: OracleError) -> Self {
        match error {
            OracleError::Aborted => Self::Aborted,
            other => Self::Oracle(other),
        }
    }
}

impl LintFailure {
    /// Returns true for malformed oracle replies.
    #[must_use]
    pub fn is_retryable_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Returns true for explicit cancellation.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Returns true for transport, timeout and cache failures.
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Oracle(_) | Self::Cache(_))
    }

    /// Returns true for input errors that retrying cannot fix.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Inline { .. })
    }
}

/// A task that failed for good, naming its rule and target.
#[derive(Debug, Error, Diagnostic)]
#[error("rule `{rule}` failed on {target} after {attempts} attempt(s): {source}")]
#[diagnostic(code(llm_lint::task))]
pub struct TaskError {
    /// Rule name.
    pub rule: String,
    /// File path or project scope.
    pub target: String,
    /// Attempts made before giving up.
    pub attempts: usize,
    /// Oracle usage spent across every attempt.
    pub usage: Usage,
    /// Final failure.
    #[source]
    #[diagnostic_source]
    pub source: LintFailure,
}
