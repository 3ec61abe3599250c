//! Configuration types for llm-lint.

use crate::rule::RuleName;
use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration for llm-lint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Oracle invocation parameters.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Pipeline configuration.
    #[serde(default)]
    pub linter: LinterConfig,

    /// Per-rule severity overrides.
    #[serde(default)]
    pub rules: BTreeMap<String, Severity>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a field fails validation.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field-level invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field with its path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in self.rules.keys() {
            RuleName::new(name).map_err(|e| ConfigError::Invalid {
                field: format!("rules.{name}"),
                message: e.to_string(),
            })?;
        }
        if self.linter.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "linter.concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid {
                field: "llm.temperature".to_string(),
                message: format!("{} is outside 0.0..=2.0", self.llm.temperature),
            });
        }
        Ok(())
    }

    /// Gets the severity override for a rule.
    #[must_use]
    pub fn rule_severity(&self, rule_name: &str) -> Option<Severity> {
        self.rules.get(rule_name).copied()
    }

    /// Worker count, forced to 1 in debug mode.
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        if self.linter.debug {
            1
        } else {
            self.linter.concurrency.max(1)
        }
    }
}

/// Oracle invocation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Default model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,

    /// External command used by the CLI transport.
    #[serde(default)]
    pub command: Vec<String>,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.0,
            command: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinterConfig {
    /// Maximum number of tasks in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Serialize all tasks for deterministic tracing.
    #[serde(default)]
    pub debug: bool,

    /// Stop scheduling new tasks once any violation is found.
    #[serde(default)]
    pub early_exit: bool,

    /// Keep the cache in memory only.
    #[serde(default)]
    pub no_cache: bool,

    /// Directory holding the persistent cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Re-prompts allowed after a malformed oracle reply.
    #[serde(default = "default_retries")]
    pub parse_retries: usize,

    /// Retries of a whole task after an infrastructure failure.
    #[serde(default = "default_retries")]
    pub task_retries: usize,

    /// Abort the run on the first failed task.
    #[serde(default)]
    pub fail_fast: bool,

    /// Glob patterns to include (if empty, all files).
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns to exclude from linting.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            debug: false,
            early_exit: false,
            no_cache: false,
            cache_dir: default_cache_dir(),
            parse_retries: default_retries(),
            task_retries: default_retries(),
            fail_fast: false,
            include: Vec::new(),
            exclude: default_exclude(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_concurrency() -> usize {
    16
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".llm-lint-cache")
}

fn default_retries() -> usize {
    2
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/.git/**".to_string(),
    ]
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A field holds an invalid value.
    #[error("Invalid config at `{field}`: {message}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}
