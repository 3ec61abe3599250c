//! # llm-lint-core
//!
//! Core pipeline for lint rules judged by a language model.
//!
//! Rules are written in natural language with correct and incorrect examples.
//! Each (rule, file) pair becomes a [`Task`]; tasks are pre-processed (empty
//! files, cache hits, inline directives), sent to an [`Oracle`], and the reply
//! is parsed, filtered for false positives and merged into a [`LintResult`].
//!
//! - [`Rule`] / [`RuleSet`] for rule records, loaded from TOML via [`rules`]
//! - [`frame_all`] for turning files and rules into tasks
//! - [`Executor`] for bounded-concurrency execution with retries and caching
//! - [`LintCache`] for content-addressed result caching
//! - [`resolve_partial_files`] for turning pattern matches into excerpts
//!
//! ## Example
//!
//! ```ignore
//! use llm_lint_core::{frame_all, Config, Executor, ExecutorOptions, LintCache};
//!
//! let tasks = frame_all(&files, &rules, &config);
//! let cache = LintCache::open(&config.linter.cache_dir, config.linter.no_cache).await?;
//! let report = Executor::new(oracle, cache)
//!     .with_options(ExecutorOptions::from_config(&config))
//!     .run(tasks)
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
mod config;
pub mod error;
pub mod executor;
pub mod filter;
pub mod inline;
pub mod oracle;
pub mod preprocess;
pub mod prompt;
pub mod ranges;
pub mod response;
mod rule;
pub mod rules;
mod source;
pub mod task;
mod types;

pub use cache::{CacheKey, CacheStore, FileStore, LintCache, MemoryStore};
pub use config::{Config, ConfigError, LinterConfig, LlmConfig};
pub use error::{LintFailure, TaskError};
pub use executor::{AbortHandle, Executor, ExecutorOptions, LintReport};
pub use oracle::{Message, Oracle, OracleError, OracleReply, OracleRequest, Role, TokenUsage};
pub use ranges::{resolve_partial_files, PartialFile, PatternMatch};
pub use response::{parse_violations, ParseError};
pub use rules::{load_rules_from_toml, LoadRulesError};
pub use rule::{
    Example, GlobError, GlobPattern, Rule, RuleName, RuleNameError, RuleScope, RuleSet,
    RuleSetError,
};
pub use source::{detect_language, SourceFile};
pub use task::{frame, frame_all, Task, TaskConfig, TaskTarget};
pub use types::{
    now_millis, Confidence, LintError, LintErrorDiagnostic, LintResult, Location, Severity,
    SkipReason, SnippetSource, UnknownSeverity, Usage, ViolationCandidate,
};
