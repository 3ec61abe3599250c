//! Units of verification work.

use crate::cache::CacheKey;
use crate::config::Config;
use crate::rule::{Rule, RuleScope, RuleSet};
use crate::source::SourceFile;
use crate::types::Severity;

use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// What a task is applied to.
#[derive(Debug, Clone)]
pub enum TaskTarget {
    /// A single file, for file-scoped rules.
    File(Arc<SourceFile>),
    /// The whole project or repository, for project-wide rules.
    Project {
        /// Project or repo scope.
        scope: RuleScope,
        /// Relative paths of every file in the project.
        files: Arc<[PathBuf]>,
    },
}

impl TaskTarget {
    /// Returns the file for file-scoped tasks.
    #[must_use]
    pub fn file(&self) -> Option<&SourceFile> {
        match self {
            Self::File(file) => Some(file),
            Self::Project { .. } => None,
        }
    }

    /// Grouping key: the relative file path, or the rule scope name.
    #[must_use]
    pub fn group_key(&self) -> String {
        match self {
            Self::File(file) => file.relative_path.display().to_string(),
            Self::Project { scope, .. } => scope.to_string(),
        }
    }

    fn fingerprint(&self) -> serde_json::Value {
        match self {
            Self::File(file) => json!({
                "file": {
                    "content": file.content,
                    "relativePath": file.relative_path.to_string_lossy(),
                    "language": file.language,
                }
            }),
            Self::Project { scope, files } => json!({
                "project": {
                    "scope": scope,
                    "files": files.iter().map(|p| p.to_string_lossy()).collect::<Vec<_>>(),
                }
            }),
        }
    }
}

impl std::fmt::Display for TaskTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(file) => write!(f, "{}", file.relative_path.display()),
            Self::Project { scope, .. } => write!(f, "<{scope}>"),
        }
    }
}

/// Effective configuration owned by one task.
///
/// Each task holds its own copy, so inline overrides never leak into sibling
/// tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    /// Model used for this task.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-rule severity settings.
    pub rules: BTreeMap<String, Severity>,
}

impl TaskConfig {
    /// Derives the effective config for `rule` from the ambient config.
    #[must_use]
    pub fn new(config: &Config, rule: &Rule) -> Self {
        Self {
            model: rule
                .model
                .clone()
                .unwrap_or_else(|| config.llm.model.clone()),
            temperature: config.llm.temperature,
            rules: config.rules.clone(),
        }
    }

    /// Severity of `rule` under this config.
    #[must_use]
    pub fn severity_for(&self, rule: &Rule) -> Severity {
        self.rules
            .get(rule.name.as_str())
            .copied()
            .unwrap_or(rule.severity)
    }

    /// Merges override settings; overrides win on conflicting keys.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, Severity>) {
        self.rules
            .extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
    }

    fn fingerprint(&self) -> serde_json::Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
        })
    }
}

/// One rule applied to one file (or to the project) under an effective config.
#[derive(Debug, Clone)]
pub struct Task {
    /// Rule to verify.
    pub rule: Arc<Rule>,
    /// File or project the rule applies to.
    pub target: TaskTarget,
    /// Effective configuration.
    pub config: TaskConfig,
    /// Stable identity, computed eagerly at framing time.
    pub cache_key: CacheKey,
}

impl Task {
    /// Frames a task and derives its cache key.
    #[must_use]
    pub fn new(target: TaskTarget, rule: Arc<Rule>, config: &Config) -> Self {
        let config = TaskConfig::new(config, &rule);
        let cache_key = CacheKey::of(&json!({
            "target": target.fingerprint(),
            "rule": rule.fingerprint(),
            "params": config.fingerprint(),
        }));
        Self {
            rule,
            target,
            config,
            cache_key,
        }
    }

    /// Effective severity of this task's rule.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.config.severity_for(&self.rule)
    }
}

/// Frames a file-scoped task.
#[must_use]
pub fn frame(file: Arc<SourceFile>, rule: Arc<Rule>, config: &Config) -> Task {
    Task::new(TaskTarget::File(file), rule, config)
}

/// Frames every task for `files` × `rules`.
///
/// File-scoped rules produce one task per applicable file; project- and
/// repo-scoped rules produce exactly one task regardless of file count.
#[must_use]
pub fn frame_all(files: &[Arc<SourceFile>], rules: &RuleSet, config: &Config) -> Vec<Task> {
    let listing: Arc<[PathBuf]> = files.iter().map(|f| f.relative_path.clone()).collect();
    let mut tasks = Vec::new();

    for rule in rules.iter() {
        if rule.scope.is_project_wide() {
            let target = TaskTarget::Project {
                scope: rule.scope,
                files: Arc::clone(&listing),
            };
            tasks.push(Task::new(target, Arc::clone(rule), config));
            continue;
        }
        for file in files.iter().filter(|f| rule.applies_to(f)) {
            tasks.push(frame(Arc::clone(file), Arc::clone(rule), config));
        }
    }

    tasks
}
