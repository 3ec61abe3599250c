//! Checks that may settle a task before the oracle is consulted.

use crate::cache::LintCache;
use crate::error::LintFailure;
use crate::inline::{self, InlineOverride};
use crate::task::Task;
use crate::types::{LintResult, SkipReason, Usage};

use tracing::debug;

/// Outcome of pre-processing a task.
#[derive(Debug)]
pub enum Stage {
    /// The task still needs the oracle; its config may carry inline overrides.
    Pending(Task),
    /// The task settled without an oracle call.
    Settled(LintResult),
}

/// Runs the pre-process checks, stopping at the first that applies:
///
/// 1. empty file: skipped, not cached
/// 2. cache hit: the cached result restamped with the current severity,
///    counted as a cached model call
/// 3. inline disable: an empty result is cached and the task skipped
/// 4. rule `off` after inline overrides: skipped, not cached
///
/// # Errors
///
/// Returns a validation failure for malformed inline directives and a cache
/// failure if the store cannot be read or written.
pub async fn pre_process(mut task: Task, cache: &LintCache) -> Result<Stage, LintFailure> {
    if task.target.file().is_some_and(|f| f.is_blank()) {
        debug!("Skipping {} for {}: empty file", task.rule.name, task.target);
        return Ok(Stage::Settled(LintResult::skipped(SkipReason::Empty)));
    }

    if let Some(cached) = cache.get(&task.cache_key).await? {
        debug!("Cache hit for {} on {}", task.rule.name, task.target);
        // Severity is not part of the key; stamp the current one.
        let overrides = task.target.file().map(|f| inline::resolve(&f.content));
        if let Some(Ok(Some(InlineOverride::Rules(overrides)))) = overrides {
            task.config.apply_overrides(&overrides);
        }
        let severity = task.severity();
        if severity.is_off() {
            return Ok(Stage::Settled(LintResult::skipped(SkipReason::RuleDisabled)));
        }

        let mut result = LintResult::skipped(SkipReason::Cached);
        result.lint_errors = cached
            .lint_errors
            .into_iter()
            .map(|mut e| {
                e.severity = severity;
                e
            })
            .collect();
        result.message = cached.message;
        result.usage = Usage {
            model_calls_cached: 1,
            ..Usage::default()
        };
        return Ok(Stage::Settled(result));
    }

    if let Some(file) = task.target.file() {
        let resolved = inline::resolve(&file.content).map_err(|source| LintFailure::Inline {
            path: file.relative_path.clone(),
            source,
        })?;
        match resolved {
            Some(InlineOverride::Disabled) => {
                debug!("Skipping {}: disabled inline", task.target);
                cache.set(&task.cache_key, &LintResult::new()).await?;
                return Ok(Stage::Settled(LintResult::skipped(
                    SkipReason::InlineLinterDisabled,
                )));
            }
            Some(InlineOverride::Rules(overrides)) => task.config.apply_overrides(&overrides),
            None => {}
        }
    }

    if task.severity().is_off() {
        debug!("Skipping {} for {}: rule is off", task.rule.name, task.target);
        return Ok(Stage::Settled(LintResult::skipped(SkipReason::RuleDisabled)));
    }

    Ok(Stage::Pending(task))
}
