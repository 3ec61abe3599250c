//! Bounded-concurrency pipeline that drives tasks through the oracle.
//!
//! Each task is pre-processed, then sent to the oracle. Malformed replies are
//! re-prompted with a corrective message up to `parse_retries` times. Transport
//! and cache failures retry the whole task up to `task_retries` times. Results
//! are merged into one aggregate under a lock.

use crate::cache::LintCache;
use crate::config::Config;
use crate::error::{LintFailure, TaskError};
use crate::filter::filter_candidates;
use crate::oracle::{Message, Oracle, OracleReply, OracleRequest};
use crate::preprocess::{pre_process, Stage};
use crate::prompt;
use crate::response::parse_violations;
use crate::task::Task;
use crate::types::{LintResult, Usage};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Scheduling and retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Maximum number of tasks in flight.
    pub concurrency: usize,
    /// Stop scheduling once a task reports a violation.
    pub early_exit: bool,
    /// Re-prompts allowed after a malformed reply.
    pub parse_retries: usize,
    /// Whole-task retries after an infrastructure failure.
    pub task_retries: usize,
    /// Stop scheduling after the first failed task.
    pub fail_fast: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ExecutorOptions {
    /// Reads the options from the `[linter]` section.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.effective_concurrency(),
            early_exit: config.linter.early_exit,
            parse_retries: config.linter.parse_retries,
            task_retries: config.linter.task_retries,
            fail_fast: config.linter.fail_fast,
        }
    }
}

/// Shared cancellation flag for a running executor.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Requests cancellation. Tasks that have not yet called the oracle fail
    /// with an abort error.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a run.
#[derive(Debug, Default)]
pub struct LintReport {
    /// Aggregate of every settled task.
    pub result: LintResult,
    /// Tasks that failed for good.
    pub failures: Vec<TaskError>,
    /// Tasks settled without an oracle call.
    pub skipped: usize,
    /// Tasks never started because of early exit or fail-fast.
    pub not_run: usize,
}

impl LintReport {
    /// Returns true if nothing failed and no error-severity violation was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.result.has_errors()
    }
}

/// Runs tasks against an oracle with caching.
#[derive(Clone)]
pub struct Executor {
    oracle: Arc<dyn Oracle>,
    cache: LintCache,
    options: ExecutorOptions,
    abort: AbortHandle,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("options", &self.options)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Creates an executor with default options.
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>, cache: LintCache) -> Self {
        Self {
            oracle,
            cache,
            options: ExecutorOptions::default(),
            abort: AbortHandle::default(),
        }
    }

    /// Sets scheduling and retry options.
    #[must_use]
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns a handle that cancels this executor's runs.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Returns the cache the executor reads and writes.
    #[must_use]
    pub fn cache(&self) -> &LintCache {
        &self.cache
    }

    /// Runs every task and merges the results.
    ///
    /// A failed task does not stop its siblings unless `fail_fast` is set.
    /// Once early exit trips, tasks not yet started contribute nothing; tasks
    /// already in flight still finish and are merged.
    ///
    /// # Errors
    ///
    /// Returns [`LintFailure::Aborted`] if the run was cancelled, or a cache
    /// error if pending writes cannot be flushed.
    pub async fn run(&self, tasks: Vec<Task>) -> Result<LintReport, LintFailure> {
        info!(
            "Running {} task(s) with concurrency {}",
            tasks.len(),
            self.options.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let stop = Arc::new(AtomicBool::new(false));
        let report = Arc::new(Mutex::new(LintReport {
            result: LintResult::started(),
            ..LintReport::default()
        }));
        let mut set = JoinSet::new();
        let mut not_run = 0;

        for task in tasks {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| LintFailure::Aborted)?;
            if self.abort.is_aborted() {
                break;
            }
            if stop.load(Ordering::SeqCst) {
                not_run += 1;
                continue;
            }

            let this = self.clone();
            let stop = Arc::clone(&stop);
            let report = Arc::clone(&report);
            set.spawn(async move {
                let outcome = this.execute(task).await;

                // The permit is held until the stop flag is settled.
                let mut report = report.lock().await;
                match outcome {
                    Ok(result) => {
                        if this.options.early_exit && !result.lint_errors.is_empty() {
                            debug!("Early exit tripped");
                            stop.store(true, Ordering::SeqCst);
                        }
                        if result.is_skipped() {
                            report.skipped += 1;
                        }
                        report.result.merge_from(result);
                    }
                    Err(err) => {
                        error!("{}", err);
                        if this.options.fail_fast {
                            stop.store(true, Ordering::SeqCst);
                        }
                        report.result.usage += err.usage;
                        report.failures.push(err);
                    }
                }
                drop(permit);
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!("Lint task did not complete: {}", e);
            }
        }

        self.cache.flush().await?;

        if self.abort.is_aborted() {
            warn!("Lint run aborted");
            return Err(LintFailure::Aborted);
        }

        let mut report = std::mem::take(&mut *report.lock().await);
        report.not_run = not_run;
        // Skip markers describe single tasks, not the aggregate.
        report.result.skipped = None;
        report.result.finish();

        let usage = report.result.usage;
        info!(
            "Finished: {} lint error(s), {} failure(s), {} model call(s), {} cached",
            report.result.lint_errors.len(),
            report.failures.len(),
            usage.model_calls,
            usage.model_calls_cached
        );
        Ok(report)
    }

    /// Runs one task with the outer retry around whole attempts.
    ///
    /// Only infrastructure failures are retried here. Validation, parse and
    /// abort failures are final.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskError`] naming the rule and target once the task fails
    /// for good.
    pub async fn execute(&self, task: Task) -> Result<LintResult, TaskError> {
        let mut attempts = 0;
        let mut spent = Usage::default();
        loop {
            attempts += 1;
            match self.attempt(task.clone(), &mut spent).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_infrastructure() && attempts <= self.options.task_retries => {
                    let (rule, target) = (&task.rule.name, &task.target);
                    warn!("Attempt {attempts} for {rule} on {target} failed, retrying: {e}");
                }
                Err(source) => {
                    return Err(TaskError {
                        rule: task.rule.name.to_string(),
                        target: task.target.to_string(),
                        attempts,
                        usage: spent,
                        source,
                    })
                }
            }
        }
    }

    /// One pass through pre-processing and the oracle. Every reply is
    /// accounted in `spent`, which carries over from earlier attempts.
    async fn attempt(&self, task: Task, spent: &mut Usage) -> Result<LintResult, LintFailure> {
        let task = match pre_process(task, &self.cache).await? {
            Stage::Settled(mut result) => {
                result.usage += *spent;
                return Ok(result);
            }
            Stage::Pending(task) => task,
        };

        let mut result = LintResult::started();
        let mut request = OracleRequest {
            model: task.config.model.clone(),
            temperature: task.config.temperature,
            messages: prompt::build_messages(&task.rule, &task.target),
        };

        let mut parse_attempts = 0;
        let candidates = loop {
            if self.abort.is_aborted() {
                return Err(LintFailure::Aborted);
            }
            let reply = self.oracle.invoke(&request).await?;
            *spent += reply_usage(&reply);

            match parse_violations(&reply.text) {
                Ok(candidates) => break candidates,
                Err(e) if parse_attempts < self.options.parse_retries => {
                    parse_attempts += 1;
                    warn!(
                        "Malformed reply for {} on {} ({}/{}): {}",
                        task.rule.name, task.target, parse_attempts, self.options.parse_retries, e
                    );
                    request.messages.push(Message::assistant(reply.text));
                    request.messages.push(prompt::corrective_message(&e));
                }
                Err(e) => return Err(e.into()),
            }
        };

        debug!(
            "{} candidate(s) for {} on {}",
            candidates.len(),
            task.rule.name,
            task.target
        );
        result.lint_errors = filter_candidates(
            candidates,
            &task.target,
            &task.rule,
            &task.config.model,
            task.severity(),
        );
        result.usage = *spent;
        result.finish();

        self.cache.set(&task.cache_key, &result).await?;
        Ok(result)
    }
}

fn reply_usage(reply: &OracleReply) -> Usage {
    Usage {
        model_calls: u64::from(!reply.cached),
        model_calls_cached: u64::from(reply.cached),
        prompt_tokens: reply.usage.prompt_tokens,
        completion_tokens: reply.usage.completion_tokens,
        total_tokens: reply.usage.total_tokens,
        cost: reply.cost,
    }
}
