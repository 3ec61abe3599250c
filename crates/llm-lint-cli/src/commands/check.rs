//! Check command implementation.

use anyhow::{bail, Context, Result};
use llm_lint_core::{frame_all, Executor, ExecutorOptions, LintCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config_resolver;
use crate::discover::discover;
use crate::oracle_cmd::CommandOracle;
use crate::OutputFormat;

/// Command-line settings that override the config file.
#[derive(Debug, Clone, Default)]
pub struct CheckArgs {
    /// Project root.
    pub path: PathBuf,
    /// Output format.
    pub format: OutputFormat,
    /// Comma-separated rule names to run.
    pub rules: Option<String>,
    /// Extra exclude globs.
    pub exclude: Vec<String>,
    /// Keep the cache in memory only.
    pub no_cache: bool,
    /// Stop after the first violation.
    pub early_exit: bool,
    /// Serialize tasks.
    pub debug: bool,
    /// Worker count override.
    pub concurrency: Option<usize>,
}

/// Runs the check command. Returns `true` if the project is clean.
///
/// # Errors
///
/// Returns an error for invalid configuration, a missing oracle command,
/// cache I/O failures or cancellation.
pub async fn run(args: CheckArgs, explicit_config: Option<&Path>) -> Result<bool> {
    let loaded = config_resolver::load(&args.path, explicit_config)?;
    let mut config = loaded.config;
    config.linter.no_cache |= args.no_cache;
    config.linter.early_exit |= args.early_exit;
    config.linter.debug |= args.debug;
    if let Some(concurrency) = args.concurrency {
        config.linter.concurrency = concurrency.max(1);
    }

    let rules = match &args.rules {
        Some(filter) => {
            let names: Vec<&str> = filter.split(',').map(str::trim).collect();
            for name in names.iter().filter(|n| loaded.rules.get(n).is_none()) {
                tracing::warn!("Unknown rule: {}", name);
            }
            loaded.rules.retain_named(&names)
        }
        None => loaded.rules,
    };
    if rules.is_empty() {
        bail!("No rules to run. Define [[rule]] tables in llm-lint.toml (see `llm-lint init`).");
    }

    let oracle = CommandOracle::new(&config.llm.command, config.llm.timeout_secs)
        .context("No oracle configured. Set [llm].command in llm-lint.toml.")?;

    let cache_dir = if config.linter.cache_dir.is_absolute() {
        config.linter.cache_dir.clone()
    } else {
        args.path.join(&config.linter.cache_dir)
    };

    let mut exclude = config.linter.exclude.clone();
    exclude.extend(args.exclude);
    if config.linter.cache_dir.is_relative() {
        exclude.push(format!("{}/**", config.linter.cache_dir.display()));
    }
    let files = discover(&args.path, &config.linter.include, &exclude)?;

    let tasks = frame_all(&files, &rules, &config);
    tracing::info!(
        "Checking {} file(s) against {} rule(s): {} task(s)",
        files.len(),
        rules.len(),
        tasks.len()
    );

    let cache = LintCache::open(&cache_dir, config.linter.no_cache)
        .await
        .with_context(|| format!("Failed to open cache: {}", cache_dir.display()))?;
    let executor = Executor::new(Arc::new(oracle), cache.clone())
        .with_options(ExecutorOptions::from_config(&config));

    let abort = executor.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, waiting for in-flight tasks");
            abort.abort();
        }
    });
    let outcome = executor.run(tasks).await;
    interrupt.abort();

    cache.flush().await.context("Failed to write cache")?;
    let report = outcome.context("Lint run failed")?;

    super::output::print(&report, &files, args.format)?;
    Ok(report.is_clean())
}
