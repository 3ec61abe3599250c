//! End-to-end pipeline tests with a scripted oracle.

use async_trait::async_trait;
use llm_lint_core::{
    frame_all, load_rules_from_toml, Config, Executor, ExecutorOptions, LintCache, LintError,
    Oracle, OracleError, OracleReply, OracleRequest, Severity, SourceFile, TokenUsage,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const RULES: &str = r#"
[[rule]]
name = "no-console"
title = "Avoid console logging"
description = "Use the project logger instead of console methods."
languages = ["javascript"]

[[rule.negative]]
code = "function f() {\n  console.error('bad example');\n}"
language = "javascript"

[[rule.positive]]
code = "logger.info('ok')"
language = "javascript"
"#;

const NO_CONSOLE_REPLY: &str = r#"# EXPLANATION

The file calls `console.log` directly.

# VIOLATIONS

```json
[
  {
    "ruleName": "no-console",
    "codeSnippet": "console.log('x')",
    "codeSnippetSource": "source",
    "reasoning": "Direct console call.",
    "violation": true,
    "confidence": "high"
  }
]
```
"#;

struct ScriptedOracle {
    replies: Mutex<VecDeque<OracleReply>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .iter()
                    .map(|text| OracleReply {
                        text: (*text).to_string(),
                        usage: TokenUsage {
                            prompt_tokens: 100,
                            completion_tokens: 20,
                            total_tokens: 120,
                        },
                        cost: 0.01,
                        cached: false,
                    })
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn invoke(&self, _request: &OracleRequest) -> Result<OracleReply, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| OracleError::Transport("script exhausted".to_string()))
    }
}

fn js_file(path: &str, content: &str) -> Arc<SourceFile> {
    Arc::new(SourceFile::new(
        PathBuf::from("/project").join(path),
        PathBuf::from(path),
        content,
        Some("javascript".to_string()),
    ))
}

fn sorted(mut errors: Vec<LintError>) -> Vec<LintError> {
    errors.sort_by(|a, b| a.file.cmp(&b.file).then(a.code_snippet.cmp(&b.code_snippet)));
    errors
}

#[tokio::test]
async fn warm_cache_reproduces_result_without_oracle_calls() {
    let config = Config::default();
    let rules = load_rules_from_toml(RULES, None).unwrap();
    let files = vec![js_file("src/app.js", "const a = 1;\nconsole.log('x')\n")];
    let cache = LintCache::memory();

    let oracle = ScriptedOracle::new(&[NO_CONSOLE_REPLY]);
    let executor = Executor::new(oracle.clone(), cache.clone());

    let first = executor
        .run(frame_all(&files, &rules, &config))
        .await
        .unwrap();
    assert!(first.failures.is_empty());
    assert_eq!(first.result.lint_errors.len(), 1);
    assert_eq!(first.result.lint_errors[0].rule, "no-console");
    assert_eq!(first.result.lint_errors[0].severity, Severity::Error);
    assert_eq!(first.result.usage.model_calls, 1);
    assert_eq!(first.result.usage.total_tokens, 120);
    assert_eq!(oracle.calls(), 1);

    let second = executor
        .run(frame_all(&files, &rules, &config))
        .await
        .unwrap();
    assert_eq!(oracle.calls(), 1);
    assert_eq!(second.result.usage.model_calls, 0);
    assert_eq!(second.result.usage.model_calls_cached, 1);
    assert_eq!(second.skipped, 1);
    assert_eq!(
        sorted(second.result.lint_errors),
        sorted(first.result.lint_errors)
    );
}

#[tokio::test]
async fn warm_cache_reports_current_severity() {
    let rules = load_rules_from_toml(RULES, None).unwrap();
    let files = vec![js_file("src/app.js", "console.log('x')\n")];
    let oracle = ScriptedOracle::new(&[NO_CONSOLE_REPLY]);
    let executor = Executor::new(oracle.clone(), LintCache::memory());

    let first = executor
        .run(frame_all(&files, &rules, &Config::default()))
        .await
        .unwrap();
    assert_eq!(first.result.lint_errors[0].severity, Severity::Error);
    assert!(!first.is_clean());

    let mut config = Config::default();
    config.rules.insert("no-console".to_string(), Severity::Warn);
    let second = executor
        .run(frame_all(&files, &rules, &config))
        .await
        .unwrap();
    assert_eq!(oracle.calls(), 1);
    assert_eq!(second.result.usage.model_calls_cached, 1);
    assert_eq!(second.result.lint_errors[0].severity, Severity::Warn);
    assert!(second.is_clean());
}

#[tokio::test]
async fn persistent_cache_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let rules = load_rules_from_toml(RULES, None).unwrap();
    let files = vec![js_file("src/app.js", "console.log('x')\n")];

    let oracle = ScriptedOracle::new(&[NO_CONSOLE_REPLY]);
    let cache = LintCache::open(dir.path(), false).await.unwrap();
    Executor::new(oracle.clone(), cache)
        .run(frame_all(&files, &rules, &config))
        .await
        .unwrap();
    assert!(dir.path().join("cache.json").exists());

    let reopened = LintCache::open(dir.path(), false).await.unwrap();
    let report = Executor::new(oracle.clone(), reopened)
        .run(frame_all(&files, &rules, &config))
        .await
        .unwrap();
    assert_eq!(oracle.calls(), 1);
    assert_eq!(report.result.lint_errors.len(), 1);
}

#[tokio::test]
async fn echoed_example_and_low_confidence_are_filtered() {
    let reply = r#"```json
[
  {"codeSnippet": "console.error('bad example');", "violation": true, "confidence": "high"},
  {"codeSnippet": "console.log('x')", "violation": true, "confidence": "medium"}
]
```"#;
    let rules = load_rules_from_toml(RULES, None).unwrap();
    let files = vec![js_file("a.js", "console.log('x')\n")];
    let oracle = ScriptedOracle::new(&[reply]);

    let report = Executor::new(oracle, LintCache::memory())
        .run(frame_all(&files, &rules, &Config::default()))
        .await
        .unwrap();
    assert!(report.result.lint_errors.is_empty());
    assert!(report.is_clean());
}

#[tokio::test]
async fn parse_retry_recovers_within_budget() {
    let rules = load_rules_from_toml(RULES, None).unwrap();
    let files = vec![js_file("a.js", "console.log('x')\n")];
    let oracle = ScriptedOracle::new(&["I think it is fine.", NO_CONSOLE_REPLY]);

    let report = Executor::new(oracle.clone(), LintCache::memory())
        .run(frame_all(&files, &rules, &Config::default()))
        .await
        .unwrap();
    assert_eq!(oracle.calls(), 2);
    assert_eq!(report.result.usage.model_calls, 2);
    assert_eq!(report.result.lint_errors.len(), 1);
}

#[tokio::test]
async fn skipped_tasks_do_not_call_oracle() {
    let mut config = Config::default();
    config.rules.insert("no-console".to_string(), Severity::Off);
    let rules = load_rules_from_toml(RULES, None).unwrap();
    let files = vec![
        js_file("empty.js", "\n\n"),
        js_file("off.js", "console.log('x')\n"),
    ];
    let oracle = ScriptedOracle::new(&[]);

    let report = Executor::new(oracle.clone(), LintCache::memory())
        .run(frame_all(&files, &rules, &config))
        .await
        .unwrap();
    assert_eq!(oracle.calls(), 0);
    assert_eq!(report.skipped, 2);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn inline_disable_is_cached() {
    let rules = load_rules_from_toml(RULES, None).unwrap();
    let files = vec![js_file("a.js", "// llm-lint-disable\nconsole.log('x')\n")];
    let cache = LintCache::memory();
    let oracle = ScriptedOracle::new(&[]);
    let executor = Executor::new(oracle.clone(), cache);

    executor
        .run(frame_all(&files, &rules, &Config::default()))
        .await
        .unwrap();
    let second = executor
        .run(frame_all(&files, &rules, &Config::default()))
        .await
        .unwrap();
    assert_eq!(oracle.calls(), 0);
    assert_eq!(second.result.usage.model_calls_cached, 1);
}

#[tokio::test]
async fn inline_severity_override_applies_to_errors() {
    let rules = load_rules_from_toml(RULES, None).unwrap();
    let files = vec![js_file(
        "a.js",
        "/* llm-lint: no-console: warn */\nconsole.log('x')\n",
    )];
    let oracle = ScriptedOracle::new(&[NO_CONSOLE_REPLY]);

    let report = Executor::new(oracle, LintCache::memory())
        .run(frame_all(&files, &rules, &Config::default()))
        .await
        .unwrap();
    assert_eq!(report.result.lint_errors.len(), 1);
    assert_eq!(report.result.lint_errors[0].severity, Severity::Warn);
    assert!(report.is_clean());
    assert_eq!(report.result.count_by_severity(), (0, 1));
}

#[tokio::test]
async fn early_exit_skips_remaining_tasks() {
    let mut config = Config::default();
    config.linter.early_exit = true;
    config.linter.concurrency = 1;
    let rules = load_rules_from_toml(RULES, None).unwrap();
    let files = vec![
        js_file("a.js", "console.log('x')\n"),
        js_file("b.js", "console.log('x')\n"),
        js_file("c.js", "console.log('x')\n"),
    ];
    let oracle = ScriptedOracle::new(&[NO_CONSOLE_REPLY, NO_CONSOLE_REPLY, NO_CONSOLE_REPLY]);

    let report = Executor::new(oracle.clone(), LintCache::memory())
        .with_options(ExecutorOptions::from_config(&config))
        .run(frame_all(&files, &rules, &config))
        .await
        .unwrap();
    assert_eq!(oracle.calls(), 1);
    assert_eq!(report.not_run, 2);
}

#[tokio::test]
async fn exhausted_retries_surface_task_error() {
    let rules = load_rules_from_toml(RULES, None).unwrap();
    let files = vec![js_file("src/a.js", "console.log('x')\n")];
    // Three malformed replies exhaust the re-prompt budget.
    let oracle = ScriptedOracle::new(&["nope", "still nope", "never"]);

    let report = Executor::new(oracle.clone(), LintCache::memory())
        .run(frame_all(&files, &rules, &Config::default()))
        .await
        .unwrap();
    assert_eq!(oracle.calls(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].usage.model_calls, 3);
    assert_eq!(report.result.usage.model_calls, 3);
    assert_eq!(report.result.usage.total_tokens, 360);
    let message = report.failures[0].to_string();
    assert!(message.contains("no-console"));
    assert!(message.contains("src/a.js"));
}
