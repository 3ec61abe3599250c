//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# llm-lint configuration

[llm]
model = "gpt-4o-mini"
temperature = 0.0
# Command that reads an oracle request as JSON on stdin and prints the reply
# as JSON on stdout.
command = ["llm-oracle"]
timeout_secs = 120

[linter]
concurrency = 16
early_exit = false
cache_dir = ".llm-lint-cache"
parse_retries = 2
task_retries = 2
# include = ["src/**"]
exclude = [
    "**/node_modules/**",
    "**/target/**",
    "**/.git/**",
]

# Per-rule severity overrides: off, warn or error
[rules]
# no-console = "warn"

[[rule]]
name = "no-console"
title = "Avoid console logging"
description = """
Application code must log through the project logger instead of calling
console methods directly.
"""
languages = ["javascript", "typescript"]

[[rule.negative]]
code = "console.log('user created', user.id);"
language = "javascript"

[[rule.positive]]
code = "logger.info('user created', { id: user.id });"
language = "javascript"
"#;

/// Runs the init command.
///
/// # Errors
///
/// Returns an error if a config already exists and `force` is not set, or the
/// file cannot be written.
pub fn run(force: bool) -> Result<()> {
    let config_path = Path::new("llm-lint.toml");

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;

    println!("Created llm-lint.toml");
    println!("\nNext steps:");
    println!("  1. Set [llm].command to your oracle command");
    println!("  2. Describe your rules as [[rule]] tables");
    println!("  3. Run: llm-lint check");

    Ok(())
}
