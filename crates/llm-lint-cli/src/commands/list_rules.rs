//! List rules command implementation.

use anyhow::Result;
use std::path::Path;

use crate::config_resolver;

/// Runs the list-rules command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn run(path: &Path, explicit_config: Option<&Path>) -> Result<()> {
    let loaded = config_resolver::load(path, explicit_config)?;
    if loaded.rules.is_empty() {
        println!("No rules defined. Add [[rule]] tables to llm-lint.toml.");
        return Ok(());
    }

    println!("{:<30} {:<8} {:<8} Title", "Name", "Severity", "Scope");
    println!("{}", "-".repeat(80));

    for rule in loaded.rules.iter() {
        let severity = loaded
            .config
            .rule_severity(rule.name.as_str())
            .unwrap_or(rule.severity);
        println!(
            "{:<30} {:<8} {:<8} {}",
            rule.name.as_str(),
            severity.to_string(),
            rule.scope.to_string(),
            rule.title
        );
    }

    if let Some(source) = loaded.source.path() {
        println!("\nRules loaded from {}", source.display());
    }
    println!("\nUse --rules to run a subset, e.g.:");
    println!("  llm-lint check --rules no-console,prefer-fetch");

    Ok(())
}
