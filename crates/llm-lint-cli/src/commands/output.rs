//! Shared output formatting for lint reports.

use anyhow::Result;
use llm_lint_core::{LintError, LintErrorDiagnostic, LintReport, Severity, SourceFile, Usage};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::OutputFormat;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    lint_errors: &'a [LintError],
    usage: Usage,
    failures: Vec<String>,
    skipped: usize,
    not_run: usize,
    files_checked: usize,
}

/// Prints a report in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print(report: &LintReport, files: &[Arc<SourceFile>], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(report, files),
        OutputFormat::Json => return print_json(report, files.len()),
        OutputFormat::Compact => print_compact(report),
    }
    Ok(())
}

fn print_text(report: &LintReport, files: &[Arc<SourceFile>]) {
    let by_path: HashMap<&Path, &SourceFile> = files
        .iter()
        .map(|f| (f.relative_path.as_path(), f.as_ref()))
        .collect();

    for error in &report.result.lint_errors {
        let source = error
            .file
            .as_deref()
            .and_then(|p| by_path.get(p))
            .filter(|_| error.location.is_some());
        match source {
            Some(file) => {
                let diagnostic = LintErrorDiagnostic::new(error, &file.content);
                println!("{:?}", miette::Report::new(diagnostic));
                println!("  = model: {}", error.model);
            }
            None => {
                let severity = match error.severity {
                    Severity::Error => "\x1b[31merror\x1b[0m",
                    Severity::Warn => "\x1b[33mwarning\x1b[0m",
                    Severity::Off => "off",
                };
                print!("{severity} {}", error.format());
            }
        }
        println!();
    }

    for failure in &report.failures {
        eprintln!("\x1b[31mfailed\x1b[0m {failure}");
    }

    let (errors, warnings) = report.result.count_by_severity();
    let summary_color = if errors > 0 || !report.failures.is_empty() {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };
    let usage = &report.result.usage;
    println!(
        "{}Found {} error(s), {} warning(s), {} failed task(s) in {} file(s)\x1b[0m",
        summary_color,
        errors,
        warnings,
        report.failures.len(),
        files.len()
    );
    println!(
        "{} model call(s), {} cached, {} token(s), cost {:.4}",
        usage.model_calls, usage.model_calls_cached, usage.total_tokens, usage.cost
    );
}

fn print_json(report: &LintReport, files_checked: usize) -> Result<()> {
    let json = JsonReport {
        lint_errors: &report.result.lint_errors,
        usage: report.result.usage,
        failures: report.failures.iter().map(ToString::to_string).collect(),
        skipped: report.skipped,
        not_run: report.not_run,
        files_checked,
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_compact(report: &LintReport) {
    for error in &report.result.lint_errors {
        println!("{error}");
    }
    for failure in &report.failures {
        eprintln!("{failure}");
    }
}
