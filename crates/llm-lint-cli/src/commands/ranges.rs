//! Ranges command: turns pattern-matcher output into file excerpts.

use anyhow::{Context, Result};
use llm_lint_core::{resolve_partial_files, PartialFile, PatternMatch, SourceFile};
use std::path::{Path, PathBuf};

/// Runs the ranges command.
///
/// Reads a JSON array of matches from `matches_path`, reads every matched
/// file plus `extra_files` under `root`, and prints the excerpts as JSON.
///
/// # Errors
///
/// Returns an error if the match file or a source file cannot be read.
pub fn run(matches_path: &Path, root: &Path, context: usize, extra_files: &[PathBuf]) -> Result<()> {
    let content = std::fs::read_to_string(matches_path)
        .with_context(|| format!("Failed to read matches: {}", matches_path.display()))?;
    let matches: Vec<PatternMatch> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid matches JSON: {}", matches_path.display()))?;

    let partial = resolve(&matches, root, context, extra_files)?;
    println!("{}", serde_json::to_string_pretty(&partial)?);
    Ok(())
}

fn resolve(
    matches: &[PatternMatch],
    root: &Path,
    context: usize,
    extra_files: &[PathBuf],
) -> Result<Vec<PartialFile>> {
    let mut paths: Vec<&Path> = Vec::new();
    for path in matches
        .iter()
        .map(|m| m.source_file.as_path())
        .chain(extra_files.iter().map(PathBuf::as_path))
    {
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    let files = paths
        .into_iter()
        .map(|p| {
            let absolute = root.join(p);
            SourceFile::read(&absolute, root)
                .with_context(|| format!("Failed to read {}", absolute.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(resolve_partial_files(matches, &files, context))
}
