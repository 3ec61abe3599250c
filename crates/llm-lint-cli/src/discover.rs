//! File discovery honouring `.gitignore` and the configured globs.

use anyhow::{Context, Result};
use llm_lint_core::{GlobPattern, SourceFile};
use std::path::Path;
use std::sync::Arc;

/// Walks `root` and reads every text file selected by `include`/`exclude`.
///
/// Globs match paths relative to `root`. An empty `include` selects all
/// files. Files that are not valid UTF-8 are skipped.
///
/// # Errors
///
/// Returns an error for invalid glob patterns or walk failures.
pub fn discover(root: &Path, include: &[String], exclude: &[String]) -> Result<Vec<Arc<SourceFile>>> {
    let include = compile(include)?;
    let exclude = compile(exclude)?;

    let mut builder = ignore::WalkBuilder::new(root);
    builder.hidden(false).git_ignore(true);

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude.iter().any(|g| g.matches(relative)) {
            continue;
        }
        if !include.is_empty() && !include.iter().any(|g| g.matches(relative)) {
            continue;
        }

        match SourceFile::read(path, root) {
            Ok(file) => files.push(Arc::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::debug!("Skipping non-text file {}", path.display());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        }
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tracing::debug!("Discovered {} file(s) under {}", files.len(), root.display());
    Ok(files)
}

fn compile(patterns: &[String]) -> Result<Vec<GlobPattern>> {
    patterns
        .iter()
        .map(|p| GlobPattern::new(p).with_context(|| format!("Invalid glob pattern `{p}`")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::create_dir_all(tmp.path().join("node_modules/lib")).unwrap();
        fs::write(tmp.path().join("src/app.js"), "console.log('x')\n").unwrap();
        fs::write(tmp.path().join("src/util.ts"), "export const a = 1;\n").unwrap();
        fs::write(tmp.path().join("node_modules/lib/index.js"), "x\n").unwrap();
        fs::write(tmp.path().join("image.bin"), [0xff, 0xfe, 0x00, 0x81]).unwrap();
        tmp
    }

    fn relative(files: &[Arc<SourceFile>]) -> Vec<PathBuf> {
        files.iter().map(|f| f.relative_path.clone()).collect()
    }

    #[test]
    fn excludes_and_skips_binary_files() {
        let tmp = tree();
        let files = discover(tmp.path(), &[], &["**/node_modules/**".to_string()]).unwrap();
        assert_eq!(
            relative(&files),
            vec![PathBuf::from("src/app.js"), PathBuf::from("src/util.ts")]
        );
        assert_eq!(files[0].language.as_deref(), Some("javascript"));
    }

    #[test]
    fn include_narrows_selection() {
        let tmp = tree();
        let files = discover(tmp.path(), &["src/*.ts".to_string()], &[]).unwrap();
        assert_eq!(relative(&files), vec![PathBuf::from("src/util.ts")]);
    }

    #[test]
    fn invalid_glob_is_reported() {
        let tmp = tree();
        let err = discover(tmp.path(), &["[".to_string()], &[]).unwrap_err();
        assert!(err.to_string().contains("Invalid glob pattern"));
    }
}
