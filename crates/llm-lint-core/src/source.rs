//! Source files as consumed by the pipeline.

use std::path::{Path, PathBuf};

/// A file to lint. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Path relative to the working root.
    pub relative_path: PathBuf,
    /// Base name of the file.
    pub file_name: String,
    /// Raw text content.
    pub content: String,
    /// Detected language tag (e.g., "typescript").
    pub language: Option<String>,
}

impl SourceFile {
    /// Creates a file record from already-read content.
    #[must_use]
    pub fn new(
        path: PathBuf,
        relative_path: PathBuf,
        content: impl Into<String>,
        language: Option<String>,
    ) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            relative_path,
            file_name,
            content: content.into(),
            language,
        }
    }

    /// Reads a file from disk, detecting its language from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read as UTF-8 text.
    pub fn read(path: &Path, root: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let relative_path = path
            .strip_prefix(root)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf);
        let language = detect_language(path).map(String::from);
        Ok(Self::new(path.to_path_buf(), relative_path, content, language))
    }

    /// Returns true if the content is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Detects a language tag from a file extension.
#[must_use]
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let language = match ext.as_str() {
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "mts" | "cts" | "tsx" => "typescript",
        "rs" => "rust",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "rb" => "ruby",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "php" => "php",
        "sh" | "bash" => "shell",
        "md" | "mdx" => "markdown",
        "json" => "json",
        "toml" => "toml",
        "yml" | "yaml" => "yaml",
        "html" | "htm" => "html",
        "css" | "scss" => "css",
        "sql" => "sql",
        _ => return None,
    };
    Some(language)
}
