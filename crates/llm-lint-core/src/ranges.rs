//! Turns pattern-match ranges into padded, non-overlapping file excerpts.

use crate::source::SourceFile;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Variable name whose ranges replace the match's own ranges when bound.
pub const MATCH_VARIABLE: &str = "$match";

/// Separator placed between non-contiguous excerpt segments.
pub const GAP_MARKER: &str = "...";

/// A position reported by the pattern matcher (1-indexed line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// 1-indexed line.
    pub line: usize,
    /// Column.
    #[serde(default)]
    pub column: usize,
}

/// A matched span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRange {
    /// First position.
    pub start: Position,
    /// Last position.
    pub end: Position,
}

/// A named capture within a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchVariable {
    /// Variable name, e.g. `$match`.
    pub name: String,
    /// Spans bound to the variable.
    #[serde(default)]
    pub ranges: Vec<MatchRange>,
}

/// One raw match as produced by an external pattern matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    /// File the match was found in.
    pub source_file: PathBuf,
    /// Spans of the match.
    #[serde(default)]
    pub ranges: Vec<MatchRange>,
    /// Named captures.
    #[serde(default)]
    pub variables: Vec<MatchVariable>,
}

impl PatternMatch {
    fn effective_ranges(&self) -> &[MatchRange] {
        self.variables
            .iter()
            .find(|v| v.name == MATCH_VARIABLE && !v.ranges.is_empty())
            .map_or(self.ranges.as_slice(), |v| v.ranges.as_slice())
    }
}

/// Inclusive, 1-indexed line span emitted into an excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    /// First line.
    pub start: usize,
    /// Last line.
    pub end: usize,
}

/// The matched parts of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFile {
    /// File path as given in the file list.
    pub file: PathBuf,
    /// Emitted spans, ascending and disjoint.
    pub ranges: Vec<LineSpan>,
    /// Excerpt text; gaps between spans are marked with [`GAP_MARKER`].
    pub excerpt: String,
}

impl PartialFile {
    /// Returns true if no line of the file was matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Resolves matches into one [`PartialFile`] per entry of `files`, in order.
///
/// Ranges are padded by `context` lines on each side and clamped to the file.
/// Overlapping or adjacent ranges never repeat a line. Files without matches
/// still produce a record with no ranges and an empty excerpt. Matches for
/// files absent from `files` are ignored with a warning.
#[must_use]
pub fn resolve_partial_files(
    matches: &[PatternMatch],
    files: &[SourceFile],
    context: usize,
) -> Vec<PartialFile> {
    let mut grouped: HashMap<&Path, Vec<(usize, usize)>> = HashMap::new();
    for m in matches {
        let Some(file) = find_file(files, &m.source_file) else {
            warn!("Ignoring match in unknown file {}", m.source_file.display());
            continue;
        };
        grouped
            .entry(file.path.as_path())
            .or_default()
            .extend(m.effective_ranges().iter().map(|r| (r.start.line, r.end.line)));
    }

    files
        .iter()
        .map(|file| {
            let spans = grouped.remove(file.path.as_path()).unwrap_or_default();
            excerpt(file, spans, context)
        })
        .collect()
}

fn find_file<'a>(files: &'a [SourceFile], path: &Path) -> Option<&'a SourceFile> {
    files
        .iter()
        .find(|f| f.path == path || f.relative_path == path)
}

fn excerpt(file: &SourceFile, mut spans: Vec<(usize, usize)>, context: usize) -> PartialFile {
    spans.sort_unstable();
    let lines: Vec<&str> = file.content.lines().collect();

    // 0-based exclusive index of the last emitted line.
    let mut watermark = 0;
    let mut ranges: Vec<LineSpan> = Vec::new();
    let mut pieces: Vec<&str> = Vec::new();

    for (start, end) in spans {
        let padded_start = watermark.max(start.saturating_sub(1 + context));
        let padded_end = (end + context).min(lines.len());
        if padded_start >= padded_end {
            continue;
        }

        match ranges.last_mut() {
            Some(last) if last.end == padded_start => last.end = padded_end,
            Some(_) => {
                pieces.push(GAP_MARKER);
                ranges.push(LineSpan {
                    start: padded_start + 1,
                    end: padded_end,
                });
            }
            None => ranges.push(LineSpan {
                start: padded_start + 1,
                end: padded_end,
            }),
        }
        pieces.extend_from_slice(&lines[padded_start..padded_end]);
        watermark = watermark.max(padded_end);
    }

    PartialFile {
        file: file.relative_path.clone(),
        ranges,
        excerpt: pieces.join("\n"),
    }
}
