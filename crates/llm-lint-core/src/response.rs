//! Extraction of candidate violations from free-form oracle replies.
//!
//! A reply is expected to be markdown. With a single fenced code block that
//! block is the payload. With several, the reply must be split by level-1
//! headers and the payload is taken from the last header mentioning
//! "violation". Every failure is a [`ParseError`] whose message is precise
//! enough to be sent back to the oracle as a correction request.

use crate::types::ViolationCandidate;

use jsonschema::{Draft, Validator};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};
use serde_json::Value;
use std::sync::OnceLock;

const VIOLATIONS_SCHEMA: &str = r#"{
  "type": "array",
  "items": {
    "type": "object",
    "required": ["codeSnippet", "violation", "confidence"],
    "properties": {
      "ruleName": { "type": ["string", "null"] },
      "codeSnippet": { "type": "string", "pattern": "\\S" },
      "codeSnippetSource": { "enum": ["examples", "source", null] },
      "reasoning": { "type": ["string", "null"] },
      "violation": { "type": "boolean" },
      "confidence": { "enum": ["low", "medium", "high"] }
    }
  }
}"#;

/// A malformed oracle reply. Always retryable by re-prompting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Diagnostic describing what was malformed.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The parts of a reply the parser cares about, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    /// Level-1 heading, ATX or setext.
    Header(String),
    /// Fenced code block with its lowercased language tag.
    Code { lang: Option<String>, body: String },
}

fn blocks(raw: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;

    for event in Parser::new(raw) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => current = Some(Block::Header(String::new())),
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                current = Some(Block::Code {
                    lang: info.split_whitespace().next().map(str::to_ascii_lowercase),
                    body: String::new(),
                });
            }
            Event::Text(text) | Event::Code(text) => match &mut current {
                Some(Block::Header(heading)) => heading.push_str(&text),
                Some(Block::Code { body, .. }) => body.push_str(&text),
                None => {}
            },
            Event::End(TagEnd::Heading(HeadingLevel::H1) | TagEnd::CodeBlock) => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }

    blocks
}

/// Parses a raw oracle reply into candidate violations.
///
/// # Errors
///
/// Returns a [`ParseError`] if no payload block can be identified or the
/// payload does not match the violation-list schema.
pub fn parse_violations(raw: &str) -> Result<Vec<ViolationCandidate>, ParseError> {
    let blocks = blocks(raw);
    let code_blocks: Vec<&Block> = blocks
        .iter()
        .filter(|b| matches!(b, Block::Code { .. }))
        .collect();

    match code_blocks.as_slice() {
        [] => Err(ParseError::new(
            "Invalid output: missing VIOLATIONS code block. The reply must end with a \
             `# VIOLATIONS` header followed by a fenced ```json code block containing \
             an array of violations.",
        )),
        [only] => decode_block(only),
        _ => parse_sectioned(&blocks),
    }
}

fn parse_sectioned(blocks: &[Block]) -> Result<Vec<ViolationCandidate>, ParseError> {
    let headers: Vec<(usize, &str)> = blocks
        .iter()
        .enumerate()
        .filter_map(|(i, b)| match b {
            Block::Header(text) => Some((i, text.as_str())),
            Block::Code { .. } => None,
        })
        .collect();

    if headers.is_empty() {
        return Err(ParseError::new(
            "Invalid output: found multiple code blocks but no level-1 markdown headers. \
             Put the violations array in a single ```json code block under a \
             `# VIOLATIONS` header.",
        ));
    }

    let Some(pos) = headers
        .iter()
        .rposition(|(_, text)| text.to_ascii_lowercase().contains("violation"))
    else {
        return Err(ParseError::new(
            "Invalid output: missing `# VIOLATIONS` header. Put the violations array in a \
             single ```json code block under a `# VIOLATIONS` header.",
        ));
    };

    let start = headers[pos].0 + 1;
    let end = headers.get(pos + 1).map_or(blocks.len(), |(i, _)| *i);
    let candidates: Vec<&Block> = blocks[start..end].iter().collect();
    select_block(&candidates)
}

fn select_block(candidates: &[&Block]) -> Result<Vec<ViolationCandidate>, ParseError> {
    match candidates {
        [] => {
            return Err(ParseError::new(
                "Invalid output: missing code block under the `# VIOLATIONS` header. \
                 Put the violations array in a ```json code block directly under it.",
            ))
        }
        [only] => return decode_block(only),
        _ => {}
    }

    let json_tagged: Vec<&Block> = candidates
        .iter()
        .copied()
        .filter(|b| matches!(b, Block::Code { lang: Some(lang), .. } if lang == "json"))
        .collect();
    if let [only] = json_tagged.as_slice() {
        return decode_block(only);
    }

    let mut valid = candidates.iter().filter_map(|b| decode_block(b).ok());
    if let (Some(parsed), None) = (valid.next(), valid.next()) {
        return Ok(parsed);
    }

    Err(ParseError::new(format!(
        "Invalid output: found {} code blocks under the `# VIOLATIONS` header and could not \
         tell which one holds the violations. Output exactly one ```json code block there.",
        candidates.len()
    )))
}

fn decode_block(block: &Block) -> Result<Vec<ViolationCandidate>, ParseError> {
    let Block::Code { body, .. } = block else {
        return Err(ParseError::new("Invalid output: expected a code block."));
    };
    decode(body)
}

fn decode(body: &str) -> Result<Vec<ViolationCandidate>, ParseError> {
    let value: Value = serde_json::from_str(body.trim()).map_err(|e| {
        ParseError::new(format!(
            "Invalid output: the VIOLATIONS code block is not valid JSON: {e}"
        ))
    })?;
    validate(&value).map_err(|detail| {
        ParseError::new(format!(
            "Invalid output: the VIOLATIONS code block does not match the expected schema: {detail}"
        ))
    })?;
    serde_json::from_value(value).map_err(|e| {
        ParseError::new(format!(
            "Invalid output: the VIOLATIONS code block does not match the expected schema: {e}"
        ))
    })
}

fn schema() -> Result<&'static Validator, String> {
    static VALIDATOR: OnceLock<Result<Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let schema: Value =
                serde_json::from_str(VIOLATIONS_SCHEMA).map_err(|e| e.to_string())?;
            jsonschema::options()
                .with_draft(Draft::Draft202012)
                .build(&schema)
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Checks the violation-list schema, returning every diagnostic with its path.
fn validate(value: &Value) -> Result<(), String> {
    let errors: Vec<String> = schema()?
        .iter_errors(value)
        .map(|err| {
            format!(
                "{}: {err}",
                field_path(&err.instance_path.to_string())
            )
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// Renders a JSON pointer such as `/0/confidence` as `violations[0].confidence`.
fn field_path(pointer: &str) -> String {
    let mut path = String::from("violations");
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        if segment.bytes().all(|b| b.is_ascii_digit()) {
            path.push('[');
            path.push_str(segment);
            path.push(']');
        } else {
            path.push('.');
            path.push_str(&segment.replace("~1", "/").replace("~0", "~"));
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, SnippetSource};

    const ONE_VIOLATION: &str = r#"[{"ruleName":"no-console","codeSnippet":"console.log('x')","codeSnippetSource":"source","reasoning":"logs to console","violation":true,"confidence":"high"}]"#;

    #[test]
    fn single_block_with_empty_array() {
        let reply = "Looks clean.\n\n```json\n[]\n```\n";
        assert_eq!(parse_violations(reply), Ok(vec![]));
    }

    #[test]
    fn single_untagged_block_is_payload() {
        let reply = format!("```\n{ONE_VIOLATION}\n```");
        let parsed = parse_violations(&reply).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].confidence, Confidence::High);
        assert_eq!(parsed[0].code_snippet_source, Some(SnippetSource::Source));
    }

    #[test]
    fn zero_blocks_is_retryable_error() {
        let err = parse_violations("I found no problems.").unwrap_err();
        assert!(err.message().contains("missing VIOLATIONS code block"));
    }

    #[test]
    fn explanation_and_violations_sections() {
        let reply = format!(
            "# Explanation\n\nThe file logs to the console.\n\n# Violations\n\n```json\n{ONE_VIOLATION}\n```\n"
        );
        let parsed = parse_violations(&reply).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].rule_name.as_deref(), Some("no-console"));
        assert_eq!(parsed[0].code_snippet, "console.log('x')");
    }

    #[test]
    fn multiple_blocks_without_headers_fail() {
        let reply = "```js\nconsole.log('x')\n```\n\n```json\n[]\n```\n";
        let err = parse_violations(reply).unwrap_err();
        assert!(err.message().contains("no level-1 markdown headers"));
    }

    #[test]
    fn multiple_blocks_without_violations_header_fail() {
        let reply = "# Explanation\n```js\nx\n```\n# Summary\n```json\n[]\n```\n";
        let err = parse_violations(reply).unwrap_err();
        assert!(err.message().contains("missing `# VIOLATIONS` header"));
    }

    #[test]
    fn last_violations_header_wins() {
        let reply = format!(
            "# Potential violations\n```js\nconsole.log('x')\n```\n# VIOLATIONS\n```json\n{ONE_VIOLATION}\n```\n"
        );
        let parsed = parse_violations(&reply).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn violations_section_stops_at_next_header() {
        let reply = "# VIOLATIONS\n```json\n[]\n```\n# Notes\n```js\nconsole.log('x')\n```\n";
        assert_eq!(parse_violations(reply), Ok(vec![]));
    }

    #[test]
    fn json_tagged_block_preferred_in_section() {
        let reply = format!(
            "# Explanation\n```js\nx\n```\n# VIOLATIONS\n```js\nconsole.log('x')\n```\n```json\n{ONE_VIOLATION}\n```\n"
        );
        assert_eq!(parse_violations(&reply).unwrap().len(), 1);
    }

    #[test]
    fn uniquely_valid_block_preferred_when_untagged() {
        let reply = format!(
            "# Explanation\n```\nx\n```\n# VIOLATIONS\n```\nnot json\n```\n```\n{ONE_VIOLATION}\n```\n"
        );
        assert_eq!(parse_violations(&reply).unwrap().len(), 1);
    }

    #[test]
    fn ambiguous_blocks_fail() {
        let reply = "# Explanation\n```\nx\n```\n# VIOLATIONS\n```\n[]\n```\n```\n[]\n```\n";
        let err = parse_violations(reply).unwrap_err();
        assert!(err.message().contains("found 2 code blocks"));
    }

    #[test]
    fn empty_violations_section_fails() {
        let reply = "# Explanation\n```js\nx\n```\n```js\ny\n```\n# VIOLATIONS\nNone.\n";
        let err = parse_violations(reply).unwrap_err();
        assert!(err.message().contains("missing code block under"));
    }

    #[test]
    fn invalid_json_reports_serde_error() {
        let err = parse_violations("```json\n[{]\n```").unwrap_err();
        assert!(err.message().contains("not valid JSON"));
    }

    #[test]
    fn schema_errors_name_the_field() {
        let cases = [
            (r#"{"a":1}"#, "violations: "),
            (r#"[1]"#, "violations[0]: "),
            (r#"[{"violation":true,"confidence":"high"}]"#, "codeSnippet"),
            (r#"[{"codeSnippet":" ","violation":true,"confidence":"high"}]"#, "violations[0].codeSnippet: "),
            (r#"[{"codeSnippet":"x","violation":"yes","confidence":"high"}]"#, "violations[0].violation: "),
            (r#"[{"codeSnippet":"x","violation":true,"confidence":"certain"}]"#, "violations[0].confidence: "),
            (r#"[{"codeSnippet":"x","violation":true,"confidence":"high","codeSnippetSource":"file"}]"#, "violations[0].codeSnippetSource: "),
            (r#"[{"codeSnippet":"x","violation":true,"confidence":"high"},{"codeSnippet":"y","violation":true,"confidence":"high","reasoning":5}]"#, "violations[1].reasoning: "),
        ];
        for (payload, expected) in cases {
            let err = parse_violations(&format!("```json\n{payload}\n```")).unwrap_err();
            assert!(err.message().contains("does not match the expected schema"));
            assert!(
                err.message().contains(expected),
                "{payload}: {} does not contain {expected}",
                err.message()
            );
        }
    }

    #[test]
    fn every_schema_error_is_reported() {
        let payload = r#"[{"codeSnippet":"x","violation":"yes","confidence":"certain"}]"#;
        let err = parse_violations(&format!("```json\n{payload}\n```")).unwrap_err();
        assert!(err.message().contains("violations[0].violation: "));
        assert!(err.message().contains("violations[0].confidence: "));
    }

    #[test]
    fn field_path_renders_pointer() {
        assert_eq!(field_path(""), "violations");
        assert_eq!(field_path("/3/codeSnippet"), "violations[3].codeSnippet");
    }

    #[test]
    fn setext_headers_split_sections() {
        let reply = "Explanation\n===\n\n```js\nconsole.log('x')\n```\n\nViolations\n===\n\n```json\n[]\n```\n";
        assert_eq!(parse_violations(reply), Ok(vec![]));
    }

    #[test]
    fn headings_inside_code_are_not_headers() {
        let reply = "# Explanation\n```python\n# VIOLATIONS\nprint(1)\n```\n```json\n[]\n```\n";
        let err = parse_violations(reply).unwrap_err();
        assert!(err.message().contains("missing `# VIOLATIONS` header"));
    }

    #[test]
    fn level_two_headers_do_not_split() {
        let reply = "# Explanation\n```js\nx\n```\n# VIOLATIONS\n## Details\n```json\n[]\n```\n";
        assert_eq!(parse_violations(reply), Ok(vec![]));
    }

    #[test]
    fn tilde_fence_and_unterminated_fence() {
        assert_eq!(parse_violations("~~~json\n[]\n~~~\n"), Ok(vec![]));
        assert_eq!(parse_violations("```json\n[]"), Ok(vec![]));
    }

    #[test]
    fn null_optional_fields_accepted() {
        let payload = r#"[{"codeSnippet":"x","violation":false,"confidence":"low","ruleName":null,"codeSnippetSource":null}]"#;
        let parsed = parse_violations(&format!("```json\n{payload}\n```")).unwrap();
        assert_eq!(parsed[0].rule_name, None);
        assert!(!parsed[0].violation);
    }
}
