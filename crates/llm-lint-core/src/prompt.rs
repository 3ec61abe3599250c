//! Conversation construction for oracle calls.

use crate::oracle::Message;
use crate::response::ParseError;
use crate::rule::{Example, Rule};
use crate::task::TaskTarget;

use std::fmt::Write;

const OUTPUT_FORMAT: &str = r#"# OUTPUT FORMAT

First explain your reasoning under a `# EXPLANATION` header. Then end your reply with a `# VIOLATIONS` header followed by exactly one fenced ```json code block containing an array of objects with these fields:

- `ruleName` (string): the name of the rule being checked
- `codeSnippet` (string, required): the exact offending code copied verbatim from the source
- `codeSnippetSource` ("source" | "examples"): where the snippet was copied from
- `reasoning` (string): why the snippet violates the rule
- `violation` (boolean, required): whether this is a real violation of the rule
- `confidence` ("low" | "medium" | "high", required): how confident you are

Only report code from the source under review, never from the rule's examples. If there are no violations, output an empty array `[]`."#;

/// Builds the initial conversation for a task.
#[must_use]
pub fn build_messages(rule: &Rule, target: &TaskTarget) -> Vec<Message> {
    vec![
        Message::system(system_prompt(rule)),
        Message::user(target_prompt(rule, target)),
    ]
}

/// Builds the follow-up asking the oracle to fix a malformed reply.
#[must_use]
pub fn corrective_message(error: &ParseError) -> Message {
    Message::user(format!(
        "{}\n\nPlease answer again following the output format exactly: end with a \
         `# VIOLATIONS` header and a single ```json code block holding the array of violations.",
        error.message()
    ))
}

fn system_prompt(rule: &Rule) -> String {
    let mut out = String::from(
        "You are an expert senior software engineer reviewing source code for conformance \
         with a single coding rule. Be precise and only report clear violations.\n\n",
    );
    let _ = writeln!(out, "# RULE: {}\n", rule.name);
    let _ = writeln!(out, "## {}\n", rule.title);
    if !rule.description.trim().is_empty() {
        let _ = writeln!(out, "{}\n", rule.description.trim());
    }
    write_examples(&mut out, "### Incorrect code", &rule.negative_examples);
    write_examples(&mut out, "### Correct code", &rule.positive_examples);
    out.push_str(OUTPUT_FORMAT);
    out.push('\n');
    out
}

fn write_examples(out: &mut String, heading: &str, examples: &[Example]) {
    if examples.is_empty() {
        return;
    }
    let _ = writeln!(out, "{heading}\n");
    for example in examples {
        let lang = example.language.as_deref().unwrap_or_default();
        let _ = writeln!(out, "```{lang}\n{}\n```\n", example.code.trim_end());
    }
}

fn target_prompt(rule: &Rule, target: &TaskTarget) -> String {
    match target {
        TaskTarget::File(file) => {
            let lang = file.language.as_deref().unwrap_or_default();
            format!(
                "Check this file for violations of the rule `{}`.\n\nFile: {}\n\n```{lang}\n{}\n```\n",
                rule.name,
                file.relative_path.display(),
                file.content.trim_end()
            )
        }
        TaskTarget::Project { scope, files } => {
            let mut out = format!(
                "Check this {scope} for violations of the rule `{}`. It contains these files:\n\n",
                rule.name
            );
            for path in files.iter() {
                let _ = writeln!(out, "- {}", path.display());
            }
            out
        }
    }
}
