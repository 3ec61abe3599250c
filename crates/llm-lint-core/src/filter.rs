//! False-positive suppression for oracle-reported violations.

use crate::rule::Rule;
use crate::task::TaskTarget;
use crate::types::{Confidence, LintError, Location, Severity, SnippetSource, ViolationCandidate};

use tracing::{debug, warn};

/// Decides whether a candidate is likely a false positive.
///
/// A candidate is discarded if any of these hold:
/// - the oracle did not flag it as a violation
/// - confidence is below `high`
/// - the snippet is attributed to the rule's examples rather than the source
/// - the echoed rule name differs from the rule being evaluated
/// - the snippet appears verbatim in one of the rule's incorrect examples
#[must_use]
pub fn is_false_positive(candidate: &ViolationCandidate, rule: &Rule) -> bool {
    if !candidate.violation {
        return true;
    }

    if candidate.confidence != Confidence::High {
        debug!(
            "Dropping {:?}-confidence candidate for {}",
            candidate.confidence, rule.name
        );
        return true;
    }

    if candidate
        .code_snippet_source
        .is_some_and(|s| s != SnippetSource::Source)
    {
        debug!("Dropping candidate sourced from examples for {}", rule.name);
        return true;
    }

    if let Some(name) = candidate.rule_name.as_deref() {
        if name.trim() != rule.name.as_str() {
            warn!(
                "Oracle reported rule `{}` while evaluating `{}`; dropping candidate",
                name, rule.name
            );
            return true;
        }
    }

    let snippet = candidate.code_snippet.trim();
    if rule
        .negative_examples
        .iter()
        .any(|example| example.code.contains(snippet))
    {
        debug!("Dropping candidate echoing an incorrect example of {}", rule.name);
        return true;
    }

    false
}

/// Promotes a surviving candidate to a reportable [`LintError`].
#[must_use]
pub fn promote(
    candidate: ViolationCandidate,
    target: &TaskTarget,
    rule: &Rule,
    model: &str,
    severity: Severity,
) -> LintError {
    let file = target.file();
    LintError {
        rule: rule.name.to_string(),
        file: file.map(|f| f.relative_path.clone()),
        language: file.and_then(|f| f.language.clone()),
        model: model.to_string(),
        severity,
        location: file.and_then(|f| Location::locate(&f.content, &candidate.code_snippet)),
        code_snippet: candidate.code_snippet,
        reasoning: candidate.reasoning,
    }
}

/// Filters candidates and promotes the survivors.
#[must_use]
pub fn filter_candidates(
    candidates: Vec<ViolationCandidate>,
    target: &TaskTarget,
    rule: &Rule,
    model: &str,
    severity: Severity,
) -> Vec<LintError> {
    candidates
        .into_iter()
        .filter(|c| !is_false_positive(c, rule))
        .map(|c| promote(c, target, rule, model, severity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Example, RuleName};
    use crate::source::SourceFile;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn rule() -> Rule {
        Rule::new(
            RuleName::new("no-console").unwrap(),
            "Avoid console",
            "Use the logger",
        )
        .with_negative(Example::new("function f() {\n  console.error('bad example');\n}"))
    }

    fn candidate() -> ViolationCandidate {
        ViolationCandidate {
            code_snippet: "console.log('x')".to_string(),
            rule_name: Some("no-console".to_string()),
            code_snippet_source: Some(SnippetSource::Source),
            reasoning: Some("logs".to_string()),
            violation: true,
            confidence: Confidence::High,
        }
    }

    fn target() -> TaskTarget {
        TaskTarget::File(Arc::new(SourceFile::new(
            PathBuf::from("/repo/src/app.js"),
            PathBuf::from("src/app.js"),
            "const a = 1;\nconsole.log('x')\n",
            Some("javascript".to_string()),
        )))
    }

    #[test]
    fn high_confidence_source_candidate_is_kept() {
        assert!(!is_false_positive(&candidate(), &rule()));
    }

    #[test]
    fn non_violation_is_discarded() {
        let c = ViolationCandidate {
            violation: false,
            ..candidate()
        };
        assert!(is_false_positive(&c, &rule()));
    }

    #[test]
    fn medium_and_low_confidence_are_discarded() {
        for confidence in [Confidence::Medium, Confidence::Low] {
            let c = ViolationCandidate {
                confidence,
                ..candidate()
            };
            assert!(is_false_positive(&c, &rule()));
        }
    }

    #[test]
    fn examples_sourced_snippet_is_discarded() {
        let c = ViolationCandidate {
            code_snippet_source: Some(SnippetSource::Examples),
            ..candidate()
        };
        assert!(is_false_positive(&c, &rule()));
    }

    #[test]
    fn missing_source_and_rule_name_are_tolerated() {
        let c = ViolationCandidate {
            code_snippet_source: None,
            rule_name: None,
            ..candidate()
        };
        assert!(!is_false_positive(&c, &rule()));
    }

    #[test]
    fn mismatched_rule_name_is_discarded() {
        let c = ViolationCandidate {
            rule_name: Some("prefer-fetch".to_string()),
            ..candidate()
        };
        assert!(is_false_positive(&c, &rule()));
    }

    #[test]
    fn snippet_from_negative_example_is_discarded() {
        let c = ViolationCandidate {
            code_snippet: "  console.error('bad example');".to_string(),
            ..candidate()
        };
        assert!(is_false_positive(&c, &rule()));
    }

    #[test]
    fn promote_enriches_with_file_and_location() {
        let errors = filter_candidates(
            vec![candidate()],
            &target(),
            &rule(),
            "test-model",
            Severity::Warn,
        );
        assert_eq!(errors.len(), 1);
        let error = &errors[0];
        assert_eq!(error.rule, "no-console");
        assert_eq!(error.file, Some(PathBuf::from("src/app.js")));
        assert_eq!(error.language.as_deref(), Some("javascript"));
        assert_eq!(error.model, "test-model");
        assert_eq!(error.severity, Severity::Warn);
        assert_eq!(error.location.map(|l| l.line), Some(2));
    }

    #[test]
    fn project_target_has_no_file() {
        let target = TaskTarget::Project {
            scope: crate::rule::RuleScope::Project,
            files: Arc::from(vec![PathBuf::from("a.js")]),
        };
        let error = promote(candidate(), &target, &rule(), "m", Severity::Error);
        assert!(error.file.is_none());
        assert!(error.location.is_none());
    }
}
