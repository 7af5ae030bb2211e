//! Verdict aggregation.
//!
//! Folds a [`RunRecord`] and the run's [`RuleContext`] into the [`Verdict`]
//! published for the submission. Scenarios sharing a name count as one
//! requirement; it fails if any of them failed.

use crate::domain::{Verdict, VerdictState};
use crate::labels;
use crate::rules::{RuleContext, RunRecord};

/// Pointer appended to failure comments.
pub const DOCS_TRAILER: &str = "for a full list of requirements, please refer to these sections of the docs: \
[_content of the PR_](https://github.com/cncf/k8s-conformance/blob/master/instructions.md#contents-of-the-pr), \
and [_requirements_](https://github.com/cncf/k8s-conformance/blob/master/instructions.md#requirements).";

/// Comment used when the target release has no published requirements yet.
pub const PENDING_COMMENT: &str = "This conformance request has a release version that is unable to be processed at this time. \
It will be verified again once requirements for the release are published.";

#[derive(Debug)]
struct Requirement<'r> {
    name: &'r str,
    failed: bool,
    hints: Vec<&'r str>,
}

/// Group scenarios by name, preserving first appearance.
fn requirements(record: &RunRecord) -> Vec<Requirement<'_>> {
    let mut grouped: Vec<Requirement<'_>> = Vec::new();
    for scenario in &record.scenarios {
        let index = match grouped.iter().position(|r| r.name == scenario.name) {
            Some(i) => i,
            None => {
                grouped.push(Requirement {
                    name: &scenario.name,
                    failed: false,
                    hints: Vec::new(),
                });
                grouped.len() - 1
            }
        };
        let entry = &mut grouped[index];
        if scenario.failed() {
            entry.failed = true;
            if let Some(hint) = scenario.first_failure() {
                if !entry.hints.contains(&hint) {
                    entry.hints.push(hint);
                }
            }
        }
    }
    grouped
}

fn pending() -> Verdict {
    Verdict {
        comment: PENDING_COMMENT.to_string(),
        labels: vec![
            labels::SUBMISSION.to_string(),
            labels::UNABLE_TO_PROCESS.to_string(),
        ],
        state: VerdictState::Pending,
    }
}

/// Produce the verdict for one run.
pub fn aggregate(record: &RunRecord, ctx: &RuleContext<'_>) -> Verdict {
    if ctx.requirements_pending() {
        return pending();
    }

    let grouped = requirements(record);
    let total = grouped.len();
    let failed: Vec<&Requirement<'_>> = grouped.iter().filter(|r| r.failed).collect();

    let mut verdict_labels = vec![labels::SUBMISSION.to_string()];
    for file in ctx.missing_files() {
        labels::push_unique(&mut verdict_labels, labels::missing_file(file));
    }
    if !ctx.target_version().is_empty() {
        labels::push_unique(&mut verdict_labels, labels::release(ctx.target_version()));
    }
    for label in ctx.labels() {
        labels::push_unique(&mut verdict_labels, label.as_str());
    }

    if failed.is_empty() {
        labels::push_unique(&mut verdict_labels, labels::DOCUMENTS_CHECKED);
        return Verdict {
            comment: format!("All requirements ({total}) have passed for the submission!"),
            labels: verdict_labels,
            state: VerdictState::Success,
        };
    }

    labels::push_unique(&mut verdict_labels, labels::NOT_VERIFIABLE);
    let mut comment = format!(
        "{} of {total} requirements have passed. Please review the following:\n",
        total - failed.len()
    );
    for requirement in &failed {
        comment.push_str(&format!("- [FAIL] {}\n", requirement.name));
        for hint in &requirement.hints {
            comment.push_str(&format!("  - {hint}\n"));
        }
    }
    comment.push('\n');
    comment.push_str(DOCS_TRAILER);

    Verdict {
        comment,
        labels: verdict_labels,
        state: VerdictState::Failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Submission;
    use crate::requirements::RequirementResolver;
    use crate::rules::{ScenarioResult, StepResult, StepStatus};

    fn scenario(name: &str, failure: Option<&str>) -> ScenarioResult {
        let step = match failure {
            Some(hint) => StepResult {
                keyword: "Then".to_string(),
                text: "check".to_string(),
                status: StepStatus::Failed,
                message: Some(hint.to_string()),
            },
            None => StepResult {
                keyword: "Then".to_string(),
                text: "check".to_string(),
                status: StepStatus::Passed,
                message: None,
            },
        };
        ScenarioResult {
            name: name.to_string(),
            steps: vec![step],
        }
    }

    fn record(scenarios: Vec<ScenarioResult>) -> RunRecord {
        RunRecord {
            feature: "f".to_string(),
            scenarios,
        }
    }

    #[test]
    fn test_all_pass() {
        let mut s = Submission::new(1, "t");
        s.target_version = "v1.30".to_string();
        let resolver = RequirementResolver::new("/nonexistent");
        let ctx = RuleContext::new(&s, &resolver, "v1.30", 2);

        let verdict = aggregate(&record(vec![scenario("a", None), scenario("b", None)]), &ctx);
        assert_eq!(verdict.state, VerdictState::Success);
        assert_eq!(verdict.comment, "All requirements (2) have passed for the submission!");
        assert_eq!(
            verdict.labels,
            vec![
                "conformance-product-submission",
                "release-v1.30",
                "release-documents-checked"
            ]
        );
    }

    #[test]
    fn test_outline_rows_merge_and_hints_dedup() {
        let s = Submission::new(1, "t");
        let resolver = RequirementResolver::new("/nonexistent");
        let mut ctx = RuleContext::new(&s, &resolver, "v1.30", 2);
        ctx.add_missing_file("README.md");

        let verdict = aggregate(
            &record(vec![
                scenario("files", Some("missing README.md")),
                scenario("files", None),
                scenario("files", Some("missing README.md")),
                scenario("title", None),
                scenario("fields", Some("vendor missing")),
            ]),
            &ctx,
        );
        assert_eq!(verdict.state, VerdictState::Failure);
        assert!(verdict.comment.starts_with(
            "1 of 3 requirements have passed. Please review the following:\n- [FAIL] files\n  - missing README.md\n- [FAIL] fields\n  - vendor missing\n"
        ));
        assert_eq!(verdict.comment.matches("missing README.md").count(), 1);
        assert!(verdict.comment.ends_with(DOCS_TRAILER));
        assert_eq!(
            verdict.labels,
            vec![
                "conformance-product-submission",
                "missing-file-README.md",
                "not-verifiable"
            ]
        );
    }

    #[test]
    fn test_pending_overrides_everything() {
        let s = Submission::new(1, "t");
        let resolver = RequirementResolver::new("/nonexistent");
        let mut ctx = RuleContext::new(&s, &resolver, "v1.30", 2);
        ctx.add_label("tests-verified-v1.31");
        ctx.mark_requirements_pending();

        let verdict = aggregate(&record(vec![scenario("a", Some("nope"))]), &ctx);
        assert_eq!(verdict.state, VerdictState::Pending);
        assert_eq!(
            verdict.labels,
            vec!["conformance-product-submission", "unable-to-process"]
        );
        assert!(verdict.comment.contains("unable to be processed at this time"));
    }
}
