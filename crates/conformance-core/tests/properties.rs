//! Property tests for version ordering, reconciliation and label diffs.

use conformance_core::evidence::normalize_name;
use conformance_core::labels;
use conformance_core::{
    is_supported_release, reconcile, LabelDiff, OutcomeStatus, ReleaseVersion, RequirementSet,
    TestOutcome,
};
use proptest::prelude::*;

const LABEL_POOL: &[&str] = &[
    "conformance-product-submission",
    "release-documents-checked",
    "not-verifiable",
    "unable-to-process",
    "required-tests-missing",
    "release-v1.29",
    "release-v1.30",
    "missing-file-README.md",
    "no-failed-tests-v1.30",
    "tests-verified-v1.30",
    "lgtm",
    "needs-rebase",
];

fn labels_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::sample::subsequence(LABEL_POOL.to_vec(), 0..LABEL_POOL.len())
        .prop_map(|v| v.into_iter().map(str::to_string).collect())
}

fn outcome(name: &str, passed: bool) -> TestOutcome {
    TestOutcome {
        name: name.to_string(),
        status: if passed {
            OutcomeStatus::Passed
        } else {
            OutcomeStatus::Failed
        },
        detail: None,
    }
}

proptest! {
    #[test]
    fn version_order_matches_numeric_order(
        a in (0u64..3, 0u64..40, 0u64..10),
        b in (0u64..3, 0u64..40, 0u64..10),
    ) {
        let va = ReleaseVersion::parse(&format!("v{}.{}.{}", a.0, a.1, a.2)).unwrap();
        let vb = ReleaseVersion::parse(&format!("{}.{}.{}", b.0, b.1, b.2)).unwrap();
        prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
    }

    #[test]
    fn supported_window_is_lookback_minors(
        target in 0u64..40,
        latest in 0u64..40,
        lookback in 0u64..10,
    ) {
        let result = is_supported_release(
            &format!("v1.{target}"),
            &format!("v1.{latest}"),
            lookback,
        );
        prop_assert_eq!(result.is_ok(), target >= latest.saturating_sub(lookback));
    }

    #[test]
    fn reconcile_reports_exactly_unpassed_requirements(
        required in prop::collection::btree_set("[a-e]{1,3}", 0..8),
        passed in prop::collection::btree_set("[a-e]{1,3}", 0..8),
        failed in prop::collection::btree_set("[a-e]{1,3}", 0..8),
    ) {
        let mut set: RequirementSet = required.iter().cloned().collect();
        let outcomes: Vec<TestOutcome> = passed
            .iter()
            .map(|n| outcome(n, true))
            .chain(failed.iter().map(|n| outcome(n, false)))
            .collect();

        let missing = reconcile(&mut set, &outcomes);
        let expected: Vec<String> = required.difference(&passed).cloned().collect();
        prop_assert_eq!(&missing, &expected);

        // Reconciling again changes nothing.
        prop_assert_eq!(reconcile(&mut set, &outcomes), expected);
    }

    #[test]
    fn label_diff_reaches_desired_and_keeps_foreign_labels(
        current in labels_strategy(),
        desired in labels_strategy(),
    ) {
        let diff = LabelDiff::between(&current, &desired);
        let mut applied: Vec<String> = current
            .iter()
            .filter(|l| !diff.remove.contains(l))
            .cloned()
            .collect();
        applied.extend(diff.add.iter().cloned());

        for label in &desired {
            prop_assert!(applied.contains(label));
        }
        for label in &applied {
            prop_assert!(desired.contains(label) || !labels::is_managed(label));
        }
        for label in current.iter().filter(|l| !labels::is_managed(l)) {
            prop_assert!(!diff.remove.contains(label));
        }
    }

    #[test]
    fn normalize_strips_leading_keyword(words in "[a-z ]{0,24}") {
        let body = format!("[sig-x] {words} [Conformance]");
        prop_assert_eq!(normalize_name(&format!("[It] {body}")), body.clone());
        prop_assert_eq!(normalize_name(&body), body);
    }
}
