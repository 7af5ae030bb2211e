//! Label vocabulary shared by the rule steps, the aggregator and the sinks.

/// Carried by every verdict.
pub const SUBMISSION: &str = "conformance-product-submission";
/// Every requirement passed.
pub const DOCUMENTS_CHECKED: &str = "release-documents-checked";
/// At least one requirement failed.
pub const NOT_VERIFIABLE: &str = "not-verifiable";
/// Requirement metadata for the target release is not published yet.
pub const UNABLE_TO_PROCESS: &str = "unable-to-process";
pub const REQUIRED_TESTS_MISSING: &str = "required-tests-missing";

pub const MISSING_FILE_PREFIX: &str = "missing-file-";
pub const RELEASE_PREFIX: &str = "release-";
pub const NO_FAILED_TESTS_PREFIX: &str = "no-failed-tests-";
pub const TESTS_VERIFIED_PREFIX: &str = "tests-verified-";

const MANAGED: [&str; 5] = [
    SUBMISSION,
    DOCUMENTS_CHECKED,
    NOT_VERIFIABLE,
    UNABLE_TO_PROCESS,
    REQUIRED_TESTS_MISSING,
];

const MANAGED_PREFIXES: [&str; 4] = [
    MISSING_FILE_PREFIX,
    RELEASE_PREFIX,
    NO_FAILED_TESTS_PREFIX,
    TESTS_VERIFIED_PREFIX,
];

pub fn missing_file(name: &str) -> String {
    format!("{MISSING_FILE_PREFIX}{name}")
}

pub fn release(version: &str) -> String {
    format!("{RELEASE_PREFIX}{version}")
}

pub fn no_failed_tests(version: &str) -> String {
    format!("{NO_FAILED_TESTS_PREFIX}{version}")
}

pub fn tests_verified(version: &str) -> String {
    format!("{TESTS_VERIFIED_PREFIX}{version}")
}

/// Whether the verifier owns this label, i.e. may add or remove it.
pub fn is_managed(label: &str) -> bool {
    MANAGED.contains(&label) || MANAGED_PREFIXES.iter().any(|p| label.starts_with(p))
}

/// Append `label` unless already present. First occurrence wins.
pub fn push_unique(labels: &mut Vec<String>, label: impl Into<String>) {
    let label = label.into();
    if !labels.contains(&label) {
        labels.push(label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_labels() {
        assert!(is_managed(SUBMISSION));
        assert!(is_managed(&missing_file("README.md")));
        assert!(is_managed(&release("v1.30")));
        assert!(is_managed(&tests_verified("v1.30")));
        assert!(!is_managed("needs-rebase"));
        assert!(!is_managed("lgtm"));
    }

    #[test]
    fn test_push_unique_keeps_first() {
        let mut labels = vec!["a".to_string()];
        push_unique(&mut labels, "b");
        push_unique(&mut labels, "a");
        push_unique(&mut labels, "b");
        assert_eq!(labels, vec!["a", "b"]);
    }
}
