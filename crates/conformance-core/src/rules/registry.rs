//! Step definitions: the closed set of checks a rule script may use.
//!
//! Each definition pairs an anchored pattern with a binder that turns the
//! captures into a typed [`Step`]. Matching is first-match-wins in table
//! order.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// A bound step. Parameters are captured from the step text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    SubmissionPresent,
    RequiredFile { file: String },
    FileNotEmpty { file: String },
    FolderLayout,
    SingleFolder,
    TitleHasVersion,
    TitleMatchesFolder,
    SupportedRelease,
    FieldPresent { field: String, file: String },
    FieldIsUrl { field: String, file: String },
    FieldIsEmail { field: String, file: String },
    FieldOneOf {
        field: String,
        file: String,
        allowed: Vec<String>,
    },
    NoFailedTests { file: String },
    E2eLogClean { file: String },
    RequiredTestsPresent { file: String },
}

type Binder = fn(&Captures<'_>) -> Step;

fn arg(caps: &Captures<'_>, index: usize) -> String {
    caps.get(index)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn list(caps: &Captures<'_>, index: usize) -> Vec<String> {
    arg(caps, index)
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn submission_present(_: &Captures<'_>) -> Step {
    Step::SubmissionPresent
}

fn required_file(c: &Captures<'_>) -> Step {
    Step::RequiredFile { file: arg(c, 1) }
}

fn file_not_empty(c: &Captures<'_>) -> Step {
    Step::FileNotEmpty { file: arg(c, 1) }
}

fn folder_layout(_: &Captures<'_>) -> Step {
    Step::FolderLayout
}

fn single_folder(_: &Captures<'_>) -> Step {
    Step::SingleFolder
}

fn title_has_version(_: &Captures<'_>) -> Step {
    Step::TitleHasVersion
}

fn title_matches_folder(_: &Captures<'_>) -> Step {
    Step::TitleMatchesFolder
}

fn supported_release(_: &Captures<'_>) -> Step {
    Step::SupportedRelease
}

fn field_present(c: &Captures<'_>) -> Step {
    Step::FieldPresent {
        field: arg(c, 1),
        file: arg(c, 2),
    }
}

fn field_is_url(c: &Captures<'_>) -> Step {
    Step::FieldIsUrl {
        field: arg(c, 1),
        file: arg(c, 2),
    }
}

fn field_is_email(c: &Captures<'_>) -> Step {
    Step::FieldIsEmail {
        field: arg(c, 1),
        file: arg(c, 2),
    }
}

fn field_one_of(c: &Captures<'_>) -> Step {
    Step::FieldOneOf {
        field: arg(c, 1),
        file: arg(c, 2),
        allowed: list(c, 3),
    }
}

fn no_failed_tests(c: &Captures<'_>) -> Step {
    Step::NoFailedTests { file: arg(c, 1) }
}

fn e2e_log_clean(c: &Captures<'_>) -> Step {
    Step::E2eLogClean { file: arg(c, 1) }
}

fn required_tests_present(c: &Captures<'_>) -> Step {
    Step::RequiredTestsPresent { file: arg(c, 1) }
}

const DEFINITIONS: &[(&str, Binder)] = &[
    ("a conformance product submission", submission_present),
    (r#"the "([^"]+)" file is included in the submission"#, required_file),
    (r#"the "([^"]+)" file is not empty"#, file_not_empty),
    (
        "the files are in a folder named after the release version and product name",
        folder_layout,
    ),
    ("there is only one release version and product folder", single_folder),
    ("the title of the submission contains the release version", title_has_version),
    (
        "the release version in the title matches the folder structure",
        title_matches_folder,
    ),
    ("the release version is supported", supported_release),
    (r#"the "([^"]+)" field in "([^"]+)" is not empty"#, field_present),
    (r#"the "([^"]+)" field in "([^"]+)" is a valid URL"#, field_is_url),
    (r#"the "([^"]+)" field in "([^"]+)" is a valid email address"#, field_is_email),
    (r#"the "([^"]+)" field in "([^"]+)" is one of "([^"]*)""#, field_one_of),
    (r#"the tests in "([^"]+)" have no failures"#, no_failed_tests),
    (r#"the "([^"]+)" log reports no failed tests"#, e2e_log_clean),
    (
        r#"all required tests for the release are present in "([^"]+)""#,
        required_tests_present,
    ),
];

struct StepDefinition {
    source: &'static str,
    pattern: Regex,
    bind: Binder,
}

/// Ordered table of step definitions.
pub struct StepRegistry {
    definitions: Vec<StepDefinition>,
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.patterns()).finish()
    }
}

impl StepRegistry {
    /// The built-in step vocabulary.
    pub fn standard() -> Self {
        let definitions = DEFINITIONS
            .iter()
            .map(|&(source, bind)| StepDefinition {
                source,
                pattern: Regex::new(&format!("^{source}$"))
                    .expect("step definition patterns are valid regexes"),
                bind,
            })
            .collect();
        Self { definitions }
    }

    /// Bind step text to the first matching definition.
    pub fn bind(&self, text: &str) -> Option<Step> {
        self.definitions.iter().find_map(|def| {
            def.pattern
                .captures(text.trim())
                .map(|caps| (def.bind)(&caps))
        })
    }

    /// Pattern sources in match order.
    pub fn patterns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.definitions.iter().map(|d| d.source)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_compiles() {
        let registry = StepRegistry::standard();
        assert_eq!(registry.len(), DEFINITIONS.len());
    }

    #[test]
    fn test_bind_field_steps() {
        let registry = StepRegistry::standard();
        assert_eq!(
            registry.bind(r#"the "vendor" field in "PRODUCT.yaml" is not empty"#),
            Some(Step::FieldPresent {
                field: "vendor".to_string(),
                file: "PRODUCT.yaml".to_string()
            })
        );
        assert_eq!(
            registry.bind(r#"the "type" field in "PRODUCT.yaml" is one of "distribution, hosted,""#),
            Some(Step::FieldOneOf {
                field: "type".to_string(),
                file: "PRODUCT.yaml".to_string(),
                allowed: vec!["distribution".to_string(), "hosted".to_string()]
            })
        );
    }

    #[test]
    fn test_patterns_are_anchored() {
        let registry = StepRegistry::standard();
        assert!(registry.bind("maybe a conformance product submission").is_none());
        assert!(registry
            .bind("the release version is supported, probably")
            .is_none());
    }

    #[test]
    fn test_file_steps_do_not_overlap() {
        let registry = StepRegistry::standard();
        assert_eq!(
            registry.bind(r#"the "e2e.log" file is not empty"#),
            Some(Step::FileNotEmpty {
                file: "e2e.log".to_string()
            })
        );
        assert_eq!(
            registry.bind(r#"the "e2e.log" log reports no failed tests"#),
            Some(Step::E2eLogClean {
                file: "e2e.log".to_string()
            })
        );
    }
}
