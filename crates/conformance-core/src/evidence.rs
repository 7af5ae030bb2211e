//! Test evidence extraction and reconciliation.
//!
//! Evidence is a JUnit-style XML report. Only in-scope test cases (names
//! carrying [`SCOPE_MARKER`]) count; skipped cases are dropped entirely.
//! Case names are normalized so they match requirement codenames.

use std::fmt::Display;
use std::sync::OnceLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{Result, Submission, VerifyError};
use crate::requirements::RequirementSet;

/// Substring marking a test case as in scope.
pub const SCOPE_MARKER: &str = "[Conformance]";

/// Keyword prefix the test runner puts in front of case names.
const LEADING_KEYWORD: &str = "[It] ";

/// HTML entities left over after XML decoding.
const ENTITIES: [(&str, &str); 3] = [("&#39;", "'"), ("&#34;", "\""), ("&gt;", ">")];

/// Quoting variants seen in upstream reports.
const SUBSTITUTIONS: [(&str, &str); 3] = [("\\\"", "\""), ("\u{2018}", "'"), ("\u{2019}", "'")];

/// Classification of one test case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Passed,
    Failed,
    Skipped,
}

/// One normalized test case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestOutcome {
    pub name: String,
    pub status: OutcomeStatus,
    /// Failure or error detail, when the case failed.
    pub detail: Option<String>,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.status == OutcomeStatus::Passed
    }
}

/// Normalize a raw case name into its requirement codename form.
pub fn normalize_name(raw: &str) -> String {
    let mut name = raw.to_string();
    for (from, to) in ENTITIES.iter().chain(SUBSTITUTIONS.iter()) {
        if name.contains(from) {
            name = name.replace(from, to);
        }
    }
    let name = name.trim();
    name.strip_prefix(LEADING_KEYWORD)
        .unwrap_or(name)
        .trim()
        .to_string()
}

#[derive(Debug)]
struct OpenCase {
    name: String,
    status: OutcomeStatus,
    detail: Option<String>,
}

impl OpenCase {
    fn open(start: &BytesStart<'_>, file: &str) -> Result<Self> {
        let name = attribute(start, "name", file)?.unwrap_or_default();
        Ok(Self {
            name,
            status: OutcomeStatus::Passed,
            detail: None,
        })
    }

    fn mark(&mut self, marker: &BytesStart<'_>, file: &str) -> Result<()> {
        match marker.local_name().as_ref() {
            b"skipped" => self.status = OutcomeStatus::Skipped,
            b"failure" | b"error" => {
                if self.status != OutcomeStatus::Skipped {
                    self.status = OutcomeStatus::Failed;
                }
                if self.detail.is_none() {
                    self.detail = attribute(marker, "message", file)?.filter(|m| !m.is_empty());
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(self) -> TestOutcome {
        TestOutcome {
            name: self.name,
            status: self.status,
            detail: self.detail,
        }
    }
}

fn corrupt(file: &str, reason: impl Display) -> VerifyError {
    VerifyError::EvidenceCorrupt {
        file: file.to_string(),
        reason: reason.to_string(),
    }
}

fn attribute(start: &BytesStart<'_>, key: &str, file: &str) -> Result<Option<String>> {
    match start.try_get_attribute(key).map_err(|e| corrupt(file, e))? {
        Some(attr) => {
            let value = attr.unescape_value().map_err(|e| corrupt(file, e))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

/// Parse every test case in a JUnit report, unfiltered and unnormalized.
///
/// `file` only labels errors.
pub fn parse_report(xml: &str, file: &str) -> Result<Vec<TestOutcome>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut cases = Vec::new();
    let mut saw_suite = false;
    let mut current: Option<OpenCase> = None;
    let mut in_detail = false;

    loop {
        match reader.read_event().map_err(|e| corrupt(file, e))? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"testsuites" | b"testsuite" => saw_suite = true,
                b"testcase" => current = Some(OpenCase::open(&e, file)?),
                b"failure" | b"error" => {
                    if let Some(case) = current.as_mut() {
                        case.mark(&e, file)?;
                        in_detail = true;
                    }
                }
                _ => {
                    if let Some(case) = current.as_mut() {
                        case.mark(&e, file)?;
                    }
                }
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"testsuites" | b"testsuite" => saw_suite = true,
                b"testcase" => cases.push(OpenCase::open(&e, file)?.close()),
                _ => {
                    if let Some(case) = current.as_mut() {
                        case.mark(&e, file)?;
                    }
                }
            },
            Event::Text(text) if in_detail => {
                let text = text.unescape().map_err(|e| corrupt(file, e))?;
                if let Some(case) = current.as_mut() {
                    if case.detail.is_none() && !text.trim().is_empty() {
                        case.detail = Some(text.trim().to_string());
                    }
                }
            }
            Event::CData(data) if in_detail => {
                let text = String::from_utf8_lossy(&data).trim().to_string();
                if let Some(case) = current.as_mut() {
                    if case.detail.is_none() && !text.is_empty() {
                        case.detail = Some(text);
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"testcase" => {
                    if let Some(case) = current.take() {
                        cases.push(case.close());
                    }
                    in_detail = false;
                }
                b"failure" | b"error" => in_detail = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        return Err(corrupt(file, "unterminated testcase element"));
    }
    if !saw_suite {
        return Err(corrupt(file, "document contains no test suite"));
    }
    Ok(cases)
}

/// Extract the in-scope, non-skipped, normalized outcomes from a report.
pub fn extract(xml: &str, file: &str) -> Result<Vec<TestOutcome>> {
    let outcomes = parse_report(xml, file)?
        .into_iter()
        .filter(|case| case.status != OutcomeStatus::Skipped)
        .filter(|case| case.name.contains(SCOPE_MARKER))
        .map(|case| TestOutcome {
            name: normalize_name(&case.name),
            ..case
        })
        .collect();
    Ok(outcomes)
}

/// Extract outcomes from the named evidence file of a submission.
pub fn extract_from_submission(submission: &Submission, file: &str) -> Result<Vec<TestOutcome>> {
    let evidence = submission
        .file_by_name(file)
        .ok_or_else(|| VerifyError::EvidenceMissing(file.to_string()))?;
    extract(&evidence.content, file)
}

/// Mark every passing outcome that is required as satisfied, and return the
/// requirements still unsatisfied, sorted.
///
/// Calling this again with the same inputs yields the same list.
pub fn reconcile(required: &mut RequirementSet, outcomes: &[TestOutcome]) -> Vec<String> {
    for outcome in outcomes.iter().filter(|o| o.passed()) {
        required.mark_satisfied(&outcome.name);
    }
    let mut missing = required.unsatisfied();
    missing.sort();
    missing
}

/// Pass/fail totals from the summary line of a test run log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct E2eSummary {
    pub passed: u64,
    pub failed: u64,
}

impl E2eSummary {
    /// Find the `N Passed | M Failed` summary in a log. The last one wins.
    pub fn from_log(log: &str) -> Option<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"(\d+) Passed \| (\d+) Failed").expect("summary pattern is a valid regex")
        });
        let caps = re.captures_iter(log).last()?;
        Some(Self {
            passed: caps[1].parse().ok()?,
            failed: caps[2].parse().ok()?,
        })
    }
}
