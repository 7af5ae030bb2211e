//! Step handlers.
//!
//! Handlers return `Ok(StepOutcome::Fail(..))` for checks that ran and did
//! not hold, and `Err(..)` when a precondition of the check itself is broken
//! (missing file, unreadable evidence). The engine records both as failures.

use tracing::debug;

use crate::domain::{is_supported_release, Result, VerifyError};
use crate::evidence::{self, E2eSummary};
use crate::labels;
use crate::obs;
use crate::product::ProductDescriptor;
use crate::requirements::RequirementSet;
use crate::rules::context::RuleContext;
use crate::rules::engine::StepOutcome;
use crate::rules::registry::Step;

pub(crate) fn execute(step: &Step, ctx: &mut RuleContext<'_>) -> Result<StepOutcome> {
    match step {
        Step::SubmissionPresent => submission_present(ctx),
        Step::RequiredFile { file } => required_file(ctx, file),
        Step::FileNotEmpty { file } => file_not_empty(ctx, file),
        Step::FolderLayout => folder_layout(ctx),
        Step::SingleFolder => single_folder(ctx),
        Step::TitleHasVersion => title_has_version(ctx),
        Step::TitleMatchesFolder => title_matches_folder(ctx),
        Step::SupportedRelease => supported_release(ctx),
        Step::FieldPresent { field, file } => {
            ProductDescriptor::from_submission(ctx.submission(), file)?.require_non_empty(field)?;
            Ok(StepOutcome::Pass)
        }
        Step::FieldIsUrl { field, file } => {
            with_field(ctx, file, field, |d, v| d.require_url(field, v))
        }
        Step::FieldIsEmail { field, file } => {
            with_field(ctx, file, field, |d, v| d.require_email(field, v))
        }
        Step::FieldOneOf {
            field,
            file,
            allowed,
        } => with_field(ctx, file, field, |d, v| d.require_one_of(field, v, allowed)),
        Step::NoFailedTests { file } => no_failed_tests(ctx, file),
        Step::E2eLogClean { file } => e2e_log_clean(ctx, file),
        Step::RequiredTestsPresent { file } => required_tests_present(ctx, file),
    }
}

fn submission_present(ctx: &RuleContext<'_>) -> Result<StepOutcome> {
    if ctx.submission().files.is_empty() {
        return Ok(StepOutcome::Fail(
            "the submission contains no files".to_string(),
        ));
    }
    Ok(StepOutcome::Pass)
}

fn required_file(ctx: &mut RuleContext<'_>, file: &str) -> Result<StepOutcome> {
    if ctx.submission().file_by_name(file).is_some() {
        return Ok(StepOutcome::Pass);
    }
    ctx.add_missing_file(file);
    Err(VerifyError::FileMissing(file.to_string()))
}

fn file_not_empty(ctx: &RuleContext<'_>, file: &str) -> Result<StepOutcome> {
    let found = ctx
        .submission()
        .file_by_name(file)
        .ok_or_else(|| VerifyError::FileMissing(file.to_string()))?;
    if found.content.trim().is_empty() {
        return Ok(StepOutcome::Fail(format!("file '{file}' is empty")));
    }
    Ok(StepOutcome::Pass)
}

fn folder_layout(ctx: &RuleContext<'_>) -> Result<StepOutcome> {
    let misplaced: Vec<&str> = ctx
        .submission()
        .misplaced_files()
        .into_iter()
        .map(|f| f.path.as_str())
        .collect();
    if misplaced.is_empty() {
        return Ok(StepOutcome::Pass);
    }
    Err(VerifyError::FolderStructureInvalid(format!(
        "files must be placed in a RELEASE_VERSION/PRODUCT_NAME folder, found: {}",
        misplaced.join(", ")
    )))
}

fn single_folder(ctx: &RuleContext<'_>) -> Result<StepOutcome> {
    let folders = ctx.submission().folders();
    match folders.len() {
        1 => Ok(StepOutcome::Pass),
        0 => Err(VerifyError::FolderStructureInvalid(
            "no release version and product folder found".to_string(),
        )),
        n => {
            let listed: Vec<String> = folders
                .iter()
                .map(|(version, product)| format!("{version}/{product}"))
                .collect();
            Err(VerifyError::FolderStructureInvalid(format!(
                "expected exactly one release version and product folder, found {n}: {}",
                listed.join(", ")
            )))
        }
    }
}

fn title_has_version(ctx: &RuleContext<'_>) -> Result<StepOutcome> {
    let submission = ctx.submission();
    match submission.title_version() {
        Some(_) => Ok(StepOutcome::Pass),
        None => Err(VerifyError::TitleMismatch(format!(
            "the title '{}' does not contain a release version such as v1.30",
            submission.title
        ))),
    }
}

fn title_matches_folder(ctx: &RuleContext<'_>) -> Result<StepOutcome> {
    let target = ctx.target_version();
    let Some(in_title) = ctx.submission().title_version() else {
        return Ok(StepOutcome::NotApplicable);
    };
    if target.is_empty() {
        return Ok(StepOutcome::NotApplicable);
    }
    if in_title != target {
        return Err(VerifyError::TitleMismatch(format!(
            "the release version in the title ({in_title}) does not match the folder structure ({target})"
        )));
    }
    Ok(StepOutcome::Pass)
}

fn supported_release(ctx: &RuleContext<'_>) -> Result<StepOutcome> {
    let target = ctx.target_version();
    if target.is_empty() || ctx.latest_version().is_empty() {
        return Ok(StepOutcome::NotApplicable);
    }
    is_supported_release(target, ctx.latest_version(), ctx.lookback())?;
    Ok(StepOutcome::Pass)
}

/// Run `check` against a field's value; absent fields are not applicable.
fn with_field<F>(ctx: &RuleContext<'_>, file: &str, field: &str, check: F) -> Result<StepOutcome>
where
    F: FnOnce(&ProductDescriptor, &str) -> Result<()>,
{
    let descriptor = ProductDescriptor::from_submission(ctx.submission(), file)?;
    match descriptor.get(field) {
        None => Ok(StepOutcome::NotApplicable),
        Some(value) => {
            check(&descriptor, value)?;
            Ok(StepOutcome::Pass)
        }
    }
}

fn no_failed_tests(ctx: &mut RuleContext<'_>, file: &str) -> Result<StepOutcome> {
    let target = ctx.target_version();
    if target.is_empty() {
        return Ok(StepOutcome::NotApplicable);
    }
    let outcomes = evidence::extract_from_submission(ctx.submission(), file)?;
    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.passed())
        .map(|o| o.name.as_str())
        .collect();
    if !failed.is_empty() {
        return Ok(StepOutcome::Fail(format!(
            "{} test(s) in {file} failed: {}",
            failed.len(),
            failed.join("; ")
        )));
    }
    ctx.add_label(labels::no_failed_tests(target));
    Ok(StepOutcome::Pass)
}

fn e2e_log_clean(ctx: &RuleContext<'_>, file: &str) -> Result<StepOutcome> {
    let log = ctx
        .submission()
        .file_by_name(file)
        .ok_or_else(|| VerifyError::FileMissing(file.to_string()))?;
    let summary = E2eSummary::from_log(&log.content).ok_or_else(|| VerifyError::EvidenceCorrupt {
        file: file.to_string(),
        reason: "no test run summary found".to_string(),
    })?;
    if summary.failed > 0 {
        return Ok(StepOutcome::Fail(format!(
            "{file} reports {} failed test(s)",
            summary.failed
        )));
    }
    Ok(StepOutcome::Pass)
}

fn required_tests_present(ctx: &mut RuleContext<'_>, file: &str) -> Result<StepOutcome> {
    let target = ctx.target_version();
    if target.is_empty() {
        return Ok(StepOutcome::NotApplicable);
    }

    let resolved = match ctx.manifest() {
        Some(records) => RequirementSet::from_records(records, target),
        None => ctx.resolver().resolve(target),
    };
    let mut required = match resolved {
        Ok(set) => set,
        Err(VerifyError::MetadataUnavailable { .. }) if ctx.requirements_pending() => {
            return Ok(StepOutcome::NotApplicable)
        }
        Err(e) => return Err(e),
    };
    let outcomes = evidence::extract_from_submission(ctx.submission(), file)?;
    let total = required.len();
    let missing = evidence::reconcile(&mut required, &outcomes);
    obs::emit_requirements_resolved(ctx.submission().id, target, total, missing.len());

    if missing.is_empty() {
        ctx.add_label(labels::tests_verified(target));
        return Ok(StepOutcome::Pass);
    }

    debug!(version = %target, missing = missing.len(), "required tests missing");
    ctx.add_label(labels::REQUIRED_TESTS_MISSING);
    Ok(StepOutcome::Fail(format!(
        "{} of {total} required test(s) for {target} are missing from {file}: {}",
        missing.len(),
        missing.join("; ")
    )))
}
