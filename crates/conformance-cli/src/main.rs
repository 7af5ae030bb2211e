//! Conformance submission verifier CLI
//!
//! The `conformance-verify` command runs the verification engine over
//! submission bundles on disk.
//!
//! ## Commands
//!
//! - `verify`: verify one bundle and print (or publish) its verdict
//! - `sweep`: verify every bundle under a directory
//! - `required-tests`: list the tests a release requires
//! - `check-release`: check a release against the supported window
//! - `lint-rules`: parse and bind a rule script without running it

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn, Level};

use conformance_core::{
    discover_bundles, is_supported_release, load_submission, verify_batch, FsVerdictSink,
    PublishOutcome, METRICS, ReleaseVersion, RequirementResolver, RuleScript, StepRegistry, Submission,
    SweepReport, Verdict, VerdictSink, VerdictState, Verification, Verifier, VerifierConfig,
    DEFAULT_RULES,
};

#[derive(Parser)]
#[command(name = "conformance-verify")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify conformance product submissions", long_about = None)]
struct Cli {
    /// Config file (default: $CONFORMANCE_VERIFY_CONFIG or ./conformance-verify.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Override metadata.root
    #[arg(long, global = true)]
    metadata_root: Option<PathBuf>,

    /// Override release.latest
    #[arg(long, global = true)]
    latest_release: Option<String>,

    /// Override release.lookback
    #[arg(long, global = true)]
    lookback: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a single submission bundle
    Verify {
        /// Bundle directory (contains submission.json and files/)
        bundle: PathBuf,

        /// Publish the verdict under this directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Verify every bundle under a directory
    Sweep {
        /// Directory whose subdirectories are bundles
        root: PathBuf,

        /// Number of concurrent workers
        #[arg(short, long, default_value = "4")]
        jobs: usize,

        /// Publish verdicts and a sweep summary under this directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List the tests required for a release
    RequiredTests {
        /// Release version, e.g. v1.30
        #[arg(short, long)]
        release: String,
    },

    /// Check whether a release is inside the supported window
    CheckRelease {
        /// Release version, e.g. v1.29
        #[arg(short, long)]
        release: String,
    },

    /// Parse and bind a rule script (default: the embedded script)
    LintRules {
        /// Rule script path
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = VerifierConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(root) = cli.metadata_root {
        // Overrides are relative to the working directory, not the config file.
        config.metadata.root = std::env::current_dir()?.join(root);
    }
    if let Some(latest) = cli.latest_release {
        config.release.latest = latest;
    }
    if let Some(lookback) = cli.lookback {
        config.release.lookback = lookback;
    }
    config.validate().context("Invalid configuration")?;

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config.log_level()
    };
    conformance_core::init_tracing(cli.json || config.logging.json, level);

    match cli.command {
        Commands::Verify {
            bundle,
            out,
            format,
        } => {
            let verifier = Verifier::from_config(&config)?;
            let state = cmd_verify(&verifier, &bundle, out.as_deref(), format).await?;
            Ok(exit_for(state))
        }
        Commands::Sweep { root, jobs, out } => {
            let verifier = Verifier::from_config(&config)?;
            cmd_sweep(verifier, &root, jobs, out.as_deref()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::RequiredTests { release } => {
            cmd_required_tests(&RequirementResolver::new(config.metadata_root()), &release)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckRelease { release } => {
            let supported =
                cmd_check_release(&release, &config.release.latest, config.release.lookback)?;
            Ok(if supported {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::LintRules { file } => {
            cmd_lint_rules(file.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_for(state: VerdictState) -> ExitCode {
    match state {
        VerdictState::Success | VerdictState::Pending => ExitCode::SUCCESS,
        VerdictState::Failure => ExitCode::FAILURE,
    }
}

fn render_text(submission: &Submission, verdict: &Verdict) -> String {
    format!(
        "Submission #{}: {}\nState:  {}\nLabels: {}\n\n{}\n",
        submission.id,
        submission.title,
        verdict.state,
        verdict.labels.join(", "),
        verdict.comment
    )
}

async fn publish(out: &Path, verification: &Verification) -> Result<PublishOutcome> {
    FsVerdictSink::new(out)
        .publish(&verification.submission, &verification.verdict)
        .await
}

/// Verify one bundle and print its verdict.
async fn cmd_verify(
    verifier: &Verifier,
    bundle: &Path,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<VerdictState> {
    let submission = load_submission(bundle)?;
    let verification = verifier
        .verify(submission)
        .with_context(|| format!("Failed to verify {}", bundle.display()))?;

    match format {
        OutputFormat::Text => print!(
            "{}",
            render_text(&verification.submission, &verification.verdict)
        ),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&verification)?),
    }

    if let Some(out) = out {
        let outcome = publish(out, &verification).await?;
        info!(outcome = ?outcome, dir = %out.display(), "verdict written");
    }
    Ok(verification.verdict.state)
}

#[derive(Debug, Serialize)]
struct SweepSummary {
    generated_at: DateTime<Utc>,
    verified: usize,
    states: BTreeMap<String, usize>,
    /// One entry per verified submission, in id order.
    submissions: Vec<SubmissionVerdict>,
    skipped: Vec<SkippedBundle>,
}

#[derive(Debug, Serialize)]
struct SubmissionVerdict {
    id: u64,
    state: VerdictState,
    labels: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SkippedBundle {
    bundle: String,
    error: String,
}

fn summarize(report: &SweepReport, mut skipped: Vec<SkippedBundle>) -> SweepSummary {
    let mut states = BTreeMap::new();
    let mut submissions = Vec::with_capacity(report.verified.len());
    for v in &report.verified {
        *states.entry(v.verdict.state.to_string()).or_insert(0) += 1;
        submissions.push(SubmissionVerdict {
            id: v.submission.id,
            state: v.verdict.state,
            labels: v.verdict.labels.clone(),
        });
    }
    submissions.sort_by_key(|s| s.id);
    skipped.extend(report.skipped.iter().map(|s| SkippedBundle {
        bundle: format!("#{}", s.id),
        error: s.error.clone(),
    }));
    SweepSummary {
        generated_at: Utc::now(),
        verified: report.verified.len(),
        states,
        submissions,
        skipped,
    }
}

/// Split `items` into at most `jobs` contiguous chunks.
fn partition<T>(items: Vec<T>, jobs: usize) -> Vec<Vec<T>> {
    let jobs = jobs.max(1);
    let size = items.len().div_ceil(jobs).max(1);
    let mut chunks = Vec::new();
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}

/// Verify every bundle under `root` on blocking worker threads.
async fn cmd_sweep(verifier: Verifier, root: &Path, jobs: usize, out: Option<&Path>) -> Result<()> {
    let bundles = discover_bundles(root)?;
    info!(root = %root.display(), bundles = bundles.len(), "sweep started");

    let mut submissions = Vec::with_capacity(bundles.len());
    let mut unreadable = Vec::new();
    for path in bundles {
        match load_submission(&path) {
            Ok(s) => submissions.push(s),
            Err(e) => {
                warn!(bundle = %path.display(), error = %e, "skipping unreadable bundle");
                unreadable.push(SkippedBundle {
                    bundle: path.display().to_string(),
                    error: format!("{e:#}"),
                });
            }
        }
    }

    let verifier = Arc::new(verifier);
    let mut workers = JoinSet::new();
    for chunk in partition(submissions, jobs) {
        let verifier = Arc::clone(&verifier);
        workers.spawn_blocking(move || verify_batch(&verifier, chunk));
    }

    let mut report = SweepReport::default();
    while let Some(joined) = workers.join_next().await {
        let part = joined.context("Sweep worker panicked")?;
        report.verified.extend(part.verified);
        report.skipped.extend(part.skipped);
    }
    report.verified.sort_by_key(|v| v.submission.id);
    report.skipped.sort_by_key(|s| s.id);
    METRICS.flush();

    for v in &report.verified {
        println!(
            "#{:<6} {:<8} {}",
            v.submission.id,
            v.verdict.state,
            v.verdict.labels.join(", ")
        );
        if let Some(out) = out {
            publish(out, v).await?;
        }
    }

    let summary = summarize(&report, unreadable);
    for s in &summary.skipped {
        println!("skipped {}: {}", s.bundle, s.error);
    }
    println!(
        "{} verified, {} skipped",
        summary.verified,
        summary.skipped.len()
    );

    if let Some(out) = out {
        tokio::fs::create_dir_all(out)
            .await
            .with_context(|| format!("Failed to create {}", out.display()))?;
        let path = out.join("sweep.json");
        tokio::fs::write(&path, serde_json::to_vec_pretty(&summary)?)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Print the codenames of every test `release` requires.
fn cmd_required_tests(resolver: &RequirementResolver, release: &str) -> Result<()> {
    let required = resolver
        .resolve(release)
        .with_context(|| format!("Failed to resolve requirements for {release}"))?;
    for (codename, _) in required.iter() {
        println!("{codename}");
    }
    println!("{} tests required for {release}", required.len());
    Ok(())
}

/// Returns whether `release` is supported; errors only on bad input.
fn cmd_check_release(release: &str, latest: &str, lookback: u64) -> Result<bool> {
    if latest.is_empty() {
        anyhow::bail!("No latest release configured; set release.latest or pass --latest-release");
    }
    ReleaseVersion::parse(release)?;
    match is_supported_release(release, latest, lookback) {
        Ok(()) => {
            println!("{release} is supported (latest {latest}, lookback {lookback})");
            Ok(true)
        }
        Err(e @ conformance_core::VerifyError::UnsupportedRelease { .. }) => {
            println!("{e}");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse and bind a rule script, printing a short summary.
fn cmd_lint_rules(file: Option<&Path>) -> Result<()> {
    let (name, source) = match file {
        Some(path) => (
            path.display().to_string(),
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => ("<embedded>".to_string(), DEFAULT_RULES.to_string()),
    };

    let script = RuleScript::parse(&source).with_context(|| format!("{name}: parse failed"))?;
    let compiled = script
        .compile(&StepRegistry::standard())
        .with_context(|| format!("{name}: step binding failed"))?;

    let mut requirements: Vec<&str> = compiled.scenarios.iter().map(|s| s.name.as_str()).collect();
    requirements.dedup();
    let steps: usize = compiled.scenarios.iter().map(|s| s.steps.len()).sum();
    println!(
        "{name}: OK ({} requirements, {} scenarios, {steps} steps)",
        requirements.len(),
        compiled.scenarios.len()
    );
    Ok(())
}
