//! Rule execution engine.
//!
//! Runs every scenario of a [`CompiledScript`] against a [`RuleContext`] and
//! records a per-step outcome. Within a scenario the first failing or
//! not-applicable step halts the scenario; the remaining steps are recorded
//! as skipped without being executed. Scenarios are independent of each
//! other.

use serde::{Deserialize, Serialize};

use crate::domain::Result;
use crate::rules::context::RuleContext;
use crate::rules::script::CompiledScript;
use crate::rules::steps;

// ---------------------------------------------------------------------------
// Step outcomes
// ---------------------------------------------------------------------------

/// What a step handler decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Pass,
    /// Failed with a human-readable hint.
    Fail(String),
    /// Cannot be evaluated yet, e.g. the target release is undetermined.
    NotApplicable,
}

/// Recorded status of one executed (or skipped) step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Pending,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepResult {
    pub keyword: String,
    pub text: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Run record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioResult {
    pub name: String,
    pub steps: Vec<StepResult>,
}

impl ScenarioResult {
    pub fn failed(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }

    pub fn pending(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Pending)
    }

    /// Message of the first failed step.
    pub fn first_failure(&self) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Failed)
            .and_then(|s| s.message.as_deref())
    }
}

/// Structured record of one verification run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    pub feature: String,
    pub scenarios: Vec<ScenarioResult>,
}

impl RunRecord {
    pub fn failed_scenarios(&self) -> usize {
        self.scenarios.iter().filter(|s| s.failed()).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

fn classify(outcome: Result<StepOutcome>) -> (StepStatus, Option<String>) {
    match outcome {
        Ok(StepOutcome::Pass) => (StepStatus::Passed, None),
        Ok(StepOutcome::Fail(hint)) => (StepStatus::Failed, Some(hint)),
        Ok(StepOutcome::NotApplicable) => (StepStatus::Pending, None),
        Err(e) => (StepStatus::Failed, Some(e.to_string())),
    }
}

/// Execute `script` against `ctx`.
pub fn run(script: &CompiledScript, ctx: &mut RuleContext<'_>) -> RunRecord {
    let mut scenarios = Vec::with_capacity(script.scenarios.len());

    for scenario in &script.scenarios {
        let mut halted = false;
        let mut results = Vec::with_capacity(scenario.steps.len());
        for step in &scenario.steps {
            let (status, message) = if halted {
                (StepStatus::Skipped, None)
            } else {
                classify(steps::execute(&step.step, ctx))
            };
            halted |= matches!(status, StepStatus::Failed | StepStatus::Pending);
            results.push(StepResult {
                keyword: step.keyword.clone(),
                text: step.text.clone(),
                status,
                message,
            });
        }
        scenarios.push(ScenarioResult {
            name: scenario.name.clone(),
            steps: results,
        });
    }

    RunRecord {
        feature: script.feature.clone(),
        scenarios,
    }
}
