//! Declarative verification rules.
//!
//! - `script`: parse the Gherkin-subset rule script and bind its steps
//! - `registry`: the step vocabulary
//! - `engine`: run a bound script against one submission
//! - `context`: per-run state the steps read and write

pub mod context;
pub mod engine;
pub mod registry;
pub mod script;
mod steps;

pub use context::RuleContext;
pub use engine::{run, RunRecord, ScenarioResult, StepOutcome, StepResult, StepStatus};
pub use registry::{Step, StepRegistry};
pub use script::{
    compile_script, CompiledScenario, CompiledScript, CompiledStep, RuleScript, ScenarioDef,
    ScriptStep,
};

/// The rule script shipped with the crate.
pub const DEFAULT_RULES: &str = include_str!("../../features/verify-conformance.feature");
