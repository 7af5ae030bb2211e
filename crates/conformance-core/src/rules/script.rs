//! Rule script parsing.
//!
//! Scripts use a small Gherkin subset:
//!
//! ```text
//! Feature: verify conformance product submission
//!
//!   Background:
//!     Given a conformance product submission
//!
//!   Scenario Outline: the submission contains the required files
//!     Then the "<file>" file is included in the submission
//!
//!     Examples:
//!       | file      |
//!       | README.md |
//! ```
//!
//! Outline rows expand into separate scenarios that share the outline's name.
//! Parsing is purely syntactic; [`RuleScript::compile`] binds step text to
//! step definitions.

use serde::{Deserialize, Serialize};

use crate::domain::ScriptError;
use crate::rules::registry::{Step, StepRegistry};

const STEP_KEYWORDS: [&str; 5] = ["Given", "When", "Then", "And", "But"];

/// A step as written in the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub keyword: String,
    pub text: String,
    pub line: usize,
}

/// A scenario after outline expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDef {
    pub name: String,
    pub line: usize,
    pub steps: Vec<ScriptStep>,
}

/// A parsed, unbound rule script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleScript {
    pub feature: String,
    pub background: Vec<ScriptStep>,
    pub scenarios: Vec<ScenarioDef>,
}

/// A step bound to its definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStep {
    pub keyword: String,
    pub text: String,
    pub step: Step,
}

/// A scenario ready to run: background steps first, then its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScenario {
    pub name: String,
    pub steps: Vec<CompiledStep>,
}

/// A rule script with every step bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    pub feature: String,
    pub scenarios: Vec<CompiledScenario>,
}

#[derive(Debug)]
struct ExampleTable {
    header: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

#[derive(Debug)]
enum Block {
    Background,
    Scenario(ScenarioDef),
    Outline {
        def: ScenarioDef,
        tables: Vec<ExampleTable>,
        in_examples: bool,
    },
}

fn split_step(line: &str) -> Option<(&str, &str)> {
    if let Some(rest) = line.strip_prefix("* ") {
        return Some(("*", rest.trim()));
    }
    let (keyword, rest) = line.split_once(' ')?;
    STEP_KEYWORDS
        .contains(&keyword)
        .then(|| (keyword, rest.trim()))
}

fn table_cells(line: &str) -> Vec<String> {
    line.trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Replace `<column>` placeholders with the row's values.
fn substitute(
    text: &str,
    header: &[String],
    row: &[String],
    line: usize,
) -> Result<String, ScriptError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let key = &after[..end];
        let column = header
            .iter()
            .position(|h| h == key)
            .ok_or_else(|| ScriptError::UnknownPlaceholder {
                line,
                placeholder: key.to_string(),
            })?;
        out.push_str(&row[column]);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

impl RuleScript {
    /// Parse script text.
    pub fn parse(source: &str) -> Result<Self, ScriptError> {
        let mut script = RuleScript::default();
        let mut block: Option<Block> = None;

        for (idx, raw) in source.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix("Feature:") {
                if block.is_some() || !script.feature.is_empty() {
                    return Err(ScriptError::UnexpectedLine {
                        line: line_no,
                        content: line.to_string(),
                    });
                }
                script.feature = name.trim().to_string();
                continue;
            }

            if line.starts_with("Background:") {
                script.close(block.take())?;
                block = Some(Block::Background);
                continue;
            }

            if let Some(name) = line
                .strip_prefix("Scenario Outline:")
                .or_else(|| line.strip_prefix("Scenario Template:"))
            {
                script.close(block.take())?;
                block = Some(Block::Outline {
                    def: ScenarioDef {
                        name: name.trim().to_string(),
                        line: line_no,
                        steps: Vec::new(),
                    },
                    tables: Vec::new(),
                    in_examples: false,
                });
                continue;
            }

            if let Some(name) = line
                .strip_prefix("Scenario:")
                .or_else(|| line.strip_prefix("Example:"))
            {
                script.close(block.take())?;
                block = Some(Block::Scenario(ScenarioDef {
                    name: name.trim().to_string(),
                    line: line_no,
                    steps: Vec::new(),
                }));
                continue;
            }

            if line.starts_with("Examples:") || line.starts_with("Scenarios:") {
                match block.as_mut() {
                    Some(Block::Outline {
                        tables,
                        in_examples,
                        ..
                    }) => {
                        tables.push(ExampleTable {
                            header: Vec::new(),
                            rows: Vec::new(),
                        });
                        *in_examples = true;
                    }
                    _ => {
                        return Err(ScriptError::UnexpectedLine {
                            line: line_no,
                            content: line.to_string(),
                        })
                    }
                }
                continue;
            }

            if line.starts_with('|') {
                let Some(Block::Outline {
                    tables,
                    in_examples: true,
                    ..
                }) = block.as_mut()
                else {
                    return Err(ScriptError::UnexpectedLine {
                        line: line_no,
                        content: line.to_string(),
                    });
                };
                let cells = table_cells(line);
                // in_examples implies a table was pushed
                if let Some(table) = tables.last_mut() {
                    if table.header.is_empty() {
                        table.header = cells;
                    } else if cells.len() != table.header.len() {
                        return Err(ScriptError::ExampleArity {
                            line: line_no,
                            expected: table.header.len(),
                            actual: cells.len(),
                        });
                    } else {
                        table.rows.push((line_no, cells));
                    }
                }
                continue;
            }

            if let Some((keyword, text)) = split_step(line) {
                let step = ScriptStep {
                    keyword: keyword.to_string(),
                    text: text.to_string(),
                    line: line_no,
                };
                match block.as_mut() {
                    Some(Block::Background) => script.background.push(step),
                    Some(Block::Scenario(def)) => def.steps.push(step),
                    Some(Block::Outline {
                        def,
                        in_examples: false,
                        ..
                    }) => def.steps.push(step),
                    Some(Block::Outline { .. }) => {
                        return Err(ScriptError::UnexpectedLine {
                            line: line_no,
                            content: line.to_string(),
                        })
                    }
                    None => return Err(ScriptError::StepOutsideScenario { line: line_no }),
                }
                continue;
            }

            // Free-text description is only allowed between the feature
            // header and the first block.
            if block.is_none() && !script.feature.is_empty() {
                continue;
            }
            return Err(ScriptError::UnexpectedLine {
                line: line_no,
                content: line.to_string(),
            });
        }

        script.close(block)?;
        if script.scenarios.is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        Ok(script)
    }

    fn close(&mut self, block: Option<Block>) -> Result<(), ScriptError> {
        match block {
            None | Some(Block::Background) => Ok(()),
            Some(Block::Scenario(def)) => {
                self.scenarios.push(def);
                Ok(())
            }
            Some(Block::Outline { def, tables, .. }) => {
                let mut expanded = 0;
                for table in &tables {
                    for (row_line, row) in &table.rows {
                        let steps = def
                            .steps
                            .iter()
                            .map(|s| {
                                Ok(ScriptStep {
                                    keyword: s.keyword.clone(),
                                    text: substitute(&s.text, &table.header, row, s.line)?,
                                    line: s.line,
                                })
                            })
                            .collect::<Result<Vec<_>, ScriptError>>()?;
                        self.scenarios.push(ScenarioDef {
                            name: def.name.clone(),
                            line: *row_line,
                            steps,
                        });
                        expanded += 1;
                    }
                }
                if expanded == 0 {
                    return Err(ScriptError::MissingExamples {
                        line: def.line,
                        name: def.name,
                    });
                }
                Ok(())
            }
        }
    }

    /// Bind every step to a registered definition.
    pub fn compile(&self, registry: &StepRegistry) -> Result<CompiledScript, ScriptError> {
        let bind = |s: &ScriptStep| -> Result<CompiledStep, ScriptError> {
            let step = registry
                .bind(&s.text)
                .ok_or_else(|| ScriptError::UndefinedStep {
                    line: s.line,
                    text: s.text.clone(),
                })?;
            Ok(CompiledStep {
                keyword: s.keyword.clone(),
                text: s.text.clone(),
                step,
            })
        };

        let background = self
            .background
            .iter()
            .map(bind)
            .collect::<Result<Vec<_>, _>>()?;

        let scenarios = self
            .scenarios
            .iter()
            .map(|def| {
                let own = def.steps.iter().map(bind).collect::<Result<Vec<_>, _>>()?;
                Ok(CompiledScenario {
                    name: def.name.clone(),
                    steps: background.iter().cloned().chain(own).collect(),
                })
            })
            .collect::<Result<Vec<_>, ScriptError>>()?;

        Ok(CompiledScript {
            feature: self.feature.clone(),
            scenarios,
        })
    }
}

/// Parse and bind a script in one go.
pub fn compile_script(
    source: &str,
    registry: &StepRegistry,
) -> Result<CompiledScript, ScriptError> {
    RuleScript::parse(source)?.compile(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
# leading comment
Feature: sample
  Free text describing the feature.

  Background:
    Given a conformance product submission

  Scenario: layout
    Then the files are in a folder named after the release version and product name
    And there is only one release version and product folder

  Scenario Outline: required files
    Then the "<file>" file is included in the submission

    Examples:
      | file         |
      | README.md    |
      | PRODUCT.yaml |
"#;

    #[test]
    fn test_parse_expands_outline() {
        let script = RuleScript::parse(SCRIPT).unwrap();
        assert_eq!(script.feature, "sample");
        assert_eq!(script.background.len(), 1);
        let names: Vec<&str> = script.scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["layout", "required files", "required files"]);
        assert_eq!(
            script.scenarios[2].steps[0].text,
            "the \"PRODUCT.yaml\" file is included in the submission"
        );
    }

    #[test]
    fn test_compile_prepends_background() {
        let compiled = compile_script(SCRIPT, &StepRegistry::standard()).unwrap();
        assert_eq!(compiled.scenarios.len(), 3);
        assert_eq!(compiled.scenarios[0].steps.len(), 3);
        assert_eq!(compiled.scenarios[0].steps[0].step, Step::SubmissionPresent);
        assert_eq!(
            compiled.scenarios[1].steps[1].step,
            Step::RequiredFile {
                file: "README.md".to_string()
            }
        );
    }

    #[test]
    fn test_step_outside_scenario() {
        let err = RuleScript::parse("Feature: x\nGiven a conformance product submission\n")
            .unwrap_err();
        assert_eq!(err, ScriptError::StepOutsideScenario { line: 2 });
    }

    #[test]
    fn test_outline_without_examples() {
        let err = RuleScript::parse(
            "Feature: x\nScenario Outline: o\n  Then the \"<f>\" file is not empty\n",
        )
        .unwrap_err();
        assert!(matches!(err, ScriptError::MissingExamples { line: 2, .. }));
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = RuleScript::parse(
            "Feature: x\nScenario Outline: o\n  Then the \"<g>\" file is not empty\n  Examples:\n    | f |\n    | a |\n",
        )
        .unwrap_err();
        assert_eq!(
            err,
            ScriptError::UnknownPlaceholder {
                line: 3,
                placeholder: "g".to_string()
            }
        );
    }

    #[test]
    fn test_example_arity() {
        let err = RuleScript::parse(
            "Feature: x\nScenario Outline: o\n  Then the \"<f>\" file is not empty\n  Examples:\n    | f |\n    | a | b |\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScriptError::ExampleArity {
                line: 6,
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_undefined_step() {
        let err = compile_script(
            "Feature: x\nScenario: s\n  Then the moon is made of cheese\n",
            &StepRegistry::standard(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ScriptError::UndefinedStep {
                line: 3,
                text: "the moon is made of cheese".to_string()
            }
        );
    }

    #[test]
    fn test_empty_script() {
        assert_eq!(RuleScript::parse("# nothing\n").unwrap_err(), ScriptError::EmptyScript);
        assert_eq!(RuleScript::parse("Feature: x\n").unwrap_err(), ScriptError::EmptyScript);
    }

    #[test]
    fn test_stray_text_in_scenario() {
        let err = RuleScript::parse("Feature: x\nScenario: s\n  banana\n").unwrap_err();
        assert!(matches!(err, ScriptError::UnexpectedLine { line: 3, .. }));
    }
}
