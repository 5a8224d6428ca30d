//! Scenario files: YAML documents holding named lists of steps.
//!
//! A step is either a plain string handed to the grammar, or a map that
//! spells out the action explicitly and may carry an `automation` block
//! with a known-good selector. Explicit selectors become scenario-scoped
//! structure hints so resolution tries them first.

use crate::hints::{HintCategory, StructureHint};
use crate::parser::{normalize_target, StepParser};
use crate::step::{
    ActionKind, ParseWarning, Step, StepAssertion, WaitCondition, DEFAULT_STEP_TIMEOUT_SECS,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario path not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    scenarios: Vec<ScenarioSpec>,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioSpec {
    #[serde(default = "default_scenario_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

fn default_scenario_name() -> String {
    "Unnamed Scenario".to_string()
}

/// One entry under `steps:` — a bare instruction string or the detailed
/// map form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Text(String),
    Detailed(DetailedStep),
}

#[derive(Debug, Deserialize)]
pub struct DetailedStep {
    #[serde(default)]
    pub description: String,
    pub action: String,
    pub target: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub automation: Option<AutomationSpec>,
}

#[derive(Debug, Deserialize)]
pub struct AutomationSpec {
    pub selector: String,
    #[serde(default)]
    pub wait_for: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub assertions: Vec<AssertionSpec>,
}

/// One entry under `automation.assertions`. Kept loose so a bad entry
/// warns and skips instead of failing the whole file.
#[derive(Debug, Deserialize)]
pub struct AssertionSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// A compiled scenario, ready for the executor.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub steps: Vec<Step>,
    /// Hints contributed by `automation.selector` entries, scoped to this
    /// scenario only.
    pub hints: Vec<StructureHint>,
}

impl Scenario {
    /// Compile a parsed spec. Steps that fail to compile are skipped and
    /// returned as warnings; the rest of the scenario survives.
    pub fn compile(spec: ScenarioSpec) -> (Scenario, Vec<ParseWarning>) {
        let parser = StepParser::new();
        let mut steps = Vec::with_capacity(spec.steps.len());
        let mut hints = Vec::new();
        let mut warnings = Vec::new();

        for entry in spec.steps {
            match entry {
                StepSpec::Text(text) => match parser.parse_step(&text) {
                    Ok(step) => steps.push(step),
                    Err(warning) => warnings.push(warning),
                },
                StepSpec::Detailed(detail) => match compile_detailed(detail, &mut warnings) {
                    Ok((step, hint)) => {
                        steps.push(step);
                        hints.extend(hint);
                    }
                    Err(warning) => warnings.push(warning),
                },
            }
        }

        (
            Scenario {
                name: spec.name,
                description: spec.description,
                tags: spec.tags,
                steps,
                hints,
            },
            warnings,
        )
    }
}

impl Scenario {
    /// Rewrite steps still on the built-in timeout to a configured one.
    /// Steps that named their own timeout keep it.
    pub fn apply_default_timeout(&mut self, secs: u64) {
        for step in &mut self.steps {
            if step.timeout_secs == DEFAULT_STEP_TIMEOUT_SECS {
                step.timeout_secs = secs;
            }
        }
    }
}

fn compile_detailed(
    detail: DetailedStep,
    warnings: &mut Vec<ParseWarning>,
) -> Result<(Step, Option<StructureHint>), ParseWarning> {
    let raw = if detail.description.is_empty() {
        format!("{} {}", detail.action, detail.target)
    } else {
        detail.description.clone()
    };
    let action = ActionKind::from_name(&detail.action).ok_or(ParseWarning::UnknownAction {
        text: raw.clone(),
        action: detail.action.clone(),
    })?;
    let target = normalize_target(&detail.target);
    if target.is_empty() {
        return Err(ParseWarning::MissingTarget { text: raw });
    }

    let mut step = Step::new(raw.clone(), action, target.clone());
    if let Some(value) = detail.value {
        step = step.with_value(value);
    }
    let timeout = detail
        .timeout
        .or(detail.automation.as_ref().and_then(|a| a.timeout))
        .unwrap_or(DEFAULT_STEP_TIMEOUT_SECS);
    step = step.with_timeout(timeout);

    if let Some(auto) = &detail.automation {
        if let Some(wait_for) = &auto.wait_for {
            match WaitCondition::from_name(wait_for) {
                Some(condition) => step = step.with_wait(condition),
                None => debug!(step = %raw, %wait_for, "unknown wait_for condition, keeping presence"),
            }
        }
        let mut checks = Vec::new();
        for spec in &auto.assertions {
            match compile_assertion(&raw, spec) {
                Ok(check) => checks.push(check),
                Err(warning) => warnings.push(warning),
            }
        }
        step = step.with_checks(checks);
    }

    let hint = detail.automation.map(|auto| StructureHint {
        keyword: target,
        selector: auto.selector,
        category: HintCategory::Other,
    });
    Ok((step, hint))
}

/// A malformed assertion drops only itself; the step still runs.
fn compile_assertion(step_text: &str, spec: &AssertionSpec) -> Result<StepAssertion, ParseWarning> {
    let invalid = |detail: String| ParseWarning::InvalidAssertion {
        text: step_text.to_string(),
        detail,
    };
    let selector = spec
        .selector
        .clone()
        .ok_or_else(|| invalid(format!("'{}' needs a selector", spec.kind)));
    match spec.kind.as_str() {
        "element_visible" => Ok(StepAssertion::ElementVisible {
            selector: selector?,
        }),
        "text_present" => Ok(StepAssertion::TextPresent {
            selector: selector?,
            text: spec
                .text
                .clone()
                .ok_or_else(|| invalid("'text_present' needs text".to_string()))?,
        }),
        "minimum_elements" => Ok(StepAssertion::MinimumElements {
            selector: selector?,
            count: spec
                .count
                .ok_or_else(|| invalid("'minimum_elements' needs a count".to_string()))?,
        }),
        other => Err(invalid(format!("unknown assertion type '{}'", other))),
    }
}

/// Parse one YAML document into compiled scenarios.
pub fn parse_scenarios(
    yaml: &str,
    origin: &Path,
) -> Result<Vec<(Scenario, Vec<ParseWarning>)>, ScenarioError> {
    let file: ScenarioFile = serde_yaml::from_str(yaml).map_err(|source| ScenarioError::Yaml {
        path: origin.to_path_buf(),
        source,
    })?;
    Ok(file.scenarios.into_iter().map(Scenario::compile).collect())
}

/// Load scenarios from a file, or from every `*.yaml` / `*.yml` in a
/// directory (sorted for a stable run order).
pub async fn load_scenarios(
    path: &Path,
) -> Result<Vec<(Scenario, Vec<ParseWarning>)>, ScenarioError> {
    if path.is_file() {
        return load_file(path).await;
    }
    if !path.is_dir() {
        return Err(ScenarioError::NotFound(path.to_path_buf()));
    }

    let mut files = Vec::new();
    for pattern in ["*.yaml", "*.yml"] {
        let full = path.join(pattern);
        for entry in glob::glob(&full.to_string_lossy())? {
            match entry {
                Ok(p) => files.push(p),
                Err(e) => debug!("skipping unreadable scenario file: {}", e),
            }
        }
    }
    files.sort();

    let mut scenarios = Vec::new();
    for file in files {
        scenarios.extend(load_file(&file).await?);
    }
    Ok(scenarios)
}

async fn load_file(path: &Path) -> Result<Vec<(Scenario, Vec<ParseWarning>)>, ScenarioError> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_scenarios(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_text_steps_and_surfaces_warnings() {
        let yaml = r#"
scenarios:
  - name: Login flow
    steps:
      - Click the login button
      - do something impossible
      - Type admin into username
"#;
        let mut parsed = parse_scenarios(yaml, Path::new("inline")).unwrap();
        assert_eq!(parsed.len(), 1);
        let (scenario, warnings) = parsed.remove(0);
        assert_eq!(scenario.name, "Login flow");
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], ParseWarning::Unrecognized { .. }));
    }

    #[test]
    fn detailed_step_with_automation_selector_becomes_hint() {
        let yaml = r#"
scenarios:
  - name: Checkout
    steps:
      - description: Submit the order
        action: click
        target: place order
        automation:
          selector: "button[data-testid='place-order']"
          timeout: 20
"#;
        let (scenario, warnings) = parse_scenarios(yaml, Path::new("inline"))
            .unwrap()
            .remove(0);
        assert!(warnings.is_empty());
        assert_eq!(scenario.steps.len(), 1);
        assert_eq!(scenario.steps[0].action, ActionKind::Click);
        assert_eq!(scenario.steps[0].target, "place order");
        assert_eq!(scenario.steps[0].timeout_secs, 20);
        assert_eq!(scenario.hints.len(), 1);
        assert_eq!(
            scenario.hints[0].selector,
            "button[data-testid='place-order']"
        );
    }

    #[test]
    fn automation_assertions_and_wait_become_step_fields() {
        let yaml = r##"
scenarios:
  - name: Save flow
    steps:
      - description: Save the draft
        action: click
        target: save
        automation:
          selector: "#save"
          wait_for: element_visible
          assertions:
            - type: text_present
              selector: "#status"
              text: Saved
            - type: minimum_elements
              selector: ".revision"
              count: 2
"##;
        let (scenario, warnings) = parse_scenarios(yaml, Path::new("inline"))
            .unwrap()
            .remove(0);
        assert!(warnings.is_empty());
        let step = &scenario.steps[0];
        assert_eq!(step.wait, WaitCondition::ElementVisible);
        assert_eq!(
            step.checks,
            vec![
                StepAssertion::TextPresent {
                    selector: "#status".to_string(),
                    text: "Saved".to_string(),
                },
                StepAssertion::MinimumElements {
                    selector: ".revision".to_string(),
                    count: 2,
                },
            ]
        );
    }

    #[test]
    fn bad_assertion_warns_and_keeps_the_step() {
        let yaml = r##"
scenarios:
  - name: Odd
    steps:
      - action: click
        target: save
        automation:
          selector: "#save"
          assertions:
            - type: glows
              selector: "#save"
            - type: element_visible
              selector: "#status"
"##;
        let (scenario, warnings) = parse_scenarios(yaml, Path::new("inline"))
            .unwrap()
            .remove(0);
        assert_eq!(scenario.steps.len(), 1);
        // Only the malformed assertion is dropped.
        assert_eq!(
            scenario.steps[0].checks,
            vec![StepAssertion::ElementVisible {
                selector: "#status".to_string(),
            }]
        );
        assert!(matches!(
            warnings[0],
            ParseWarning::InvalidAssertion { .. }
        ));
    }

    #[test]
    fn detailed_step_with_unknown_action_warns() {
        let yaml = r#"
scenarios:
  - name: Bad
    steps:
      - action: teleport
        target: somewhere
"#;
        let (scenario, warnings) = parse_scenarios(yaml, Path::new("inline"))
            .unwrap()
            .remove(0);
        assert!(scenario.steps.is_empty());
        assert!(matches!(warnings[0], ParseWarning::UnknownAction { .. }));
    }

    #[test]
    fn missing_name_defaults() {
        let yaml = r#"
scenarios:
  - steps:
      - wait
"#;
        let (scenario, _) = parse_scenarios(yaml, Path::new("inline"))
            .unwrap()
            .remove(0);
        assert_eq!(scenario.name, "Unnamed Scenario");
    }
}
