use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The action categories a step can compile to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Type,
    Select,
    Verify,
    Wait,
    Scroll,
    Hover,
    Assert,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Select => "select",
            ActionKind::Verify => "verify",
            ActionKind::Wait => "wait",
            ActionKind::Scroll => "scroll",
            ActionKind::Hover => "hover",
            ActionKind::Assert => "assert",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "click" | "tap" | "press" => Some(ActionKind::Click),
            "type" | "enter" | "fill" | "input" => Some(ActionKind::Type),
            "select" | "choose" => Some(ActionKind::Select),
            "verify" | "check" | "confirm" => Some(ActionKind::Verify),
            "wait" => Some(ActionKind::Wait),
            "scroll" => Some(ActionKind::Scroll),
            "hover" => Some(ActionKind::Hover),
            "assert" | "ensure" | "expect" => Some(ActionKind::Assert),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 10;

/// Readiness condition from the detailed form's `automation.wait_for`.
/// Resolution already establishes presence; the stricter conditions make
/// the executor wait for visibility after resolving, before acting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    #[default]
    ElementPresent,
    ElementVisible,
    ElementClickable,
}

impl WaitCondition {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "element_present" => Some(WaitCondition::ElementPresent),
            "element_visible" => Some(WaitCondition::ElementVisible),
            "element_clickable" => Some(WaitCondition::ElementClickable),
            _ => None,
        }
    }
}

/// A post-step validation from the detailed form's `automation` block.
/// Unlike the step target, these name explicit CSS selectors and run
/// after the step's own action succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAssertion {
    ElementVisible { selector: String },
    TextPresent { selector: String, text: String },
    MinimumElements { selector: String, count: u64 },
}

/// A single compiled step: one action against one target.
///
/// `target` is normalized (trimmed, lowercased, whitespace collapsed);
/// `value` keeps the casing and spacing the author wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub raw_text: String,
    pub action: ActionKind,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub timeout_secs: u64,
    #[serde(default)]
    pub wait: WaitCondition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<StepAssertion>,
}

impl Step {
    pub fn new(raw_text: impl Into<String>, action: ActionKind, target: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            action,
            target: target.into(),
            value: None,
            timeout_secs: DEFAULT_STEP_TIMEOUT_SECS,
            wait: WaitCondition::default(),
            checks: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_wait(mut self, wait: WaitCondition) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_checks(mut self, checks: Vec<StepAssertion>) -> Self {
        self.checks = checks;
        self
    }
}

/// A step that could not be compiled. Callers log these and skip the
/// step; they are never silently dropped and never abort the scenario.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseWarning {
    #[error("unrecognized step '{text}': no grammar rule matched")]
    Unrecognized { text: String },
    #[error("step '{text}' is missing a target")]
    MissingTarget { text: String },
    #[error("step '{text}' uses unknown action '{action}'")]
    UnknownAction { text: String, action: String },
    #[error("step '{text}' has an invalid assertion: {detail}")]
    InvalidAssertion { text: String, detail: String },
}

impl ParseWarning {
    pub fn text(&self) -> &str {
        match self {
            ParseWarning::Unrecognized { text }
            | ParseWarning::MissingTarget { text }
            | ParseWarning::UnknownAction { text, .. }
            | ParseWarning::InvalidAssertion { text, .. } => text,
        }
    }
}
