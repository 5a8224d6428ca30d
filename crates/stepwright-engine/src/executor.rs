//! Drives one scenario against one driver session, fail-fast.
//!
//! The executor is a small state machine: Idle, Navigating, Running(i),
//! then Completed or Aborted. The first failing step aborts the
//! scenario; steps after the failure are neither run nor reported, so a
//! scenario result never claims anything about steps it did not reach.

use crate::driver::{Driver, ElementAction, ElementHandle, ReadyState, Selector};
use crate::hints::StructureHints;
use crate::resolver::{ElementResolver, ResolveError, Resolved};
use crate::scenario::Scenario;
use crate::step::{ActionKind, Step, StepAssertion, WaitCondition};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StepError {
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("action failed: {0}")]
    Action(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl StepError {
    pub fn kind(&self) -> &'static str {
        match self {
            StepError::ElementNotFound(_) => "element-not-found",
            StepError::Action(_) => "action",
            StepError::Validation(_) => "validation",
        }
    }
}

fn not_found_message(target: &str, candidates: usize, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(selector) => format!(
            "no element matched '{}' after {} candidates; closest known selector: {}",
            target, candidates, selector
        ),
        None => format!(
            "no element matched '{}' after {} candidates",
            target, candidates
        ),
    }
}

impl From<ResolveError> for StepError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound {
                target,
                candidates,
                suggestion,
            } => StepError::ElementNotFound(not_found_message(
                &target,
                candidates,
                suggestion.as_deref(),
            )),
            ResolveError::Driver(e) => StepError::Action(e.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub step: Step,
    pub succeeded: bool,
    pub error: Option<StepError>,
    pub elapsed_ms: u64,
    pub screenshot: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub results: Vec<StepResult>,
    pub aborted: bool,
    pub aborted_at: Option<usize>,
    pub navigation_error: Option<String>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        !self.aborted && self.navigation_error.is_none()
    }

    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Idle,
    Navigating,
    Running(usize),
    Completed,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Pause after each successful step, letting the page settle.
    pub settle_delay: Duration,
    pub page_load_timeout: Duration,
    /// Where failure screenshots land; None disables them.
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            page_load_timeout: Duration::from_secs(30),
            screenshot_dir: None,
        }
    }
}

const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);
const VISIBILITY_WAIT: Duration = Duration::from_secs(2);
const DEFAULT_SCROLL_STEP_PX: i64 = 600;

pub struct ScenarioExecutor<'d, D: Driver + ?Sized> {
    driver: &'d mut D,
    resolver: ElementResolver,
    config: ExecutorConfig,
    hints: StructureHints,
    cancel: Arc<AtomicBool>,
    state: ExecState,
}

impl<'d, D: Driver + ?Sized> ScenarioExecutor<'d, D> {
    pub fn new(driver: &'d mut D, config: ExecutorConfig) -> Self {
        Self {
            driver,
            resolver: ElementResolver::new(),
            config,
            hints: StructureHints::default(),
            cancel: Arc::new(AtomicBool::new(false)),
            state: ExecState::Idle,
        }
    }

    pub fn with_hints(mut self, hints: StructureHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_resolver(mut self, resolver: ElementResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Flag callers can set from another task to stop the run. Checked
    /// only between steps; a step already in flight finishes first.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    /// Run a scenario start to finish. Always returns a complete record
    /// of every step that was attempted.
    pub async fn run(&mut self, scenario: &Scenario, base_url: &str) -> ScenarioResult {
        let mut result = ScenarioResult {
            name: scenario.name.clone(),
            results: Vec::new(),
            aborted: false,
            aborted_at: None,
            navigation_error: None,
        };

        let mut hints = self.hints.clone();
        hints.merge_front(scenario.hints.clone());

        info!(scenario = %scenario.name, steps = scenario.steps.len(), "starting scenario");

        self.state = ExecState::Navigating;
        if let Err(message) = self.navigate_and_settle(base_url).await {
            warn!(scenario = %scenario.name, %message, "navigation failed, aborting");
            result.navigation_error = Some(message);
            result.aborted = true;
            self.state = ExecState::Aborted;
            return result;
        }

        for (index, step) in scenario.steps.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                info!(scenario = %scenario.name, at = index, "cancelled");
                result.aborted = true;
                result.aborted_at = Some(index);
                self.state = ExecState::Aborted;
                return result;
            }

            self.state = ExecState::Running(index);
            let started = Instant::now();
            match self.execute_step(step, &hints).await {
                Ok(()) => {
                    info!(step = %step.raw_text, "step passed");
                    result.results.push(StepResult {
                        step: step.clone(),
                        succeeded: true,
                        error: None,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                        screenshot: None,
                    });
                    tokio::time::sleep(self.config.settle_delay).await;
                }
                Err(step_error) => {
                    error!(step = %step.raw_text, error = %step_error, "step failed, aborting scenario");
                    let screenshot = self.capture_failure(&scenario.name, index).await;
                    result.results.push(StepResult {
                        step: step.clone(),
                        succeeded: false,
                        error: Some(step_error),
                        elapsed_ms: started.elapsed().as_millis() as u64,
                        screenshot,
                    });
                    result.aborted = true;
                    result.aborted_at = Some(index);
                    self.state = ExecState::Aborted;
                    return result;
                }
            }
        }

        self.state = ExecState::Completed;
        result
    }

    async fn navigate_and_settle(&mut self, url: &str) -> Result<(), String> {
        self.driver
            .navigate(url)
            .await
            .map_err(|e| e.to_string())?;

        let deadline = Instant::now() + self.config.page_load_timeout;
        loop {
            match self.driver.ready_state().await {
                Ok(ReadyState::Complete) => return Ok(()),
                Ok(_) => {}
                Err(e) => return Err(e.to_string()),
            }
            if Instant::now() >= deadline {
                return Err(format!(
                    "page did not finish loading within {}s",
                    self.config.page_load_timeout.as_secs()
                ));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn execute_step(&mut self, step: &Step, hints: &StructureHints) -> Result<(), StepError> {
        self.perform(step, hints).await?;
        self.run_checks(step).await
    }

    async fn perform(&mut self, step: &Step, hints: &StructureHints) -> Result<(), StepError> {
        let budget = Duration::from_secs(step.timeout_secs);
        match step.action {
            ActionKind::Click => {
                let found = self.resolve_ready(step, hints, budget).await?;
                self.act(found, &ElementAction::Click).await
            }
            ActionKind::Hover => {
                let found = self.resolve_ready(step, hints, budget).await?;
                self.act(found, &ElementAction::Hover).await
            }
            ActionKind::Type => {
                let value = required_value(step)?;
                let found = self.resolve_ready(step, hints, budget).await?;
                self.act(found, &ElementAction::Type(value)).await
            }
            ActionKind::Select => {
                let value = required_value(step)?;
                let found = self.resolve_ready(step, hints, budget).await?;
                self.act(found, &ElementAction::SelectOption(value)).await
            }
            ActionKind::Verify | ActionKind::Assert => self.check(step, hints, budget).await,
            ActionKind::Wait => self.wait(step, hints, budget).await,
            ActionKind::Scroll => self.scroll(step, hints, budget).await,
        }
    }

    async fn resolve(
        &mut self,
        step: &Step,
        hints: &StructureHints,
        budget: Duration,
    ) -> Result<Resolved, StepError> {
        Ok(self
            .resolver
            .resolve(self.driver, &step.target, Some(hints), budget)
            .await?)
    }

    /// Resolve, then honor the step's readiness condition. Presence is
    /// already established by resolution; visible/clickable wait for the
    /// element to be displayed before the action fires.
    async fn resolve_ready(
        &mut self,
        step: &Step,
        hints: &StructureHints,
        budget: Duration,
    ) -> Result<Resolved, StepError> {
        let found = self.resolve(step, hints, budget).await?;
        if step.wait != WaitCondition::ElementPresent {
            self.driver
                .wait_visible(found.handle, VISIBILITY_WAIT)
                .await
                .map_err(|e| {
                    StepError::Action(format!("'{}' did not become visible: {}", step.target, e))
                })?;
        }
        Ok(found)
    }

    async fn act(&mut self, found: Resolved, action: &ElementAction) -> Result<(), StepError> {
        self.driver
            .act(found.handle, action)
            .await
            .map_err(|e| StepError::Action(format!("{} via {}: {}", found.handle, found.selector, e)))
    }

    /// Verify and Assert share semantics; both fail with a validation
    /// error so the report distinguishes "broken page" from "wrong
    /// content".
    async fn check(
        &mut self,
        step: &Step,
        hints: &StructureHints,
        budget: Duration,
    ) -> Result<(), StepError> {
        let found = self
            .resolver
            .resolve(self.driver, &step.target, Some(hints), budget)
            .await
            .map_err(|e| StepError::Validation(StepError::from(e).to_string()))?;

        match &step.value {
            None => self
                .driver
                .wait_visible(found.handle, VISIBILITY_WAIT)
                .await
                .map_err(|e| {
                    StepError::Validation(format!("'{}' is not visible: {}", step.target, e))
                }),
            Some(expected) => {
                let actual = self
                    .driver
                    .text_of(found.handle)
                    .await
                    .map_err(|e| StepError::Action(e.to_string()))?;
                if actual.to_lowercase().contains(&expected.to_lowercase()) {
                    Ok(())
                } else {
                    Err(StepError::Validation(format!(
                        "'{}' does not contain '{}' (actual text: '{}')",
                        step.target,
                        expected,
                        truncate(&actual, 120)
                    )))
                }
            }
        }
    }

    async fn wait(
        &mut self,
        step: &Step,
        hints: &StructureHints,
        budget: Duration,
    ) -> Result<(), StepError> {
        if step.target == "page" {
            tokio::time::sleep(budget).await;
            return Ok(());
        }
        let found = self.resolve(step, hints, budget).await?;
        self.driver
            .wait_visible(found.handle, VISIBILITY_WAIT)
            .await
            .map_err(|e| StepError::Action(e.to_string()))
    }

    async fn scroll(
        &mut self,
        step: &Step,
        hints: &StructureHints,
        budget: Duration,
    ) -> Result<(), StepError> {
        let container = hints.dynamic.scroll_container.as_deref();
        let script = match step.target.as_str() {
            "down till end" => Some(scroll_to_edge_script(container, true)),
            "up till top" => Some(scroll_to_edge_script(container, false)),
            "up" | "down" | "left" | "right" => {
                let amount: i64 = step
                    .value
                    .as_deref()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SCROLL_STEP_PX);
                let (dx, dy) = match step.target.as_str() {
                    "up" => (0, -amount),
                    "down" => (0, amount),
                    "left" => (-amount, 0),
                    _ => (amount, 0),
                };
                Some(format!("window.scrollBy({}, {});", dx, dy))
            }
            _ => None,
        };

        match script {
            Some(script) => {
                self.driver
                    .evaluate_script(&script)
                    .await
                    .map_err(|e| StepError::Action(format!("scroll failed: {}", e)))?;
                Ok(())
            }
            None => {
                let found = self.resolve(step, hints, budget).await?;
                self.act(found, &ElementAction::ScrollIntoView).await
            }
        }
    }

    /// Run the step's `automation.assertions` after its action succeeds.
    /// These name explicit selectors, so resolution is a single probe
    /// with no tier fallback.
    async fn run_checks(&mut self, step: &Step) -> Result<(), StepError> {
        for check in &step.checks {
            match check {
                StepAssertion::ElementVisible { selector } => {
                    let handle = self.require_match(selector).await?;
                    self.driver
                        .wait_visible(handle, VISIBILITY_WAIT)
                        .await
                        .map_err(|e| {
                            StepError::Validation(format!("'{}' is not visible: {}", selector, e))
                        })?;
                }
                StepAssertion::TextPresent { selector, text } => {
                    let handle = self.require_match(selector).await?;
                    let actual = self
                        .driver
                        .text_of(handle)
                        .await
                        .map_err(|e| StepError::Action(e.to_string()))?;
                    if !actual.to_lowercase().contains(&text.to_lowercase()) {
                        return Err(StepError::Validation(format!(
                            "'{}' does not contain '{}' (actual text: '{}')",
                            selector,
                            text,
                            truncate(&actual, 120)
                        )));
                    }
                }
                StepAssertion::MinimumElements { selector, count } => {
                    let escaped = selector.replace('\\', "\\\\").replace('\'', "\\'");
                    let value = self
                        .driver
                        .evaluate_script(&format!(
                            "return document.querySelectorAll('{}').length;",
                            escaped
                        ))
                        .await
                        .map_err(|e| StepError::Action(e.to_string()))?;
                    let matched = value.as_u64().unwrap_or(0);
                    if matched < *count {
                        return Err(StepError::Validation(format!(
                            "expected at least {} elements matching '{}', found {}",
                            count, selector, matched
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    async fn require_match(&mut self, selector: &str) -> Result<ElementHandle, StepError> {
        self.driver
            .find_candidate(&Selector::css(selector.to_string()))
            .await
            .map_err(|e| StepError::Action(e.to_string()))?
            .ok_or_else(|| StepError::Validation(format!("no element matched '{}'", selector)))
    }

    /// Best-effort diagnostic; a screenshot failure is logged and never
    /// replaces the step error.
    async fn capture_failure(&mut self, scenario_name: &str, index: usize) -> Option<PathBuf> {
        let dir = self.config.screenshot_dir.clone()?;
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(error = %e, "could not create screenshot directory");
            return None;
        }
        let path = dir.join(format!("error_{}_{}.png", sanitize(scenario_name), index));
        match self.driver.screenshot(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(error = %e, "failure screenshot could not be captured");
                None
            }
        }
    }
}

fn required_value(step: &Step) -> Result<String, StepError> {
    step.value.clone().ok_or_else(|| {
        StepError::Validation(format!("step '{}' has no value to use", step.raw_text))
    })
}

fn scroll_to_edge_script(container: Option<&str>, to_bottom: bool) -> String {
    match container {
        Some(sel) => {
            let sel = sel.replace('\\', "\\\\").replace('\'', "\\'");
            if to_bottom {
                format!(
                    "const c = document.querySelector('{}'); if (c) c.scrollTo(0, c.scrollHeight);",
                    sel
                )
            } else {
                format!("const c = document.querySelector('{}'); if (c) c.scrollTo(0, 0);", sel)
            }
        }
        None => {
            if to_bottom {
                "window.scrollTo(0, document.body.scrollHeight);".to_string()
            } else {
                "window.scrollTo(0, 0);".to_string()
            }
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
