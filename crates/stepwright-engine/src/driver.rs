//! The browser seam. Everything the engine needs from a browser fits in
//! the [`Driver`] trait; concrete adapters (WebDriver, mocks) live in
//! other crates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// An opaque reference to an element the driver has located. Valid until
/// the next navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub u64);

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "el#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(s: impl Into<String>) -> Self {
        Selector::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Selector::XPath(s.into())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css={}", s),
            Selector::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementAction {
    Click,
    Type(String),
    SelectOption(String),
    Hover,
    ScrollIntoView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn from_document_value(value: &str) -> Self {
        match value {
            "complete" => ReadyState::Complete,
            "interactive" => ReadyState::Interactive,
            _ => ReadyState::Loading,
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver session not ready")]
    NotReady,
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("element not interactable: {0}")]
    NotInteractable(String),
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Browser capability surface the engine depends on. Session lifecycle
/// (launch, teardown) stays on the concrete adapter.
#[async_trait]
pub trait Driver: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    async fn ready_state(&mut self) -> Result<ReadyState, DriverError>;

    /// Probe one selector. `Ok(None)` means nothing matched right now;
    /// errors are reserved for real faults (lost session, bad selector).
    async fn find_candidate(
        &mut self,
        selector: &Selector,
    ) -> Result<Option<ElementHandle>, DriverError>;

    async fn wait_visible(
        &mut self,
        handle: ElementHandle,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    /// Perform an action. Interactability (visible, enabled) is checked
    /// here, not during resolution.
    async fn act(
        &mut self,
        handle: ElementHandle,
        action: &ElementAction,
    ) -> Result<(), DriverError>;

    async fn text_of(&mut self, handle: ElementHandle) -> Result<String, DriverError>;

    async fn screenshot(&mut self, path: &Path) -> Result<(), DriverError>;

    async fn evaluate_script(&mut self, script: &str) -> Result<serde_json::Value, DriverError>;
}
