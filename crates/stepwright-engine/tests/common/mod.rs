#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stepwright_engine::driver::{
    Driver, DriverError, ElementAction, ElementHandle, ReadyState, Selector,
};

pub struct MockElement {
    pub visible: bool,
    pub enabled: bool,
    pub text: String,
}

/// In-memory driver that records everything the engine asks of it.
/// Elements are registered under the display form of their selector
/// (e.g. `css=#email`).
pub struct MockDriver {
    elements: HashMap<String, u64>,
    meta: HashMap<u64, MockElement>,
    next_id: u64,
    /// Selectors that the fake page rejects as unparseable.
    pub invalid_selectors: HashSet<String>,
    /// Selector that triggers a hard driver fault when probed.
    pub fault_on_probe: Option<String>,
    pub fail_navigation: bool,
    /// Clicking the handle makes the named selector start matching.
    pub reveal_on_click: HashMap<u64, String>,
    pending_reveals: HashMap<String, u64>,

    /// What `evaluate_script` answers with.
    pub script_result: serde_json::Value,

    pub probes: Vec<String>,
    pub actions: Vec<(u64, ElementAction)>,
    pub waits: Vec<u64>,
    pub navigations: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub scripts: Vec<String>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
            meta: HashMap::new(),
            next_id: 1,
            invalid_selectors: HashSet::new(),
            fault_on_probe: None,
            fail_navigation: false,
            reveal_on_click: HashMap::new(),
            pending_reveals: HashMap::new(),
            script_result: serde_json::Value::Null,
            probes: Vec::new(),
            actions: Vec::new(),
            waits: Vec::new(),
            navigations: Vec::new(),
            screenshots: Vec::new(),
            scripts: Vec::new(),
        }
    }

    pub fn add_element(&mut self, selector_key: &str) -> u64 {
        self.add_element_with_text(selector_key, "")
    }

    pub fn add_element_with_text(&mut self, selector_key: &str, text: &str) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.elements.insert(selector_key.to_string(), id);
        self.meta.insert(
            id,
            MockElement {
                visible: true,
                enabled: true,
                text: text.to_string(),
            },
        );
        id
    }

    /// Register an element that only starts matching after `trigger` is
    /// clicked.
    pub fn add_hidden_until_click(&mut self, selector_key: &str, trigger: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.meta.insert(
            id,
            MockElement {
                visible: true,
                enabled: true,
                text: String::new(),
            },
        );
        self.reveal_on_click
            .insert(trigger, selector_key.to_string());
        self.pending_reveals.insert(selector_key.to_string(), id);
        id
    }

    pub fn set_disabled(&mut self, id: u64) {
        if let Some(meta) = self.meta.get_mut(&id) {
            meta.enabled = false;
        }
    }

    pub fn clicks(&self) -> Vec<u64> {
        self.actions
            .iter()
            .filter(|(_, a)| matches!(a, ElementAction::Click))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        if self.fail_navigation {
            return Err(DriverError::Navigation(format!(
                "could not reach {}",
                url
            )));
        }
        self.navigations.push(url.to_string());
        Ok(())
    }

    async fn ready_state(&mut self) -> Result<ReadyState, DriverError> {
        Ok(ReadyState::Complete)
    }

    async fn find_candidate(
        &mut self,
        selector: &Selector,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let key = selector.to_string();
        self.probes.push(key.clone());
        if self.invalid_selectors.contains(&key) {
            return Err(DriverError::InvalidSelector {
                selector: key,
                reason: "unparseable".to_string(),
            });
        }
        if self.fault_on_probe.as_deref() == Some(key.as_str()) {
            return Err(DriverError::Other("session lost".to_string()));
        }
        Ok(self.elements.get(&key).copied().map(ElementHandle))
    }

    async fn wait_visible(
        &mut self,
        handle: ElementHandle,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        self.waits.push(handle.0);
        match self.meta.get(&handle.0) {
            Some(meta) if meta.visible => Ok(()),
            Some(_) => Err(DriverError::Timeout(format!("{} visibility", handle))),
            None => Err(DriverError::Other(format!("unknown handle {}", handle))),
        }
    }

    async fn act(
        &mut self,
        handle: ElementHandle,
        action: &ElementAction,
    ) -> Result<(), DriverError> {
        let meta = self
            .meta
            .get(&handle.0)
            .ok_or_else(|| DriverError::Other(format!("unknown handle {}", handle)))?;
        let interactive = matches!(
            action,
            ElementAction::Click
                | ElementAction::Type(_)
                | ElementAction::SelectOption(_)
                | ElementAction::Hover
        );
        if interactive && !(meta.visible && meta.enabled) {
            return Err(DriverError::NotInteractable(format!(
                "{} is hidden or disabled",
                handle
            )));
        }
        self.actions.push((handle.0, action.clone()));

        if matches!(action, ElementAction::Click) {
            if let Some(revealed) = self.reveal_on_click.remove(&handle.0) {
                if let Some(id) = self.pending_reveals.remove(&revealed) {
                    self.elements.insert(revealed, id);
                }
            }
        }
        Ok(())
    }

    async fn text_of(&mut self, handle: ElementHandle) -> Result<String, DriverError> {
        self.meta
            .get(&handle.0)
            .map(|m| m.text.clone())
            .ok_or_else(|| DriverError::Other(format!("unknown handle {}", handle)))
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), DriverError> {
        self.screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn evaluate_script(&mut self, script: &str) -> Result<serde_json::Value, DriverError> {
        self.scripts.push(script.to_string());
        Ok(self.script_result.clone())
    }
}
