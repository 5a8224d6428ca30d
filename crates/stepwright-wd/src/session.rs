//! `Driver` implementation over a live WebDriver endpoint.

use crate::caps;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use stepwright_engine::driver::{
    Driver, DriverError, ElementAction, ElementHandle, ReadyState, Selector,
};
use tokio::time::Instant;
use tracing::{debug, info};

const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct WebDriverSession {
    client: Option<Client>,
    elements: HashMap<u64, Element>,
    next_handle: u64,
    webdriver_url: String,
    browser: String,
    headless: bool,
    window_size: (u32, u32),
}

impl WebDriverSession {
    pub fn new(
        webdriver_url: impl Into<String>,
        browser: impl Into<String>,
        headless: bool,
        window_size: (u32, u32),
    ) -> Self {
        Self {
            client: None,
            elements: HashMap::new(),
            next_handle: 1,
            webdriver_url: webdriver_url.into(),
            browser: browser.into(),
            headless,
            window_size,
        }
    }

    pub async fn launch(&mut self) -> Result<(), DriverError> {
        let caps = caps::capabilities(&self.browser, self.headless, self.window_size)
            .map_err(DriverError::Other)?;
        info!(
            url = %self.webdriver_url,
            browser = %self.browser,
            headless = self.headless,
            "connecting to WebDriver"
        );
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| {
                DriverError::Other(format!(
                    "failed to connect to WebDriver at {}: {}",
                    self.webdriver_url, e
                ))
            })?;
        self.client = Some(client);
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), DriverError> {
        self.elements.clear();
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| DriverError::Other(format!("failed to close session: {}", e)))?;
        }
        Ok(())
    }

    fn client(&mut self) -> Result<&mut Client, DriverError> {
        self.client.as_mut().ok_or(DriverError::NotReady)
    }

    fn element(&self, handle: ElementHandle) -> Result<Element, DriverError> {
        self.elements
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| DriverError::Other(format!("stale element handle {}", handle)))
    }

    fn register(&mut self, element: Element) -> ElementHandle {
        let handle = ElementHandle(self.next_handle);
        self.next_handle += 1;
        self.elements.insert(handle.0, element);
        handle
    }

    async fn ensure_interactable(&mut self, element: &Element) -> Result<(), DriverError> {
        let displayed = element
            .is_displayed()
            .await
            .map_err(|e| DriverError::Other(e.to_string()))?;
        if !displayed {
            return Err(DriverError::NotInteractable("element is not visible".into()));
        }
        let enabled = element
            .is_enabled()
            .await
            .map_err(|e| DriverError::Other(e.to_string()))?;
        if !enabled {
            return Err(DriverError::NotInteractable("element is disabled".into()));
        }
        Ok(())
    }

    async fn execute_on(
        &mut self,
        element: &Element,
        script: &str,
    ) -> Result<(), DriverError> {
        let arg = serde_json::to_value(element)
            .map_err(|e| DriverError::Script(format!("element serialization: {}", e)))?;
        self.client()?
            .execute(script, vec![arg])
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(())
    }
}

fn action_error(e: fantoccini::error::CmdError) -> DriverError {
    let message = e.to_string();
    if message.contains("element not interactable") || message.contains("not clickable") {
        DriverError::NotInteractable(message)
    } else {
        DriverError::Other(message)
    }
}

#[async_trait]
impl Driver for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        // Old handles point into the page being left behind.
        self.elements.clear();
        info!(%url, "navigating");
        self.client()?
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))
    }

    async fn ready_state(&mut self) -> Result<ReadyState, DriverError> {
        let value = self
            .client()?
            .execute("return document.readyState;", vec![])
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(ReadyState::from_document_value(
            value.as_str().unwrap_or("loading"),
        ))
    }

    async fn find_candidate(
        &mut self,
        selector: &Selector,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let locator = match selector {
            Selector::Css(s) => Locator::Css(s),
            Selector::XPath(s) => Locator::XPath(s),
        };
        // find_all so a miss is an empty list, not a NoSuchElement error.
        let found = self.client()?.find_all(locator).await;
        match found {
            Ok(elements) => Ok(elements.into_iter().next().map(|e| self.register(e))),
            Err(e) => {
                let message = e.to_string();
                if message.contains("invalid selector") {
                    Err(DriverError::InvalidSelector {
                        selector: selector.to_string(),
                        reason: message,
                    })
                } else {
                    Err(DriverError::Other(message))
                }
            }
        }
    }

    async fn wait_visible(
        &mut self,
        handle: ElementHandle,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let element = self.element(handle)?;
        let deadline = Instant::now() + timeout;
        loop {
            let displayed = element
                .is_displayed()
                .await
                .map_err(|e| DriverError::Other(e.to_string()))?;
            if displayed {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(format!("{} to become visible", handle)));
            }
            tokio::time::sleep(VISIBILITY_POLL_INTERVAL).await;
        }
    }

    async fn act(
        &mut self,
        handle: ElementHandle,
        action: &ElementAction,
    ) -> Result<(), DriverError> {
        let element = self.element(handle)?;
        if !matches!(action, ElementAction::ScrollIntoView) {
            self.ensure_interactable(&element).await?;
        }
        debug!(%handle, ?action, "performing action");
        match action {
            ElementAction::Click => element.click().await.map_err(action_error),
            ElementAction::Type(text) => {
                element.clear().await.map_err(action_error)?;
                element.send_keys(text).await.map_err(action_error)
            }
            ElementAction::SelectOption(label) => {
                element.select_by_label(label).await.map_err(action_error)
            }
            ElementAction::Hover => {
                self.execute_on(
                    &element,
                    "arguments[0].dispatchEvent(new MouseEvent('mouseover', {bubbles: true})); \
                     arguments[0].dispatchEvent(new MouseEvent('mouseenter', {bubbles: true}));",
                )
                .await
            }
            ElementAction::ScrollIntoView => {
                self.execute_on(
                    &element,
                    "arguments[0].scrollIntoView({block: 'center', behavior: 'instant'});",
                )
                .await
            }
        }
    }

    async fn text_of(&mut self, handle: ElementHandle) -> Result<String, DriverError> {
        let element = self.element(handle)?;
        element
            .text()
            .await
            .map_err(|e| DriverError::Other(e.to_string()))
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), DriverError> {
        let bytes = self
            .client()?
            .screenshot()
            .await
            .map_err(|e| DriverError::Other(format!("screenshot failed: {}", e)))?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn evaluate_script(&mut self, script: &str) -> Result<serde_json::Value, DriverError> {
        self.client()?
            .execute(script, vec![])
            .await
            .map_err(|e| DriverError::Script(e.to_string()))
    }
}
