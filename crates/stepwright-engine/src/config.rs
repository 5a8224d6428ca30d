//! Runner configuration, loaded from YAML with built-in defaults.
//!
//! Lookup order: an explicit path, then `./stepwright.yaml`, then
//! `~/.stepwright/config.yaml`, then the defaults. Every field is
//! defaulted so a partial file merges cleanly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub test: TestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub name: String,
    pub headless: bool,
    pub window_size: (u32, u32),
    pub page_load_timeout: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            name: "chrome".to_string(),
            headless: false,
            window_size: (1920, 1080),
            page_load_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub settle_delay_ms: u64,
    pub wait_timeout: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            screenshot_dir: PathBuf::from("test_output/screenshots"),
            settle_delay_ms: 1000,
            wait_timeout: 10,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub async fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load from the conventional locations, falling back to defaults
    /// when no file exists.
    pub async fn load_default() -> Result<Config, ConfigError> {
        let local = PathBuf::from("stepwright.yaml");
        if local.is_file() {
            debug!("loading config from ./stepwright.yaml");
            return Self::load_from(&local).await;
        }
        if let Some(home) = dirs::home_dir() {
            let user = home.join(".stepwright").join("config.yaml");
            if user.is_file() {
                debug!(path = %user.display(), "loading user config");
                return Self::load_from(&user).await;
            }
        }
        Ok(Config::default())
    }
}
