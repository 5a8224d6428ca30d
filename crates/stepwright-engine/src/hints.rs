//! Structure hints: selectors a page analysis produced ahead of time.
//!
//! Producing the analysis is someone else's job; this module only
//! consumes its output. Hints give the resolver a head start (a keyword
//! to selector mapping tried before any heuristic) and give error
//! messages a "did you mean" selector when resolution fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HintError {
    #[error("hint file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("analysis failed: {0}")]
    Analysis(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HintCategory {
    FormField,
    Navigation,
    DynamicControl,
    #[default]
    Other,
}

/// One keyword-to-selector mapping from the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureHint {
    pub keyword: String,
    pub selector: String,
    #[serde(default)]
    pub category: HintCategory,
}

/// Page-level dynamic-content findings. The scroll handler uses
/// `scroll_container` when the page scrolls inside a wrapper element
/// rather than the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicContent {
    #[serde(default)]
    pub infinite_scroll: bool,
    #[serde(default)]
    pub load_more: bool,
    #[serde(default)]
    pub scroll_container: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureHints {
    #[serde(default)]
    pub selectors: Vec<StructureHint>,
    #[serde(default)]
    pub dynamic: DynamicContent,
}

const SUGGESTION_THRESHOLD: f64 = 0.75;

impl StructureHints {
    /// Exact-ish lookup: the first hint whose keyword contains the
    /// normalized target, or vice versa.
    pub fn hint_for(&self, target: &str) -> Option<&StructureHint> {
        let needle = target.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.selectors.iter().find(|hint| {
            let keyword = hint.keyword.trim().to_lowercase();
            // An empty keyword would substring-match every target.
            !keyword.is_empty()
                && (keyword == needle || keyword.contains(&needle) || needle.contains(&keyword))
        })
    }

    /// Fuzzy lookup for diagnostics: the selector of the closest keyword,
    /// if any is close enough to be worth suggesting.
    pub fn suggest(&self, target: &str) -> Option<&str> {
        let needle = target.trim().to_lowercase();
        self.selectors
            .iter()
            .map(|hint| {
                let score = strsim::jaro_winkler(&needle, &hint.keyword.to_lowercase());
                (score, hint)
            })
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, hint)| hint.selector.as_str())
    }

    /// Overlay another hint set; its entries take priority.
    pub fn merge_front(&mut self, extra: Vec<StructureHint>) {
        if extra.is_empty() {
            return;
        }
        let mut merged = extra;
        merged.append(&mut self.selectors);
        self.selectors = merged;
    }
}

/// Source of structure hints for a page. Implementations may run a live
/// analysis or just read a file an analyzer wrote earlier.
#[async_trait]
pub trait StructureHintProvider: Send + Sync {
    async fn analyze(&mut self, url: &str) -> Result<StructureHints, HintError>;
}

/// Loads hints from a YAML file produced by an external analyzer. The
/// same hints are returned for every URL.
pub struct FileHintProvider {
    path: PathBuf,
}

impl FileHintProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(path: &Path) -> Result<StructureHints, HintError> {
        if !path.is_file() {
            return Err(HintError::NotFound(path.to_path_buf()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

#[async_trait]
impl StructureHintProvider for FileHintProvider {
    async fn analyze(&mut self, _url: &str) -> Result<StructureHints, HintError> {
        Self::load(&self.path).await
    }
}
