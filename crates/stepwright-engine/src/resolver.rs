//! Resolves a normalized target phrase to a live element.
//!
//! Candidates are generated in a fixed priority order (hint-informed,
//! then semantic, then generic fallback) and probed one at a time. The
//! first candidate that matches wins; there is no scoring. The total
//! time budget is divided across the candidates that were actually
//! generated and enforced against a shared deadline, so a resolution
//! never runs meaningfully past its budget no matter how many
//! candidates exist.

use crate::driver::{Driver, DriverError, ElementHandle, Selector};
use crate::hints::StructureHints;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyTier {
    Hint,
    Semantic,
    Fallback,
}

impl std::fmt::Display for StrategyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StrategyTier::Hint => "hint",
            StrategyTier::Semantic => "semantic",
            StrategyTier::Fallback => "fallback",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub tier: StrategyTier,
    pub selector: Selector,
}

/// A successful resolution: the handle plus how it was found.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub handle: ElementHandle,
    pub selector: Selector,
    pub tier: StrategyTier,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no element matched '{target}' ({candidates} candidates tried)")]
    NotFound {
        target: String,
        candidates: usize,
        suggestion: Option<String>,
    },
    #[error(transparent)]
    Driver(#[from] DriverError),
}

const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(100);

pub struct ElementResolver {
    probe_interval: Duration,
}

impl ElementResolver {
    pub fn new() -> Self {
        Self {
            probe_interval: DEFAULT_PROBE_INTERVAL,
        }
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Build the ordered candidate list for a target. Targets keep their
    /// full noun phrase ("submit button"); the id/name/class candidates
    /// are derived from a noise-stripped core ("submit") so the common
    /// `#submit` case still hits. Duplicate selectors keep their first,
    /// highest-priority occurrence.
    pub fn candidates(&self, target: &str, hints: Option<&StructureHints>) -> Vec<Candidate> {
        let mut out = Vec::new();

        if let Some(hint) = hints.and_then(|h| h.hint_for(target)) {
            out.push(Candidate {
                tier: StrategyTier::Hint,
                selector: Selector::css(hint.selector.clone()),
            });
        }

        let core = strip_noise_suffix(target);
        let attr = css_attr_escape(target);
        let core_attr = css_attr_escape(core);
        let text = lowered(target);
        let core_text = lowered(core);

        out.push(semantic(Selector::css(format!("[role=\"{}\"]", attr))));
        out.push(semantic(Selector::css(format!(
            "[aria-label*=\"{}\" i]",
            attr
        ))));
        if is_single_word(target) {
            out.push(semantic(Selector::css(target.to_string())));
        }
        for landmark in ["nav", "header", "footer"] {
            out.push(semantic(Selector::xpath(format!(
                "//{}[contains({}, {})]",
                landmark,
                lower_xpath("normalize-space(.)"),
                text
            ))));
        }

        if is_css_ident(core) {
            out.push(fallback(Selector::css(format!("#{}", core))));
        }
        out.push(fallback(Selector::css(format!("[name=\"{}\"]", core_attr))));
        if is_css_ident(core) {
            out.push(fallback(Selector::css(format!(".{}", core))));
        }
        // The raw target as a selector. Often not valid CSS at all; the
        // probe loop treats InvalidSelector as a miss for exactly this
        // candidate's sake.
        out.push(fallback(Selector::css(target.to_string())));
        out.push(fallback(Selector::xpath(format!(
            "//*[{} = {}]",
            lower_xpath("normalize-space(text())"),
            text
        ))));
        out.push(fallback(Selector::xpath(format!(
            "//button[contains({dot}, {t}) or contains({label}, {t})]",
            dot = lower_xpath("normalize-space(.)"),
            label = lower_xpath("@aria-label"),
            t = core_text
        ))));
        out.push(fallback(Selector::css(format!(
            "input[placeholder*=\"{a}\" i], input[aria-label*=\"{a}\" i]",
            a = core_attr
        ))));
        out.push(fallback(Selector::xpath(format!(
            "//*[@id = //label[contains({}, {})]/@for]",
            lower_xpath("normalize-space(.)"),
            core_text
        ))));
        out.push(fallback(Selector::xpath(format!(
            "//label[contains({}, {})]//*[self::input or self::select or self::textarea]",
            lower_xpath("normalize-space(.)"),
            core_text
        ))));
        out.push(fallback(Selector::xpath(format!(
            "//a[contains({dot}, {t}) or contains({label}, {t})]",
            dot = lower_xpath("normalize-space(.)"),
            label = lower_xpath("@aria-label"),
            t = core_text
        ))));

        let mut seen = HashSet::new();
        out.retain(|c| seen.insert(c.selector.clone()));
        out
    }

    /// Resolve `target` within `total_timeout`. Each candidate gets an
    /// equal slice of the budget; unspent time from an early miss is not
    /// rolled over, and the shared deadline caps the whole attempt.
    pub async fn resolve<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        target: &str,
        hints: Option<&StructureHints>,
        total_timeout: Duration,
    ) -> Result<Resolved, ResolveError> {
        let candidates = self.candidates(target, hints);
        let count = candidates.len().max(1);
        let slice = total_timeout / count as u32;
        let deadline = Instant::now() + total_timeout;

        debug!(
            target_phrase = target,
            candidates = count,
            slice_ms = slice.as_millis() as u64,
            "resolving"
        );

        'candidates: for candidate in &candidates {
            let slice_end = (Instant::now() + slice).min(deadline);
            loop {
                match driver.find_candidate(&candidate.selector).await {
                    Ok(Some(handle)) => {
                        debug!(
                            selector = %candidate.selector,
                            tier = %candidate.tier,
                            %handle,
                            "resolved"
                        );
                        return Ok(Resolved {
                            handle,
                            selector: candidate.selector.clone(),
                            tier: candidate.tier,
                        });
                    }
                    Ok(None) => {}
                    Err(DriverError::InvalidSelector { selector, reason }) => {
                        trace!(%selector, %reason, "candidate is not a valid selector, skipping");
                        continue 'candidates;
                    }
                    Err(e) => return Err(e.into()),
                }

                let now = Instant::now();
                if now >= slice_end {
                    break;
                }
                let pause = self.probe_interval.min(slice_end - now);
                tokio::time::sleep(pause).await;
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        Err(ResolveError::NotFound {
            target: target.to_string(),
            candidates: candidates.len(),
            suggestion: hints
                .and_then(|h| h.suggest(target))
                .map(|s| s.to_string()),
        })
    }
}

impl Default for ElementResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn semantic(selector: Selector) -> Candidate {
    Candidate {
        tier: StrategyTier::Semantic,
        selector,
    }
}

fn fallback(selector: Selector) -> Candidate {
    Candidate {
        tier: StrategyTier::Fallback,
        selector,
    }
}

const NOISE_SUFFIXES: &[&str] = &["button", "link", "element", "icon", "tab", "field", "box"];

/// Drop one trailing noise word: "submit button" becomes "submit",
/// "checkbox" stays whole. Returns the target unchanged when nothing
/// meaningful would remain.
fn strip_noise_suffix(target: &str) -> &str {
    for noise in NOISE_SUFFIXES {
        if let Some(rest) = target.strip_suffix(noise) {
            if rest.ends_with(' ') && !rest.trim_end().is_empty() {
                return rest.trim_end();
            }
            break;
        }
    }
    target
}

const XPATH_UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const XPATH_LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

/// Wrap an XPath expression so its value compares lowercase. XPath 1.0
/// string functions are case-sensitive and targets are normalized to
/// lowercase.
fn lower_xpath(expr: &str) -> String {
    format!("translate({}, '{}', '{}')", expr, XPATH_UPPER, XPATH_LOWER)
}

fn lowered(s: &str) -> String {
    xpath_literal(&s.to_lowercase())
}

fn is_single_word(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace)
}

fn is_css_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn css_attr_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Quote a string for use as an XPath literal, falling back to concat()
/// when it holds both quote kinds.
fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s
            .split('\'')
            .map(|part| format!("'{}'", part))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
