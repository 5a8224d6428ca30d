//! Compiles plain-English step descriptions into typed [`Step`]s.
//!
//! The grammar is a fixed, ordered set of pattern rules; the first rule
//! that matches wins. Matching happens against a lowercased copy of the
//! input so rules are case-insensitive, while captured values are sliced
//! from the original text to keep their casing.

use crate::step::{ActionKind, ParseWarning, Step, DEFAULT_STEP_TIMEOUT_SECS};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCROLL_END: Regex = Regex::new(r"^scroll\b.*\b(?:end|bottom)\b").unwrap();
    static ref SCROLL_TOP: Regex = Regex::new(r"^scroll\b.*\btop\b").unwrap();
    static ref SCROLL_DIR: Regex =
        Regex::new(r"^scroll\s+(up|down|left|right)(?:\s+(?:by\s+)?(\d+))?").unwrap();
    static ref SCROLL_ELEM: Regex = Regex::new(r"^scroll\s+(?:to|into)\s+(.+)$").unwrap();
    static ref CLICK: Regex = Regex::new(r"^(?:click|tap|press)(?:\s+on)?\s+(.+)$").unwrap();
    static ref TYPE: Regex =
        Regex::new(r"^(?:type|enter|fill|input)\s+(.+)\s+(?:in|into|to)\s+(.+)$").unwrap();
    static ref SELECT: Regex = Regex::new(r"^(?:select|choose)\s+(.+)\s+from\s+(.+)$").unwrap();
    static ref VERIFY_CONTAINS: Regex =
        Regex::new(r"^(?:verify|check|confirm|see)\s+(?:that\s+)?(.+?)\s+contains\s+(.+)$")
            .unwrap();
    static ref VERIFY_PRESENT: Regex = Regex::new(
        r"^(?:verify|check|confirm|see)\s+(?:that\s+)?(.+?)\s+(?:appears|is\s+visible|is\s+displayed|is\s+present|exists)$"
    )
    .unwrap();
    static ref WAIT_SECS: Regex = Regex::new(r"^wait(?:\s+for)?\s+(\d+)\s+seconds?$").unwrap();
    static ref WAIT_ELEM: Regex = Regex::new(r"^wait\s+(?:for|until)\s+(.+)$").unwrap();
    static ref HOVER: Regex =
        Regex::new(r"^(?:hover(?:\s+(?:over|on))?|move\s+to)\s+(.+)$").unwrap();
    static ref ASSERT_CONTAINS: Regex =
        Regex::new(r"^(?:assert|ensure|expect)\s+(?:that\s+)?(.+?)\s+contains\s+(.+)$").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

pub struct StepParser;

impl StepParser {
    pub fn new() -> Self {
        Self
    }

    /// Compile one description. A text no rule recognizes yields a
    /// [`ParseWarning`] for the caller to log and skip.
    pub fn parse_step(&self, raw: &str) -> Result<Step, ParseWarning> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseWarning::Unrecognized {
                text: raw.to_string(),
            });
        }
        let lower = trimmed.to_lowercase();
        // Match offsets come from the lowered copy; lowercasing can move
        // byte boundaries, so the slice is only trusted when it exists
        // and lowercases back to what actually matched.
        let original = |m: regex::Match| -> String {
            match trimmed.get(m.start()..m.end()) {
                Some(slice) if slice.to_lowercase() == m.as_str() => slice.to_string(),
                _ => m.as_str().to_string(),
            }
        };

        // Scroll rules run before everything else so "scroll to top"
        // never falls through to the element rule.
        if SCROLL_END.is_match(&lower) {
            return Ok(Step::new(trimmed, ActionKind::Scroll, "down till end"));
        }
        if SCROLL_TOP.is_match(&lower) {
            return Ok(Step::new(trimmed, ActionKind::Scroll, "up till top"));
        }
        if let Some(caps) = SCROLL_DIR.captures(&lower) {
            let mut step = Step::new(trimmed, ActionKind::Scroll, &caps[1]);
            if let Some(amount) = caps.get(2) {
                step = step.with_value(amount.as_str());
            }
            return Ok(step);
        }
        if let Some(caps) = SCROLL_ELEM.captures(&lower) {
            let target = normalize_target(&caps[1]);
            if target.is_empty() {
                return Err(ParseWarning::MissingTarget {
                    text: trimmed.to_string(),
                });
            }
            return Ok(Step::new(trimmed, ActionKind::Scroll, target));
        }

        if let Some(caps) = CLICK.captures(&lower) {
            let target = normalize_target(&caps[1]);
            if target.is_empty() {
                return Err(ParseWarning::MissingTarget {
                    text: trimmed.to_string(),
                });
            }
            return Ok(Step::new(trimmed, ActionKind::Click, target));
        }

        if let Some(caps) = TYPE.captures(&lower) {
            let value = strip_quotes(&original(caps.get(1).ok_or_else(|| {
                ParseWarning::MissingTarget {
                    text: trimmed.to_string(),
                }
            })?));
            let target = normalize_target(&caps[2]);
            return Ok(Step::new(trimmed, ActionKind::Type, target).with_value(value));
        }

        if let Some(caps) = SELECT.captures(&lower) {
            let value = strip_quotes(&original(caps.get(1).ok_or_else(|| {
                ParseWarning::MissingTarget {
                    text: trimmed.to_string(),
                }
            })?));
            let target = normalize_target(&caps[2]);
            return Ok(Step::new(trimmed, ActionKind::Select, target).with_value(value));
        }

        if let Some(caps) = VERIFY_CONTAINS.captures(&lower) {
            let target = normalize_target(&caps[1]);
            let value = strip_quotes(&original(caps.get(2).ok_or_else(|| {
                ParseWarning::MissingTarget {
                    text: trimmed.to_string(),
                }
            })?));
            return Ok(Step::new(trimmed, ActionKind::Verify, target).with_value(value));
        }
        if let Some(caps) = VERIFY_PRESENT.captures(&lower) {
            let target = normalize_target(&caps[1]);
            if target.is_empty() {
                return Err(ParseWarning::MissingTarget {
                    text: trimmed.to_string(),
                });
            }
            return Ok(Step::new(trimmed, ActionKind::Verify, target));
        }

        if let Some(caps) = WAIT_SECS.captures(&lower) {
            let secs = caps[1].parse().unwrap_or(DEFAULT_STEP_TIMEOUT_SECS);
            return Ok(Step::new(trimmed, ActionKind::Wait, "page").with_timeout(secs));
        }
        if lower == "wait" {
            return Ok(Step::new(trimmed, ActionKind::Wait, "page"));
        }
        if let Some(caps) = WAIT_ELEM.captures(&lower) {
            let target = normalize_target(&caps[1]);
            if target.is_empty() {
                return Err(ParseWarning::MissingTarget {
                    text: trimmed.to_string(),
                });
            }
            return Ok(Step::new(trimmed, ActionKind::Wait, target));
        }

        if let Some(caps) = HOVER.captures(&lower) {
            let target = normalize_target(&caps[1]);
            if target.is_empty() {
                return Err(ParseWarning::MissingTarget {
                    text: trimmed.to_string(),
                });
            }
            return Ok(Step::new(trimmed, ActionKind::Hover, target));
        }

        if let Some(caps) = ASSERT_CONTAINS.captures(&lower) {
            let target = normalize_target(&caps[1]);
            let value = strip_quotes(&original(caps.get(2).ok_or_else(|| {
                ParseWarning::MissingTarget {
                    text: trimmed.to_string(),
                }
            })?));
            return Ok(Step::new(trimmed, ActionKind::Assert, target).with_value(value));
        }

        Err(ParseWarning::Unrecognized {
            text: trimmed.to_string(),
        })
    }
}

impl Default for StepParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a target phrase: collapse whitespace, strip quotes and a
/// leading article. Noise words like "button" stay in the target; the
/// resolver derives its own stripped form when generating candidates.
pub fn normalize_target(raw: &str) -> String {
    let mut target = strip_quotes(WHITESPACE.replace_all(raw.trim(), " ").trim());
    for article in ["the ", "a ", "an "] {
        if let Some(rest) = target.strip_prefix(article) {
            target = rest.trim_start().to_string();
            break;
        }
    }
    target
}

fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
    stripped.unwrap_or(trimmed).to_string()
}
