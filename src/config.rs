//! Configuration management for the highlighter
//!
//! Policy parameters, timing and markup conventions. Everything has a
//! default; `from_env` overrides individual fields from `HIGHLIGHT_*`
//! variables (a `.env` file is honoured).

use std::str::FromStr;
use std::time::Duration;

use crate::error::{HighlightError, Result};

/// Default annotation palette
pub const DEFAULT_PALETTE: &[&str] = &[
    "#FFE066", // Yellow
    "#FF9999", // Red
    "#99FF99", // Green
    "#99CCFF", // Blue
    "#FFCC99", // Orange
    "#CC99FF", // Purple
    "#FFB366", // Peach
    "#B3FFB3", // Light Green
];

#[derive(Debug, Clone)]
pub struct HighlightConfig {
    pub policy: SelectionPolicy,
    pub timing: TimingConfig,
    pub markup: MarkupConventions,
    pub palette: Vec<String>,
}

/// Acceptance and retention thresholds
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    /// Minimum trimmed selection length, in chars
    pub min_selection_chars: usize,
    /// Minimum similarity between stored and re-resolved text
    pub similarity_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Quiet period before a reconciliation pass runs
    pub reconcile_debounce: Duration,
    /// How long the invalid-selection cue stays visible
    pub cue_revert_delay: Duration,
}

/// Class names and attribute conventions used by the host markup
#[derive(Debug, Clone)]
pub struct MarkupConventions {
    pub highlight_class: String,
    pub cue_class: String,
    /// Substring of `title` marking pronunciation feedback carriers
    pub pronunciation_marker: String,
    /// Class fragments of highlight markup owned by another renderer
    pub external_markup_classes: Vec<String>,
    pub highlight_id_attribute: String,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            min_selection_chars: 2,
            similarity_threshold: 0.8,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reconcile_debounce: Duration::from_millis(300),
            cue_revert_delay: Duration::from_millis(800),
        }
    }
}

impl Default for MarkupConventions {
    fn default() -> Self {
        Self {
            highlight_class: "text-highlight".to_string(),
            cue_class: "invalid-selection-feedback".to_string(),
            pronunciation_marker: "pronunciation feedback".to_string(),
            external_markup_classes: vec!["bg-red-100".to_string(), "bg-blue-100".to_string()],
            highlight_id_attribute: "data-highlight-id".to_string(),
        }
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig {
            policy: SelectionPolicy::default(),
            timing: TimingConfig::default(),
            markup: MarkupConventions::default(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl HighlightConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = HighlightConfig::default();
        let palette = match var("HIGHLIGHT_PALETTE") {
            Some(list) => {
                let colors: Vec<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                if colors.is_empty() {
                    return Err(HighlightError::Config("HIGHLIGHT_PALETTE is empty".to_string()));
                }
                colors
            }
            None => defaults.palette,
        };

        let similarity_threshold =
            parse_or("HIGHLIGHT_SIMILARITY_THRESHOLD", defaults.policy.similarity_threshold)?;
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(HighlightError::Config(format!(
                "HIGHLIGHT_SIMILARITY_THRESHOLD must be within 0..=1, got {}",
                similarity_threshold
            )));
        }

        Ok(HighlightConfig {
            policy: SelectionPolicy {
                min_selection_chars: parse_or(
                    "HIGHLIGHT_MIN_SELECTION_CHARS",
                    defaults.policy.min_selection_chars,
                )?,
                similarity_threshold,
            },
            timing: TimingConfig {
                reconcile_debounce: Duration::from_millis(parse_or(
                    "HIGHLIGHT_RECONCILE_DEBOUNCE_MS",
                    defaults.timing.reconcile_debounce.as_millis() as u64,
                )?),
                cue_revert_delay: Duration::from_millis(parse_or(
                    "HIGHLIGHT_CUE_REVERT_MS",
                    defaults.timing.cue_revert_delay.as_millis() as u64,
                )?),
            },
            markup: MarkupConventions {
                highlight_class: var("HIGHLIGHT_CLASS").unwrap_or(defaults.markup.highlight_class),
                ..defaults.markup
            },
            palette,
        })
    }
}

fn var(key: &str) -> Option<String> {
    dotenvy::var(key).ok()
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| HighlightError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HighlightConfig::default();
        assert_eq!(config.policy.min_selection_chars, 2);
        assert_eq!(config.policy.similarity_threshold, 0.8);
        assert_eq!(config.timing.reconcile_debounce, Duration::from_millis(300));
        assert_eq!(config.timing.cue_revert_delay, Duration::from_millis(800));
        assert_eq!(config.palette.len(), 8);
        assert_eq!(config.palette[0], "#FFE066");
    }

    // Every test touching HIGHLIGHT_* variables lives here so parallel tests
    // never observe each other's settings.
    #[test]
    fn test_from_env_overrides_and_errors() {
        let keys = [
            "HIGHLIGHT_PALETTE",
            "HIGHLIGHT_SIMILARITY_THRESHOLD",
            "HIGHLIGHT_MIN_SELECTION_CHARS",
        ];

        std::env::set_var("HIGHLIGHT_PALETTE", "#fef08a, #bbf7d0");
        std::env::set_var("HIGHLIGHT_MIN_SELECTION_CHARS", "3");
        let config = HighlightConfig::from_env().unwrap();
        assert_eq!(config.palette, vec!["#fef08a", "#bbf7d0"]);
        assert_eq!(config.policy.min_selection_chars, 3);

        std::env::set_var("HIGHLIGHT_SIMILARITY_THRESHOLD", "1.5");
        let err = HighlightConfig::from_env().unwrap_err();
        assert!(matches!(err, HighlightError::Config(ref msg) if msg.contains("SIMILARITY")));

        std::env::set_var("HIGHLIGHT_SIMILARITY_THRESHOLD", "often");
        assert!(matches!(HighlightConfig::from_env(), Err(HighlightError::Config(_))));
        std::env::remove_var("HIGHLIGHT_SIMILARITY_THRESHOLD");

        std::env::set_var("HIGHLIGHT_PALETTE", " , ");
        let err = HighlightConfig::from_env().unwrap_err();
        assert!(matches!(err, HighlightError::Config(ref msg) if msg.contains("empty")));

        for key in keys {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_parse_or_falls_back() {
        let value: u64 = parse_or("HIGHLIGHT_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
