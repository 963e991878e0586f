//! Per-category auto-send thresholds.
//!
//! Auto-sending is earned: a category must clear both a confidence bar and a
//! minimum volume of past decisions before drafts go out unreviewed.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::classifier::patterns::{contains_word, normalize};
use crate::classifier::MessageCategory;
use crate::error::{Result, TriageError};

/// Gate for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryThreshold {
    pub auto_send_min_confidence: f32,
    pub auto_send_min_volume: u64,
    /// Never respond directly; always hand to a human.
    #[serde(default)]
    pub escalate_always: bool,
    /// Escalate when any of these words or phrases appear.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub escalate_on_keywords: Vec<String>,
}

impl CategoryThreshold {
    /// Creates a threshold with no escalation triggers.
    pub fn new(auto_send_min_confidence: f32, auto_send_min_volume: u64) -> Self {
        Self {
            auto_send_min_confidence,
            auto_send_min_volume,
            escalate_always: false,
            escalate_on_keywords: Vec::new(),
        }
    }

    /// The threshold applied to categories without an override.
    pub fn fallback() -> Self {
        Self::new(0.95, 50)
    }

    pub fn with_escalate_always(mut self) -> Self {
        self.escalate_always = true;
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.escalate_on_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the first escalation keyword found in `text`.
    pub fn matching_keyword(&self, text: &str) -> Option<&str> {
        let text = normalize(text);
        self.escalate_on_keywords
            .iter()
            .find(|k| contains_word(&text, &normalize(k)))
            .map(String::as_str)
    }

    /// Returns true when both gates pass.
    pub fn allows_auto_send(&self, confidence: f32, volume: u64) -> bool {
        confidence >= self.auto_send_min_confidence && volume >= self.auto_send_min_volume
    }
}

/// Thresholds for every category, with a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "CategoryThreshold::fallback")]
    pub default: CategoryThreshold,
    /// Overrides keyed by category wire name.
    #[serde(default)]
    pub categories: HashMap<String, CategoryThreshold>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let categories = HashMap::from([
            (
                MessageCategory::SupportRefund.as_str().to_string(),
                CategoryThreshold::new(0.95, 100),
            ),
            (
                MessageCategory::SupportTechnical.as_str().to_string(),
                CategoryThreshold::fallback().with_keywords([
                    "widespread",
                    "everyone",
                    "all users",
                    "outage",
                ]),
            ),
            (
                MessageCategory::PresalesTeam.as_str().to_string(),
                CategoryThreshold::fallback().with_escalate_always(),
            ),
        ]);

        Self {
            default: CategoryThreshold::fallback(),
            categories,
        }
    }
}

impl ThresholdConfig {
    /// Parses a JSON threshold document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON threshold document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), overrides = config.categories.len(), "loaded thresholds");
        Ok(config)
    }

    /// Sets the threshold for a category.
    pub fn with_category(mut self, category: MessageCategory, threshold: CategoryThreshold) -> Self {
        self.categories
            .insert(category.as_str().to_string(), threshold);
        self
    }

    /// Looks up a category by wire name, falling back to the default.
    pub fn get_category_threshold(&self, category: &str) -> &CategoryThreshold {
        self.categories
            .get(category.trim())
            .unwrap_or(&self.default)
    }

    /// Looks up a category, falling back to the default.
    pub fn for_category(&self, category: MessageCategory) -> &CategoryThreshold {
        self.get_category_threshold(category.as_str())
    }

    fn validate(&self) -> Result<()> {
        let entries = std::iter::once(("default", &self.default))
            .chain(self.categories.iter().map(|(k, v)| (k.as_str(), v)));

        for (name, threshold) in entries {
            if name != "default" && name.parse::<MessageCategory>().is_err() {
                return Err(TriageError::Config(format!(
                    "unknown category '{}' in thresholds",
                    name
                )));
            }
            if !(0.0..=1.0).contains(&threshold.auto_send_min_confidence) {
                return Err(TriageError::Config(format!(
                    "{}: auto_send_min_confidence must be within [0, 1]",
                    name
                )));
            }
        }
        Ok(())
    }
}

static DEFAULT_THRESHOLDS: Lazy<ThresholdConfig> = Lazy::new(ThresholdConfig::default);

/// Looks up a category in the built-in thresholds.
pub fn get_category_threshold(category: &str) -> &'static CategoryThreshold {
    DEFAULT_THRESHOLDS.get_category_threshold(category)
}
