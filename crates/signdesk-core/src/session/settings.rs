//! Per-session settings.

use crate::error::{Result, SignDeskError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;
pub const DEFAULT_LETTER_DELAY_MS: u64 = 3000;
pub const DEFAULT_LANGUAGE: &str = "tr";

/// Typed settings overrides with an escape hatch for unknown keys.
///
/// A `None` field means "use the service default".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionSettings {
    /// Settings a freshly created session starts with.
    pub fn initial(confidence_threshold: f64, letter_delay_ms: u64) -> Self {
        Self {
            confidence_threshold: Some(confidence_threshold),
            letter_delay_ms: Some(letter_delay_ms),
            language: Some(DEFAULT_LANGUAGE.to_string()),
            extra: Map::new(),
        }
    }

    /// Merges `patch` key by key, last write wins.
    ///
    /// `null` resets a typed key to the service default and removes an
    /// unknown key. The merge is all-or-nothing: a badly typed value leaves
    /// `self` untouched.
    pub fn merge(&mut self, patch: &Map<String, Value>) -> Result<()> {
        let mut next = self.clone();
        for (key, value) in patch {
            match key.as_str() {
                "confidence_threshold" => {
                    next.confidence_threshold = match value {
                        Value::Null => None,
                        v => {
                            let threshold = v.as_f64().ok_or_else(|| {
                                SignDeskError::input("confidence_threshold must be a number")
                            })?;
                            if !(0.0..=1.0).contains(&threshold) {
                                return Err(SignDeskError::input(
                                    "confidence_threshold must be between 0 and 1",
                                ));
                            }
                            Some(threshold)
                        }
                    };
                }
                "letter_delay_ms" => {
                    next.letter_delay_ms = match value {
                        Value::Null => None,
                        v => Some(v.as_u64().ok_or_else(|| {
                            SignDeskError::input("letter_delay_ms must be a non-negative integer")
                        })?),
                    };
                }
                "language" => {
                    next.language = match value {
                        Value::Null => None,
                        Value::String(s) => Some(s.clone()),
                        _ => return Err(SignDeskError::input("language must be a string")),
                    };
                }
                _ => {
                    if value.is_null() {
                        next.extra.remove(key);
                    } else {
                        next.extra.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        *self = next;
        Ok(())
    }

    pub fn effective_confidence_threshold(&self, default: f64) -> f64 {
        self.confidence_threshold.unwrap_or(default)
    }

    pub fn effective_letter_delay_ms(&self, default: u64) -> u64 {
        self.letter_delay_ms.unwrap_or(default)
    }
}
