//! Stored session model.

use super::settings::SessionSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Most recent observations kept per session.
pub const MAX_PREDICTIONS: usize = 50;
/// Completed words kept per session.
pub const MAX_WORD_HISTORY: usize = 100;

/// One classification accepted for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub letter: char,
    pub confidence: f64,
    pub recorded_at: DateTime<Utc>,
}

/// A word archived by the complete-word command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordRecord {
    pub word: String,
    pub completed_at: DateTime<Utc>,
}

/// Persisted per-session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub request_count: u64,
    /// Accumulated pipeline time in seconds.
    #[serde(default)]
    pub total_time: f64,
    #[serde(default)]
    pub predictions: VecDeque<PredictionRecord>,
    #[serde(default)]
    pub word_history: VecDeque<WordRecord>,
    #[serde(default)]
    pub settings: SessionSettings,
    #[serde(default)]
    pub current_word: String,
    #[serde(default = "default_formation_active")]
    pub formation_active: bool,
}

fn default_formation_active() -> bool {
    true
}

impl SessionState {
    pub fn new(id: impl Into<String>, settings: SessionSettings) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            last_activity: now,
            request_count: 0,
            total_time: 0.0,
            predictions: VecDeque::new(),
            word_history: VecDeque::new(),
            settings,
            current_word: String::new(),
            formation_active: true,
        }
    }

    /// Appends a prediction, dropping the oldest beyond [`MAX_PREDICTIONS`].
    pub fn push_prediction(&mut self, record: PredictionRecord) {
        self.predictions.push_back(record);
        while self.predictions.len() > MAX_PREDICTIONS {
            self.predictions.pop_front();
        }
    }

    /// Archives a word, dropping the oldest beyond [`MAX_WORD_HISTORY`].
    pub fn push_word(&mut self, record: WordRecord) {
        self.word_history.push_back(record);
        while self.word_history.len() > MAX_WORD_HISTORY {
            self.word_history.pop_front();
        }
    }

    /// Counts one handled request.
    pub fn record_request(&mut self, elapsed: Duration) {
        self.request_count += 1;
        self.total_time += elapsed.as_secs_f64();
        self.last_activity = Utc::now();
    }

    /// True when the last activity predates `now - max_age`.
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => self.last_activity < now - max_age,
            Err(_) => false,
        }
    }

    pub fn apply(&mut self, patch: SessionPatch) {
        if let Some(settings) = patch.settings {
            self.settings = settings;
        }
        if let Some(word) = patch.current_word {
            self.current_word = word;
        }
        if let Some(active) = patch.formation_active {
            self.formation_active = active;
        }
        self.last_activity = Utc::now();
    }
}

/// Partial update for [`SessionState`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub settings: Option<SessionSettings>,
    pub current_word: Option<String>,
    pub formation_active: Option<bool>,
}

impl SessionPatch {
    pub fn settings(settings: SessionSettings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    pub fn word(word: impl Into<String>, formation_active: bool) -> Self {
        Self {
            current_word: Some(word.into()),
            formation_active: Some(formation_active),
            ..Self::default()
        }
    }
}
