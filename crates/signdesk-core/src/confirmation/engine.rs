use super::word::{Formation, Word};
use crate::recognition::Observation;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Hold time before a pending letter is committed.
pub const DEFAULT_CONFIRMATION_DELAY: Duration = Duration::from_secs(3);

/// Result of feeding one observation to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "letter", rename_all = "snake_case")]
pub enum ConfirmationEvent {
    NoChange,
    NewPendingLetter(char),
    LetterConfirmed(char),
}

/// User edit commands applied to the word under composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordCommand {
    AddSpace,
    Backspace,
    ClearAll,
    CompleteWord,
}

/// Why a command left the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandRejection {
    EmptyWord,
    AlreadyComplete,
}

impl CommandRejection {
    pub fn message(self) -> &'static str {
        match self {
            CommandRejection::EmptyWord => "word is empty",
            CommandRejection::AlreadyComplete => "word is already complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The word or formation state changed.
    Applied,
    /// The word was frozen; carries the finished text for archiving.
    Completed { word: String },
    /// Nothing changed. Reported to the caller, never an error.
    Rejected(CommandRejection),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, CommandOutcome::Rejected(_))
    }
}

/// Pending-letter bookkeeping.
///
/// `pending_since` is `Some` exactly when `pending_letter` is `Some`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfirmationState {
    pub pending_letter: Option<char>,
    pub pending_since: Option<Instant>,
    pub confirmed: bool,
}

impl ConfirmationState {
    fn start(&mut self, letter: char, now: Instant) {
        self.pending_letter = Some(letter);
        self.pending_since = Some(now);
        self.confirmed = false;
    }

    fn clear(&mut self) {
        self.pending_letter = None;
        self.pending_since = None;
        self.confirmed = false;
    }
}

/// Per-session state machine turning observations into a confirmed word.
///
/// Not synchronized; callers serialize access per session.
#[derive(Debug, Clone)]
pub struct LetterConfirmationEngine {
    confirmation_delay: Duration,
    state: ConfirmationState,
    word: Word,
    formation: Formation,
}

impl LetterConfirmationEngine {
    pub fn new(confirmation_delay: Duration) -> Self {
        Self {
            confirmation_delay,
            state: ConfirmationState::default(),
            word: Word::new(),
            formation: Formation::Active,
        }
    }

    /// Rebuilds an engine around a previously stored word.
    ///
    /// Pending state is never persisted, so the resumed engine starts with
    /// nothing pending.
    pub fn resume(confirmation_delay: Duration, word: Word, formation: Formation) -> Self {
        Self {
            confirmation_delay,
            state: ConfirmationState::default(),
            word,
            formation,
        }
    }

    /// Feeds one observation.
    ///
    /// A letter differing from the pending one (including when nothing is
    /// pending) restarts the hold from zero. The pending letter is appended
    /// once it has been held for the confirmation delay. Observations are
    /// ignored while the word is frozen.
    pub fn observe(&mut self, observation: &Observation) -> ConfirmationEvent {
        if !self.formation.is_active() {
            return ConfirmationEvent::NoChange;
        }

        let now = observation.timestamp;
        if self.state.pending_letter != Some(observation.letter) {
            self.state.start(observation.letter, now);
            return ConfirmationEvent::NewPendingLetter(observation.letter);
        }

        if let (Some(letter), Some(since)) = (self.state.pending_letter, self.state.pending_since)
            && !self.state.confirmed
            && now.saturating_duration_since(since) >= self.confirmation_delay
        {
            self.word.push(letter);
            self.state.pending_letter = None;
            self.state.pending_since = None;
            self.state.confirmed = true;
            return ConfirmationEvent::LetterConfirmed(letter);
        }

        ConfirmationEvent::NoChange
    }

    /// Applies a user edit command atomically.
    pub fn apply(&mut self, command: WordCommand) -> CommandOutcome {
        match command {
            WordCommand::AddSpace => {
                if self.word.is_empty() {
                    return CommandOutcome::Rejected(CommandRejection::EmptyWord);
                }
                self.word.push(' ');
                self.reactivate();
                CommandOutcome::Applied
            }
            WordCommand::Backspace => {
                if self.word.pop().is_none() {
                    return CommandOutcome::Rejected(CommandRejection::EmptyWord);
                }
                self.reactivate();
                CommandOutcome::Applied
            }
            WordCommand::ClearAll => {
                self.word.clear();
                self.reactivate();
                CommandOutcome::Applied
            }
            WordCommand::CompleteWord => {
                if self.word.is_empty() {
                    return CommandOutcome::Rejected(CommandRejection::EmptyWord);
                }
                if !self.formation.is_active() {
                    return CommandOutcome::Rejected(CommandRejection::AlreadyComplete);
                }
                self.formation = Formation::Frozen;
                self.state.clear();
                CommandOutcome::Completed {
                    word: self.word.text(),
                }
            }
        }
    }

    /// Drops the pending letter without touching the word.
    ///
    /// Returns `true` if a letter was pending.
    pub fn clear_pending(&mut self) -> bool {
        let had_pending = self.state.pending_letter.is_some();
        self.state.clear();
        had_pending
    }

    /// Elapsed fraction of the confirmation delay for the pending letter.
    pub fn hold_progress(&self, now: Instant) -> f64 {
        match self.state.pending_since {
            Some(since) if !self.confirmation_delay.is_zero() => {
                let held = now.saturating_duration_since(since).as_secs_f64();
                (held / self.confirmation_delay.as_secs_f64()).min(1.0)
            }
            Some(_) => 1.0,
            None => 0.0,
        }
    }

    pub fn set_confirmation_delay(&mut self, delay: Duration) {
        self.confirmation_delay = delay;
    }

    pub fn confirmation_delay(&self) -> Duration {
        self.confirmation_delay
    }

    pub fn state(&self) -> &ConfirmationState {
        &self.state
    }

    pub fn pending_letter(&self) -> Option<char> {
        self.state.pending_letter
    }

    pub fn word(&self) -> &Word {
        &self.word
    }

    pub fn formation(&self) -> Formation {
        self.formation
    }

    fn reactivate(&mut self) {
        self.formation = Formation::Active;
        self.state.clear();
    }
}

impl Default for LetterConfirmationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_DELAY)
    }
}
