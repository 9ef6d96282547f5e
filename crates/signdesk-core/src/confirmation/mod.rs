//! Temporal letter confirmation and word composition.
//!
//! A session's noisy per-frame classifications are debounced by
//! [`LetterConfirmationEngine`]: a letter only reaches the [`Word`] after it
//! has been held without interruption for the confirmation delay.

mod engine;
mod word;

pub use engine::{
    CommandOutcome, CommandRejection, ConfirmationEvent, ConfirmationState,
    DEFAULT_CONFIRMATION_DELAY, LetterConfirmationEngine, WordCommand,
};
pub use word::{Formation, Word};
