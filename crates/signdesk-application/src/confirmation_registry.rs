//! Per-session confirmation engines.
//!
//! Each session owns one slot holding its engine plus the gating state the
//! request pipeline needs (prediction cooldown, hand-loss counter). A slot
//! lock serializes every read-modify-write of one session's confirmation
//! state; distinct sessions never contend.
//!
//! A slot remembers the creation time of the session it was built from. A
//! session that was swept and recreated while its slot was busy gets a fresh
//! engine on next use instead of resuming the old word.

use crate::slots::SlotArena;
use chrono::{DateTime, Utc};
use serde::Serialize;
use signdesk_core::confirmation::{
    CommandOutcome, ConfirmationEvent, Formation, LetterConfirmationEngine, Word, WordCommand,
};
use signdesk_core::recognition::Observation;
use signdesk_core::session::SessionState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// What one frame did to a session's confirmation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameEvent {
    NoChange,
    NewPendingLetter,
    LetterConfirmed,
    /// Arrived within the prediction cooldown; not fed to the engine.
    Cooldown,
    /// Confidence under the session threshold; not fed to the engine.
    BelowThreshold,
    /// The hand was gone long enough to drop the pending letter.
    PendingCleared,
    NoHand,
}

impl From<ConfirmationEvent> for FrameEvent {
    fn from(event: ConfirmationEvent) -> Self {
        match event {
            ConfirmationEvent::NoChange => FrameEvent::NoChange,
            ConfirmationEvent::NewPendingLetter(_) => FrameEvent::NewPendingLetter,
            ConfirmationEvent::LetterConfirmed(_) => FrameEvent::LetterConfirmed,
        }
    }
}

#[derive(Debug)]
pub struct SessionSlot {
    engine: LetterConfirmationEngine,
    session_created_at: DateTime<Utc>,
    last_accepted: Option<Instant>,
    frames_without_hand: u32,
}

impl SessionSlot {
    pub fn new(engine: LetterConfirmationEngine, session_created_at: DateTime<Utc>) -> Self {
        Self {
            engine,
            session_created_at,
            last_accepted: None,
            frames_without_hand: 0,
        }
    }

    /// Rebuilds a slot from the word mirrored into a stored session.
    pub fn from_session(state: &SessionState, default_delay_ms: u64) -> Self {
        let delay =
            Duration::from_millis(state.settings.effective_letter_delay_ms(default_delay_ms));
        let formation = if state.formation_active {
            Formation::Active
        } else {
            Formation::Frozen
        };
        Self::new(
            LetterConfirmationEngine::resume(
                delay,
                Word::from(state.current_word.as_str()),
                formation,
            ),
            state.created_at,
        )
    }

    /// Whether this slot was built for the same incarnation of the session.
    pub fn belongs_to(&self, state: &SessionState) -> bool {
        self.session_created_at == state.created_at
    }

    /// Offers a classified frame to the engine.
    ///
    /// Frames inside the cooldown since the last accepted one, and frames
    /// under `threshold`, are dropped before reaching the engine. A
    /// confirmation ends the cooldown so the next letter can start at once.
    pub fn offer(
        &mut self,
        observation: &Observation,
        threshold: f64,
        cooldown: Duration,
    ) -> FrameEvent {
        self.frames_without_hand = 0;

        if let Some(last) = self.last_accepted
            && observation.timestamp.saturating_duration_since(last) < cooldown
        {
            return FrameEvent::Cooldown;
        }
        if observation.confidence < threshold {
            return FrameEvent::BelowThreshold;
        }

        let event = self.engine.observe(observation);
        self.last_accepted = match event {
            ConfirmationEvent::LetterConfirmed(_) => None,
            _ => Some(observation.timestamp),
        };
        event.into()
    }

    /// Records a frame without a hand.
    ///
    /// Once `limit` consecutive hand-less frames are seen, the pending
    /// letter is dropped. The word is never touched.
    pub fn hand_missing(&mut self, limit: u32) -> FrameEvent {
        self.frames_without_hand = self.frames_without_hand.saturating_add(1);
        if self.frames_without_hand >= limit && self.engine.clear_pending() {
            FrameEvent::PendingCleared
        } else {
            FrameEvent::NoHand
        }
    }

    pub fn apply(&mut self, command: WordCommand) -> CommandOutcome {
        self.engine.apply(command)
    }

    pub fn set_confirmation_delay(&mut self, delay: Duration) {
        self.engine.set_confirmation_delay(delay);
    }

    pub fn engine(&self) -> &LetterConfirmationEngine {
        &self.engine
    }
}

pub struct ConfirmationRegistry {
    slots: SlotArena<SessionSlot>,
    default_delay_ms: u64,
}

impl ConfirmationRegistry {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            slots: SlotArena::new(),
            default_delay_ms: default_delay.as_millis() as u64,
        }
    }

    /// The session's slot, built from its stored state on first use.
    ///
    /// A slot left over from an earlier session with the same id is rebuilt
    /// from `state` in place, so handles already out see the new engine.
    pub async fn slot(&self, state: &SessionState) -> Arc<Mutex<SessionSlot>> {
        let slot = self
            .slots
            .get_or_insert_with(&state.id, || {
                SessionSlot::from_session(state, self.default_delay_ms)
            })
            .await;
        {
            let mut current = slot.lock().await;
            if !current.belongs_to(state) {
                tracing::debug!(session_id = %state.id, "Rebuilding engine for recreated session");
                *current = SessionSlot::from_session(state, self.default_delay_ms);
            }
        }
        slot
    }

    /// Applies new settings to a live engine, if the session has one.
    pub async fn reconfigure(&self, state: &SessionState) {
        if let Some(slot) = self.slots.get(&state.id).await {
            let delay_ms = state
                .settings
                .effective_letter_delay_ms(self.default_delay_ms);
            slot.lock()
                .await
                .set_confirmation_delay(Duration::from_millis(delay_ms));
        }
    }

    /// Forgets a session's engine. A busy slot is left alone.
    pub async fn evict(&self, session_id: &str) -> bool {
        self.slots.remove_if_idle(session_id).await
    }

    pub async fn len(&self) -> usize {
        self.slots.len().await
    }
}
