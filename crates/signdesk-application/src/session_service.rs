//! Session-facing use cases: snapshots, settings and word commands.

use crate::confirmation_registry::ConfirmationRegistry;
use crate::session_store::SessionStore;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use signdesk_core::confirmation::{CommandOutcome, WordCommand};
use signdesk_core::error::{Result, SignDeskError};
use signdesk_core::session::{SessionSettings, SessionState, WordRecord};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandResponse {
    pub applied: bool,
    pub command: WordCommand,
    pub word: String,
    pub formation_active: bool,
    pub message: String,
}

pub struct SessionService {
    sessions: Arc<SessionStore>,
    registry: Arc<ConfirmationRegistry>,
}

impl SessionService {
    pub fn new(sessions: Arc<SessionStore>, registry: Arc<ConfirmationRegistry>) -> Self {
        Self { sessions, registry }
    }

    pub fn store(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn snapshot(&self, session_id: &str) -> Result<SessionState> {
        self.sessions.get(session_id).await
    }

    pub async fn settings(&self, session_id: &str) -> Result<SessionSettings> {
        Ok(self.sessions.get(session_id).await?.settings)
    }

    /// Merges a settings patch and pushes it into the live engine.
    pub async fn update_settings(
        &self,
        session_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<SessionSettings> {
        if patch.is_empty() {
            return Err(SignDeskError::input("No data provided"));
        }
        let settings = self.sessions.update_settings(session_id, patch).await?;
        let state = self.sessions.get(session_id).await?;
        self.registry.reconfigure(&state).await;
        tracing::debug!(session_id, "Session settings updated");
        Ok(settings)
    }

    /// Accepts either `{"settings": {...}}` or a bare settings object.
    pub async fn update_data(
        &self,
        session_id: &str,
        data: &Map<String, Value>,
    ) -> Result<SessionSettings> {
        match data.get("settings") {
            Some(Value::Object(settings)) => self.update_settings(session_id, settings).await,
            Some(_) => Err(SignDeskError::input("settings must be an object")),
            None => self.update_settings(session_id, data).await,
        }
    }

    /// Applies a word command. Rejections are reported, never raised.
    pub async fn apply_command(
        &self,
        session_id: &str,
        command: WordCommand,
    ) -> Result<CommandResponse> {
        let state = self.sessions.get(session_id).await?;
        let slot = self.registry.slot(&state).await;
        let mut slot = slot.lock().await;

        let outcome = slot.apply(command);
        let word = slot.engine().word().text();
        let formation_active = slot.engine().formation().is_active();

        let message = match &outcome {
            CommandOutcome::Rejected(reason) => reason.message().to_string(),
            CommandOutcome::Applied => "applied".to_string(),
            CommandOutcome::Completed { word } => format!("completed \"{}\"", word),
        };

        let applied = outcome.is_applied();
        if applied {
            let archived = match outcome {
                CommandOutcome::Completed { word } => Some(WordRecord {
                    word,
                    completed_at: Utc::now(),
                }),
                _ => None,
            };
            let mirror = word.clone();
            self.sessions
                .modify(session_id, move |s| {
                    if let Some(record) = archived {
                        s.push_word(record);
                    }
                    s.current_word = mirror;
                    s.formation_active = formation_active;
                    s.last_activity = Utc::now();
                    Ok(())
                })
                .await?;
            tracing::info!(session_id, ?command, word = %word, "Word command applied");
        }

        Ok(CommandResponse {
            applied,
            command,
            word,
            formation_active,
            message,
        })
    }
}
