//! Session persistence with a durable backend and an in-memory fallback.
//!
//! Every call tries the durable backend first, bounded by a timeout. On
//! failure the store marks the durable backend degraded, serves the call
//! from the fallback, and skips the durable backend until the retry
//! interval has passed and a ping succeeds. Callers never see which
//! backend answered.

use crate::slots::SlotArena;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use signdesk_core::error::{Result, SignDeskError};
use signdesk_core::session::{
    PredictionRecord, SessionBackend, SessionPatch, SessionSettings, SessionState, WordRecord,
};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SessionStoreOptions {
    pub session_ttl: Duration,
    pub operation_timeout: Duration,
    pub retry_interval: Duration,
    pub default_confidence_threshold: f64,
    pub default_letter_delay_ms: u64,
}

impl Default for SessionStoreOptions {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(86_400),
            operation_timeout: Duration::from_secs(5),
            retry_interval: Duration::from_secs(30),
            default_confidence_threshold: 0.5,
            default_letter_delay_ms: 3000,
        }
    }
}

/// Connectivity report for the operational endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StoreInfo {
    pub connected: bool,
    pub backend: &'static str,
    pub location: Option<String>,
    pub degraded: bool,
    pub session_count: usize,
}

#[derive(Debug, Default)]
struct BackendHealth {
    degraded_until: Option<Instant>,
    failures: u64,
}

pub struct SessionStore {
    durable: Option<Arc<dyn SessionBackend>>,
    fallback: Arc<dyn SessionBackend>,
    locks: SlotArena<()>,
    health: Mutex<BackendHealth>,
    options: SessionStoreOptions,
}

impl SessionStore {
    pub fn new(
        durable: Option<Arc<dyn SessionBackend>>,
        fallback: Arc<dyn SessionBackend>,
        options: SessionStoreOptions,
    ) -> Self {
        Self {
            durable,
            fallback,
            locks: SlotArena::new(),
            health: Mutex::new(BackendHealth::default()),
            options,
        }
    }

    pub fn options(&self) -> &SessionStoreOptions {
        &self.options
    }

    /// Returns the session, creating and storing it on first use.
    pub async fn get(&self, session_id: &str) -> Result<SessionState> {
        match self.find(session_id).await? {
            Some(state) => Ok(state),
            None => self.modify(session_id, |_| Ok(())).await,
        }
    }

    /// Returns the session if it exists, without creating it.
    pub async fn find(&self, session_id: &str) -> Result<Option<SessionState>> {
        if session_id.is_empty() {
            return Err(SignDeskError::input("Session ID must not be empty"));
        }
        self.load(session_id).await
    }

    pub async fn update(&self, session_id: &str, patch: SessionPatch) -> Result<SessionState> {
        self.modify(session_id, move |state| {
            state.apply(patch);
            Ok(())
        })
        .await
    }

    /// Merges a settings patch, last write wins per key.
    pub async fn update_settings(
        &self,
        session_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<SessionSettings> {
        let state = self
            .modify(session_id, |state| {
                state.settings.merge(patch)?;
                state.last_activity = Utc::now();
                Ok(())
            })
            .await?;
        Ok(state.settings)
    }

    pub async fn append_prediction(&self, session_id: &str, record: PredictionRecord) -> Result<()> {
        self.modify(session_id, move |state| {
            state.push_prediction(record);
            state.last_activity = Utc::now();
            Ok(())
        })
        .await
        .map(|_| ())
    }

    pub async fn append_word(&self, session_id: &str, word: impl Into<String>) -> Result<()> {
        let record = WordRecord {
            word: word.into(),
            completed_at: Utc::now(),
        };
        self.modify(session_id, move |state| {
            state.push_word(record);
            state.last_activity = Utc::now();
            Ok(())
        })
        .await
        .map(|_| ())
    }

    /// Counts one handled request against the session.
    pub async fn record_request(&self, session_id: &str, elapsed: Duration) -> Result<()> {
        self.modify(session_id, move |state| {
            state.record_request(elapsed);
            Ok(())
        })
        .await
        .map(|_| ())
    }

    /// Read-modify-write under the session's lock.
    ///
    /// `f` failing leaves the stored session untouched.
    pub async fn modify<F>(&self, session_id: &str, f: F) -> Result<SessionState>
    where
        F: FnOnce(&mut SessionState) -> Result<()>,
    {
        if session_id.is_empty() {
            return Err(SignDeskError::input("Session ID must not be empty"));
        }
        let lock = self.locks.get_or_insert_with(session_id, || ()).await;
        let _guard = lock.lock().await;

        let mut state = match self.load(session_id).await? {
            Some(state) => state,
            None => SessionState::new(
                session_id,
                SessionSettings::initial(
                    self.options.default_confidence_threshold,
                    self.options.default_letter_delay_ms,
                ),
            ),
        };
        f(&mut state)?;
        self.save(&state).await?;
        Ok(state)
    }

    /// Removes sessions idle for longer than `max_age`.
    ///
    /// Each candidate is re-read and deleted under its own lock, so readers
    /// see a session either whole or not at all. Returns the removed ids.
    pub async fn sweep_expired(&self, max_age: Duration) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for session_id in self.list_ids().await? {
            let lock = self.locks.get_or_insert_with(&session_id, || ()).await;
            let expired = {
                let _guard = lock.lock().await;
                match self.load(&session_id).await? {
                    Some(state) if state.is_expired(Utc::now(), max_age) => {
                        self.delete(&session_id).await?;
                        true
                    }
                    _ => false,
                }
            };
            drop(lock);
            if expired {
                self.locks.remove_if_idle(&session_id).await;
                removed.push(session_id);
            }
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "Swept expired sessions");
        }
        Ok(removed)
    }

    /// Ids of all stored sessions across both backends.
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids: BTreeSet<String> = self.fallback.list_ids().await?.into_iter().collect();
        if let Some(durable) = self.durable_if_available().await {
            match self.bounded(durable.list_ids()).await {
                Ok(durable_ids) => {
                    self.mark_healthy();
                    ids.extend(durable_ids);
                }
                Err(e) => self.mark_degraded("list_ids", &e),
            }
        }
        Ok(ids.into_iter().collect())
    }

    pub async fn info(&self) -> Result<StoreInfo> {
        let (connected, backend, location) = match &self.durable {
            Some(durable) => {
                let connected = match self.bounded(durable.ping()).await {
                    Ok(()) => true,
                    Err(e) => {
                        self.mark_degraded("ping", &e);
                        false
                    }
                };
                (connected, durable.name(), durable.location())
            }
            None => (false, self.fallback.name(), self.fallback.location()),
        };
        let session_count = self.list_ids().await?.len();
        Ok(StoreInfo {
            connected,
            backend,
            location,
            degraded: self.is_degraded(),
            session_count,
        })
    }

    pub fn is_degraded(&self) -> bool {
        self.health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .degraded_until
            .is_some()
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        if let Some(durable) = self.durable_if_available().await {
            match self.bounded(durable.load(session_id)).await {
                Ok(Some(state)) => {
                    self.mark_healthy();
                    // Durable saves clear the fallback copy, so one that is
                    // still present was written during an outage and is newer.
                    // The next save under the session lock moves it back.
                    if let Some(outage_copy) = self.fallback.load(session_id).await? {
                        return Ok(Some(outage_copy));
                    }
                    return Ok(Some(state));
                }
                // Sessions written during an outage only exist in memory.
                Ok(None) => self.mark_healthy(),
                Err(e) => self.mark_degraded("load", &e),
            }
        }
        self.fallback.load(session_id).await
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        let ttl = self.options.session_ttl;
        if let Some(durable) = self.durable_if_available().await {
            match self.bounded(durable.save(state, ttl)).await {
                Ok(()) => {
                    self.mark_healthy();
                    // The durable copy is now the newest; drop any outage copy.
                    self.fallback.delete(&state.id).await?;
                    return Ok(());
                }
                Err(e) => self.mark_degraded("save", &e),
            }
        }
        self.fallback.save(state, ttl).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        let mut existed = self.fallback.delete(session_id).await?;
        if let Some(durable) = self.durable_if_available().await {
            match self.bounded(durable.delete(session_id)).await {
                Ok(found) => {
                    self.mark_healthy();
                    existed |= found;
                }
                Err(e) => self.mark_degraded("delete", &e),
            }
        }
        Ok(existed)
    }

    /// The durable backend, unless it is degraded and not yet due a re-probe.
    async fn durable_if_available(&self) -> Option<&Arc<dyn SessionBackend>> {
        let durable = self.durable.as_ref()?;
        let probe = {
            let health = self.health.lock().unwrap_or_else(PoisonError::into_inner);
            match health.degraded_until {
                None => false,
                Some(until) if Instant::now() < until => return None,
                Some(_) => true,
            }
        };
        if probe {
            if let Err(e) = self.bounded(durable.ping()).await {
                self.mark_degraded("ping", &e);
                return None;
            }
            self.mark_healthy();
        }
        Some(durable)
    }

    async fn bounded<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.options.operation_timeout, operation)
            .await
            .map_err(|_| {
                SignDeskError::backend(format!(
                    "Session store operation timed out after {:?}",
                    self.options.operation_timeout
                ))
            })?
    }

    fn mark_degraded(&self, operation: &'static str, error: &SignDeskError) {
        let mut health = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        if health.degraded_until.is_none() {
            tracing::warn!(
                operation,
                error = %error,
                retry_in_secs = self.options.retry_interval.as_secs(),
                "Durable session store unavailable, using in-memory fallback"
            );
        } else {
            tracing::debug!(operation, error = %error, "Durable session store still unavailable");
        }
        health.failures += 1;
        health.degraded_until = Some(Instant::now() + self.options.retry_interval);
    }

    fn mark_healthy(&self) {
        let mut health = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        if health.degraded_until.take().is_some() {
            tracing::info!(failures = health.failures, "Durable session store recovered");
        }
    }
}
