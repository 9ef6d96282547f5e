//! In-process session backend.

use async_trait::async_trait;
use signdesk_core::error::Result;
use signdesk_core::session::{SessionBackend, SessionState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    state: SessionState,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Keyed in-memory store with the same TTL semantics as the durable backend.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionBackend {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(session_id) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.state.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: drop it unless it was refreshed in the meantime.
        let mut entries = self.entries.write().await;
        if entries.get(session_id).is_some_and(|e| !e.is_live(now)) {
            entries.remove(session_id);
        }
        Ok(None)
    }

    async fn save(&self, state: &SessionState, ttl: Duration) -> Result<()> {
        let entry = Entry {
            state: state.clone(),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.write().await.insert(state.id.clone(), entry);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(session_id).is_some())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.is_live(now));
        let mut ids: Vec<String> = entries.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signdesk_core::session::SessionSettings;

    #[tokio::test]
    async fn test_round_trip_and_listing() {
        let backend = MemorySessionBackend::new();
        let ttl = Duration::from_secs(60);
        for id in ["b", "a"] {
            backend
                .save(&SessionState::new(id, SessionSettings::default()), ttl)
                .await
                .unwrap();
        }

        assert_eq!(backend.load("a").await.unwrap().unwrap().id, "a");
        assert_eq!(backend.list_ids().await.unwrap(), vec!["a", "b"]);
        assert_eq!(backend.len().await, 2);
        assert!(backend.delete("a").await.unwrap());
        assert!(!backend.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_expiry_matches_durable_semantics() {
        let backend = MemorySessionBackend::new();
        backend
            .save(&SessionState::new("gone", SessionSettings::default()), Duration::ZERO)
            .await
            .unwrap();

        assert!(backend.load("gone").await.unwrap().is_none());
        assert!(backend.list_ids().await.unwrap().is_empty());
        assert_eq!(backend.len().await, 0);
    }
}
