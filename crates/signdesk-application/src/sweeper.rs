//! Periodic removal of idle sessions.

use crate::confirmation_registry::ConfirmationRegistry;
use crate::session_store::SessionStore;
use signdesk_core::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct SessionSweeper {
    sessions: Arc<SessionStore>,
    registry: Arc<ConfirmationRegistry>,
    interval: Duration,
    max_age: Duration,
}

impl SessionSweeper {
    pub fn new(
        sessions: Arc<SessionStore>,
        registry: Arc<ConfirmationRegistry>,
        interval: Duration,
        max_age: Duration,
    ) -> Self {
        Self {
            sessions,
            registry,
            interval,
            max_age,
        }
    }

    /// One pass: drops expired sessions and their engines.
    pub async fn sweep_once(&self) -> Result<usize> {
        let removed = self.sessions.sweep_expired(self.max_age).await?;
        for session_id in &removed {
            self.registry.evict(session_id).await;
        }
        Ok(removed.len())
    }

    /// Runs until `shutdown` is cancelled. The first pass happens one
    /// interval after start.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.interval;
            let mut ticker = tokio::time::interval_at(start, self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Session sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep_once().await {
                            tracing::warn!(error = %e, "Session sweep failed");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_store::SessionStoreOptions;
    use signdesk_infrastructure::MemorySessionBackend;

    #[tokio::test]
    async fn test_sweep_evicts_engines_of_removed_sessions() {
        let store = Arc::new(SessionStore::new(
            None,
            Arc::new(MemorySessionBackend::new()),
            SessionStoreOptions::default(),
        ));
        let registry = Arc::new(ConfirmationRegistry::new(Duration::from_secs(3)));

        let stale = store
            .modify("stale", |s| {
                s.last_activity = chrono::Utc::now() - chrono::Duration::days(2);
                Ok(())
            })
            .await
            .unwrap();
        drop(registry.slot(&stale).await);
        let fresh = store.get("fresh").await.unwrap();
        drop(registry.slot(&fresh).await);

        let sweeper = SessionSweeper::new(
            store.clone(),
            registry.clone(),
            Duration::from_secs(600),
            Duration::from_secs(86_400),
        );
        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
        assert_eq!(registry.len().await, 1);
        assert_eq!(store.list_ids().await.unwrap(), vec!["fresh"]);
    }

    #[tokio::test]
    async fn test_session_recreated_after_sweep_starts_a_new_word() {
        let store = Arc::new(SessionStore::new(
            None,
            Arc::new(MemorySessionBackend::new()),
            SessionStoreOptions::default(),
        ));
        let registry = Arc::new(ConfirmationRegistry::new(Duration::from_secs(3)));

        let stale = store
            .modify("s1", |s| {
                s.current_word = "OLD".to_string();
                s.created_at = chrono::Utc::now() - chrono::Duration::days(2);
                s.last_activity = s.created_at;
                Ok(())
            })
            .await
            .unwrap();
        // A request still holds the slot while the sweep runs.
        let in_flight = registry.slot(&stale).await;

        let sweeper = SessionSweeper::new(
            store.clone(),
            registry.clone(),
            Duration::from_secs(600),
            Duration::from_secs(86_400),
        );
        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
        assert_eq!(registry.len().await, 1);
        drop(in_flight);

        let recreated = store.get("s1").await.unwrap();
        assert_eq!(recreated.current_word, "");
        let slot = registry.slot(&recreated).await;
        assert_eq!(slot.lock().await.engine().word().text(), "");
    }

    #[tokio::test]
    async fn test_spawned_sweeper_stops_on_cancel() {
        let store = Arc::new(SessionStore::new(
            None,
            Arc::new(MemorySessionBackend::new()),
            SessionStoreOptions::default(),
        ));
        let registry = Arc::new(ConfirmationRegistry::new(Duration::from_secs(3)));
        let token = CancellationToken::new();
        let handle = SessionSweeper::new(
            store,
            registry,
            Duration::from_millis(10),
            Duration::from_secs(60),
        )
        .spawn(token.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
