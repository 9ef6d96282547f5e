//! Session backend capability.

use super::model::SessionState;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value persistence of [`SessionState`] with per-entry TTL.
///
/// Implementations must give identical semantics so the session layer can
/// fall back from one to another without callers noticing.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Short backend name for diagnostics (`"file"`, `"memory"`).
    fn name(&self) -> &'static str;

    /// Where the data lives, if that means anything for this backend.
    fn location(&self) -> Option<String> {
        None
    }

    /// Loads a session. Expired entries are reported as absent.
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>>;

    /// Stores a session, replacing any previous value, live for `ttl`.
    async fn save(&self, state: &SessionState, ttl: Duration) -> Result<()>;

    /// Removes a session. Returns `true` if it existed.
    async fn delete(&self, session_id: &str) -> Result<bool>;

    /// Ids of all live sessions.
    async fn list_ids(&self) -> Result<Vec<String>>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<()>;
}
