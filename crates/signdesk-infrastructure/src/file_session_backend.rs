//! Durable session backend on top of [`FileKvStore`].
//!
//! Sessions are stored under the key `session:<id>`. Every call runs on the
//! blocking pool; callers bound it with a timeout.

use crate::storage::FileKvStore;
use async_trait::async_trait;
use signdesk_core::error::{Result, SignDeskError};
use signdesk_core::session::{SessionBackend, SessionState};
use std::path::PathBuf;
use std::time::Duration;

const KEY_PREFIX: &str = "session:";

#[derive(Debug, Clone)]
pub struct FileSessionBackend {
    store: FileKvStore,
}

impl FileSessionBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            store: FileKvStore::new(dir),
        }
    }

    fn key(session_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, session_id)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(FileKvStore) -> Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store))
            .await
            .map_err(|e| SignDeskError::internal(format!("Session store task failed: {}", e)))?
    }
}

#[async_trait]
impl SessionBackend for FileSessionBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn location(&self) -> Option<String> {
        Some(self.store.dir().display().to_string())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        let key = Self::key(session_id);
        self.blocking(move |store| match store.get(&key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        })
        .await
    }

    async fn save(&self, state: &SessionState, ttl: Duration) -> Result<()> {
        let key = Self::key(&state.id);
        let value = serde_json::to_value(state)?;
        self.blocking(move |store| Ok(store.set_with_ttl(&key, value, ttl)?))
            .await
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        let key = Self::key(session_id);
        self.blocking(move |store| Ok(store.delete(&key)?)).await
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        self.blocking(|store| {
            Ok(store
                .scan(KEY_PREFIX)?
                .into_iter()
                .filter_map(|key| key.strip_prefix(KEY_PREFIX).map(str::to_string))
                .collect())
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.blocking(|store| {
            store
                .ping()
                .map_err(|e| SignDeskError::backend(format!("Session store unreachable: {}", e)))
        })
        .await
    }
}
