//! Directory-backed key/value store with per-key expiry.
//!
//! Each key lives in its own JSON envelope `{key, expires_at, value}`. The
//! file name is the SHA-256 of the key, so names stay short and path-safe
//! whatever the key length. The envelope keeps the full key; a file whose
//! envelope names a different key reads as absent. Expired envelopes read as
//! absent and are deleted lazily.

use super::atomic_file::{AtomicFileError, AtomicJsonFile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENVELOPE_EXT: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    key: String,
    expires_at: DateTime<Utc>,
    value: Value,
}

impl Envelope {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Blocking key/value store; wrap calls in `spawn_blocking` from async code.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, AtomicFileError> {
        let file = self.file_for(key);
        match file.load()? {
            Some(envelope) if envelope.key != key => Ok(None),
            Some(envelope) if envelope.is_expired(Utc::now()) => {
                file.remove()?;
                Ok(None)
            }
            Some(envelope) => Ok(Some(envelope.value)),
            None => Ok(None),
        }
    }

    pub fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<(), AtomicFileError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AtomicFileError::InvalidValue(format!("TTL out of range: {}", e)))?;
        let envelope = Envelope {
            key: key.to_string(),
            expires_at: Utc::now() + ttl,
            value,
        };
        self.file_for(key).save(&envelope)
    }

    /// Returns `true` if a live or expired entry was removed.
    pub fn delete(&self, key: &str) -> Result<bool, AtomicFileError> {
        self.file_for(key).remove()
    }

    /// Live keys starting with `prefix`, sorted.
    ///
    /// Expired envelopes found on the way are deleted. Unreadable files are
    /// skipped so one corrupt entry cannot hide the rest.
    pub fn scan(&self, prefix: &str) -> Result<Vec<String>, AtomicFileError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENVELOPE_EXT) {
                continue;
            }
            let file = AtomicJsonFile::<Envelope>::new(path);
            let envelope = match file.load() {
                Ok(Some(envelope)) => envelope,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(path = %file.path().display(), error = %e, "Skipping unreadable store entry");
                    continue;
                }
            };
            if !envelope.key.starts_with(prefix) {
                continue;
            }
            if envelope.is_expired(now) {
                file.remove()?;
                continue;
            }
            keys.push(envelope.key);
        }
        keys.sort();
        Ok(keys)
    }

    /// Fails when the store directory cannot be created or is not a directory.
    pub fn ping(&self) -> Result<(), AtomicFileError> {
        fs::create_dir_all(&self.dir)?;
        if fs::metadata(&self.dir)?.is_dir() {
            Ok(())
        } else {
            Err(AtomicFileError::InvalidPath(format!(
                "{} is not a directory",
                self.dir.display()
            )))
        }
    }

    fn file_for(&self, key: &str) -> AtomicJsonFile<Envelope> {
        AtomicJsonFile::new(self.dir.join(format!("{}.{}", file_stem(key), ENVELOPE_EXT)))
    }
}

fn file_stem(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
