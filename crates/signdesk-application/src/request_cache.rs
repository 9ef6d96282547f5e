//! Short-lived duplicate-frame cache.
//!
//! Entries are keyed by a SHA-256 fingerprint of the raw encoded payload, so
//! only byte-identical frames collapse. The TTL is far shorter than any
//! meaningful change in the scene; the cache only absorbs bursts of the
//! same frame re-sent before the previous response arrived.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(payload: &[u8]) -> Self {
        let digest = Sha256::digest(payload);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

pub struct RequestCache<V> {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<Fingerprint, CacheEntry<V>>>,
}

impl<V: Clone> RequestCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<V> {
        self.lookup_at(fingerprint, Instant::now())
    }

    pub fn lookup_at(&self, fingerprint: &Fingerprint, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(fingerprint) {
            Some(entry) if now.saturating_duration_since(entry.inserted_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(fingerprint);
                None
            }
            None => None,
        }
    }

    pub fn store(&self, fingerprint: Fingerprint, value: V) {
        self.store_at(fingerprint, value, Instant::now());
    }

    /// Inserts an entry. When full, expired entries go first, then the
    /// oldest half by insertion time.
    pub fn store_at(&self, fingerprint: Fingerprint, value: V, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(&fingerprint) && entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, e| now.saturating_duration_since(e.inserted_at) < ttl);

            if entries.len() >= self.capacity {
                let mut by_age: Vec<(Fingerprint, Instant)> =
                    entries.iter().map(|(k, e)| (*k, e.inserted_at)).collect();
                by_age.sort_by_key(|(_, inserted_at)| *inserted_at);
                let evict = by_age.len().div_ceil(2);
                for (key, _) in by_age.into_iter().take(evict) {
                    entries.remove(&key);
                }
            }
        }
        entries.insert(
            fingerprint,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
