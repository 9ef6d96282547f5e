//! Per-identity admission control.
//!
//! [`RateLimiter`] enforces a sliding-window request budget per identity;
//! [`Throttle`] enforces a minimum spacing between requests from one origin.
//! Each owns its own lock. Identities whose history can no longer affect a
//! decision are dropped, at most once per window or interval.

use signdesk_core::error::SignDeskError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Identity shared by clients that send neither a session id nor an address.
pub const UNKNOWN_IDENTITY: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Reject { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allow)
    }
}

/// Picks the rate-limit identity: session header, else origin, else shared.
pub fn resolve_identity(session_id: Option<&str>, origin: Option<&str>) -> String {
    session_id
        .filter(|s| !s.is_empty() && *s != UNKNOWN_IDENTITY)
        .or(origin.filter(|o| !o.is_empty()))
        .unwrap_or(UNKNOWN_IDENTITY)
        .to_string()
}

/// Per-identity state with periodic pruning.
#[derive(Debug)]
struct Tracked<V> {
    entries: HashMap<String, V>,
    last_prune: Option<Instant>,
}

impl<V> Tracked<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            last_prune: None,
        }
    }

    /// Keeps only entries for which `keep` returns true, if `every` has
    /// passed since the previous prune.
    fn prune_every<F>(&mut self, now: Instant, every: Duration, mut keep: F)
    where
        F: FnMut(&mut V) -> bool,
    {
        if self
            .last_prune
            .is_some_and(|last| now.saturating_duration_since(last) < every)
        {
            return;
        }
        self.entries.retain(|_, value| keep(value));
        self.last_prune = Some(now);
    }
}

fn drop_expired(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = timestamps.front() {
        if now.saturating_duration_since(oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: Mutex<Tracked<VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(Tracked::new()),
        }
    }

    pub fn admit(&self, identity: &str) -> Admission {
        self.admit_at(identity, Instant::now())
    }

    /// Drops timestamps older than the window, then admits iff fewer than
    /// `max_requests` remain. Only admitted requests are recorded.
    pub fn admit_at(&self, identity: &str, now: Instant) -> Admission {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let window = self.window;
        windows.prune_every(now, window, |timestamps| {
            drop_expired(timestamps, now, window);
            !timestamps.is_empty()
        });

        let timestamps = windows.entries.entry(identity.to_string()).or_default();
        drop_expired(timestamps, now, window);

        if timestamps.len() >= self.max_requests {
            let retry_after = timestamps
                .front()
                .map(|&oldest| (oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            return Admission::Reject { retry_after };
        }

        timestamps.push_back(now);
        Admission::Allow
    }

    /// Like [`Self::admit`], but as a `Result` for the request pipeline.
    pub fn check(&self, identity: &str) -> Result<(), SignDeskError> {
        match self.admit(identity) {
            Admission::Allow => Ok(()),
            Admission::Reject { retry_after } => Err(SignDeskError::RateLimited {
                retry_after_ms: duration_ms(retry_after),
            }),
        }
    }

    /// Number of identities currently holding state.
    pub fn tracked(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

pub struct Throttle {
    min_interval: Duration,
    last_seen: Mutex<Tracked<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_seen: Mutex::new(Tracked::new()),
        }
    }

    pub fn admit(&self, origin: &str) -> Admission {
        self.admit_at(origin, Instant::now())
    }

    /// Rejects a request arriving sooner than `min_interval` after the last
    /// admitted one from the same origin.
    pub fn admit_at(&self, origin: &str, now: Instant) -> Admission {
        let mut last_seen = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        let min_interval = self.min_interval;
        last_seen.prune_every(now, min_interval, |last| {
            now.saturating_duration_since(*last) < min_interval
        });

        if let Some(&last) = last_seen.entries.get(origin) {
            let since = now.saturating_duration_since(last);
            if since < self.min_interval {
                return Admission::Reject {
                    retry_after: self.min_interval - since,
                };
            }
        }
        last_seen.entries.insert(origin.to_string(), now);
        Admission::Allow
    }

    pub fn check(&self, origin: &str) -> Result<(), SignDeskError> {
        match self.admit(origin) {
            Admission::Allow => Ok(()),
            Admission::Reject { retry_after } => Err(SignDeskError::Throttled {
                retry_after_ms: duration_ms(retry_after),
            }),
        }
    }

    pub fn tracked(&self) -> usize {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}
