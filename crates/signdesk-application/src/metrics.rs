//! Process-wide request metrics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct MetricsState {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    cache_hits: u64,
    cache_misses: u64,
    /// Running mean in seconds.
    average_response_time: f64,
    /// Last activity per session id.
    active_sessions: HashMap<String, Instant>,
}

/// Point-in-time view returned by [`GlobalMetrics::snapshot`].
///
/// Rates are percentages rounded to two decimals; the average response
/// time is in seconds, rounded to milliseconds.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsView {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub error_rate: f64,
    pub average_response_time: f64,
    pub active_sessions_count: usize,
    pub timestamp: DateTime<Utc>,
}

pub struct GlobalMetrics {
    active_window: Duration,
    state: Mutex<MetricsState>,
}

impl GlobalMetrics {
    pub fn new(active_window: Duration) -> Self {
        Self {
            active_window,
            state: Mutex::new(MetricsState::default()),
        }
    }

    pub fn record(&self, session_id: &str, success: bool, latency: Duration, cache_hit: bool) {
        self.record_at(session_id, success, latency, cache_hit, Instant::now());
    }

    pub fn record_at(
        &self,
        session_id: &str,
        success: bool,
        latency: Duration,
        cache_hit: bool,
        now: Instant,
    ) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.total_requests += 1;
        if success {
            state.successful_requests += 1;
        } else {
            state.failed_requests += 1;
        }
        if cache_hit {
            state.cache_hits += 1;
        } else {
            state.cache_misses += 1;
        }

        // Incremental mean: avg' = avg + (x - avg) / n
        let n = state.total_requests as f64;
        state.average_response_time += (latency.as_secs_f64() - state.average_response_time) / n;

        state.active_sessions.insert(session_id.to_string(), now);
    }

    pub fn snapshot(&self) -> MetricsView {
        self.snapshot_at(Instant::now())
    }

    /// Builds the view, first pruning sessions idle longer than the active
    /// window.
    pub fn snapshot_at(&self, now: Instant) -> MetricsView {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let window = self.active_window;
        state
            .active_sessions
            .retain(|_, last| now.saturating_duration_since(*last) < window);

        let cache_lookups = state.cache_hits + state.cache_misses;
        MetricsView {
            total_requests: state.total_requests,
            successful_requests: state.successful_requests,
            failed_requests: state.failed_requests,
            cache_hits: state.cache_hits,
            cache_misses: state.cache_misses,
            cache_hit_rate: round_to(percent(state.cache_hits, cache_lookups), 2),
            error_rate: round_to(percent(state.failed_requests, state.total_requests), 2),
            average_response_time: round_to(state.average_response_time, 3),
            active_sessions_count: state.active_sessions.len(),
            timestamp: Utc::now(),
        }
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_snapshot() {
        let metrics = GlobalMetrics::new(Duration::from_secs(3600));
        let view = metrics.snapshot();
        assert_eq!(view.total_requests, 0);
        assert_eq!(view.cache_hit_rate, 0.0);
        assert_eq!(view.error_rate, 0.0);
        assert_eq!(view.active_sessions_count, 0);
    }

    #[test]
    fn test_counters_and_rates() {
        let metrics = GlobalMetrics::new(Duration::from_secs(3600));
        metrics.record("a", true, Duration::from_millis(100), false);
        metrics.record("a", true, Duration::from_millis(200), true);
        metrics.record("b", false, Duration::from_millis(300), false);

        let view = metrics.snapshot();
        assert_eq!(view.total_requests, 3);
        assert_eq!(view.successful_requests, 2);
        assert_eq!(view.failed_requests, 1);
        assert_eq!(view.cache_hits, 1);
        assert_eq!(view.cache_hit_rate, 33.33);
        assert_eq!(view.error_rate, 33.33);
        assert_eq!(view.average_response_time, 0.2);
        assert_eq!(view.active_sessions_count, 2);
    }

    #[test]
    fn test_snapshot_prunes_idle_sessions() {
        let metrics = GlobalMetrics::new(Duration::from_secs(3600));
        let t0 = Instant::now();
        metrics.record_at("old", true, Duration::ZERO, false, t0);
        metrics.record_at("new", true, Duration::ZERO, false, t0 + Duration::from_secs(3000));

        let view = metrics.snapshot_at(t0 + Duration::from_secs(3700));
        assert_eq!(view.active_sessions_count, 1);
        // Pruning is persistent; totals are not affected.
        assert_eq!(metrics.snapshot_at(t0 + Duration::from_secs(3700)).active_sessions_count, 1);
        assert_eq!(view.total_requests, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_record_and_snapshot() {
        let metrics = Arc::new(GlobalMetrics::new(Duration::from_secs(3600)));
        let mut handles = Vec::new();
        for worker in 0..8 {
            let metrics = metrics.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    metrics.record(&format!("s{}", worker), i % 2 == 0, Duration::from_millis(5), false);
                    if i % 10 == 0 {
                        metrics.snapshot();
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let view = metrics.snapshot();
        assert_eq!(view.total_requests, 800);
        assert_eq!(view.successful_requests + view.failed_requests, 800);
        assert_eq!(view.active_sessions_count, 8);
        assert!((view.average_response_time - 0.005).abs() < 1e-3);
    }
}
