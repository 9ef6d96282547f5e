//! Root configuration model.
//!
//! Every section and field has a default so that a partial (or absent)
//! `config.toml` still yields a complete configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RootConfig {
    pub server: ServerConfig,
    pub recognition: RecognitionConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub store: StoreConfig,
    pub metrics: MetricsConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Directory for rolling log files. Logs go to stdout only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Classifier artifact. Resolved against the data directory when unset.
    pub model_path: Option<PathBuf>,
    /// Hand detector sidecar endpoint. Detection is unavailable when unset.
    pub detector_url: Option<String>,
    pub detector_timeout_ms: u64,
    pub confirmation_delay_ms: u64,
    pub prediction_cooldown_ms: u64,
    pub confidence_threshold: f64,
    /// Consecutive hand-less frames after which a pending letter is dropped.
    pub hand_loss_frames: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            detector_url: None,
            detector_timeout_ms: 2000,
            confirmation_delay_ms: 3000,
            prediction_cooldown_ms: 500,
            confidence_threshold: 0.5,
            hand_loss_frames: 3,
        }
    }
}

impl RecognitionConfig {
    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.confirmation_delay_ms)
    }

    pub fn prediction_cooldown(&self) -> Duration {
        Duration::from_millis(self.prediction_cooldown_ms)
    }

    pub fn detector_timeout(&self) -> Duration {
        Duration::from_millis(self.detector_timeout_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_ms: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 100,
            capacity: 50,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: usize,
    pub window_secs: u64,
    pub min_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 60,
            window_secs: 60,
            min_interval_ms: 100,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Which session backend is primary.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Memory,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Durable store directory. Resolved against the data directory when unset.
    pub path: Option<PathBuf>,
    pub session_ttl_secs: u64,
    pub operation_timeout_ms: u64,
    pub retry_interval_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            path: None,
            session_ttl_secs: 86_400,
            operation_timeout_ms: 5000,
            retry_interval_secs: 30,
            sweep_interval_secs: 600,
        }
    }
}

impl StoreConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub active_window_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            active_window_secs: 3600,
        }
    }
}

impl MetricsConfig {
    pub fn active_window(&self) -> Duration {
        Duration::from_secs(self.active_window_secs)
    }
}
