//! Error types for the SignDesk service.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the entire SignDesk service.
///
/// Variants follow the service's failure taxonomy: client faults
/// (`Input`), admission control (`RateLimited`, `Throttled`), collaborator
/// readiness (`ServiceUnavailable`, `Model`, `Detector`), storage
/// (`BackendUnavailable`, `Io`, `Serialization`) and everything else
/// (`Internal`).
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum SignDeskError {
    /// Malformed or missing request input (frame payload, feature vector).
    #[error("Invalid input: {0}")]
    Input(String),

    /// Classifier or detector is not initialized or not reachable.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Durable session store could not be reached.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Sliding-window rate limit exceeded for an identity.
    #[error("Rate limit exceeded, retry after {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },

    /// Request arrived too soon after the previous one from the same origin.
    #[error("Request too frequent, retry after {retry_after_ms} ms")]
    Throttled { retry_after_ms: u64 },

    /// Classifier model artifact is absent or malformed.
    #[error("Model error: {0}")]
    Model(String),

    /// Hand detector failed to process a frame.
    #[error("Detector error: {0}")]
    Detector(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignDeskError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an Input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    /// Creates a ServiceUnavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Creates a BackendUnavailable error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::BackendUnavailable(message.into())
    }

    /// Creates a Model error
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    /// Creates a Detector error
    pub fn detector(message: impl Into<String>) -> Self {
        Self::Detector(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error is the client's fault
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    /// Check if this error is an admission-control rejection.
    ///
    /// Rejections are not counted as pipeline failures.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Throttled { .. })
    }

    /// Check if this error means a collaborator is not ready
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }

    /// Retry hint carried by admission-control rejections, in milliseconds.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms } | Self::Throttled { retry_after_ms } => {
                Some(*retry_after_ms)
            }
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for SignDeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for SignDeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SignDeskError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for SignDeskError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Undecodable frame payloads are the client's fault.
impl From<base64::DecodeError> for SignDeskError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Input(format!("Failed to decode image: {}", err))
    }
}

impl From<anyhow::Error> for SignDeskError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, SignDeskError>`.
pub type Result<T> = std::result::Result<T, SignDeskError>;
