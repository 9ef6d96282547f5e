//! Capability traits for the external collaborators.
//!
//! Neither the detection algorithm nor the classification model is part of
//! this service; both are consumed through these seams.

use super::features::FeatureVector;
use super::model::DetectedHand;
use crate::error::Result;
use async_trait::async_trait;

/// Maps a feature vector to a label index and a confidence in `[0, 1]`.
///
/// Implementations fail with [`crate::SignDeskError::Model`] when their
/// model artifact is unusable.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<(usize, f64)>;

    /// Whether a model is loaded and ready to serve predictions.
    fn is_loaded(&self) -> bool {
        true
    }
}

/// Finds zero or one hand in an encoded image.
#[async_trait]
pub trait HandDetector: Send + Sync {
    /// # Returns
    ///
    /// - `Ok(Some(hand))`: A hand was found
    /// - `Ok(None)`: No hand in the frame
    /// - `Err(_)`: The detector could not process the frame
    async fn detect(&self, image: &[u8]) -> Result<Option<DetectedHand>>;

    /// Whether the detector is configured and ready.
    fn is_ready(&self) -> bool {
        true
    }
}
