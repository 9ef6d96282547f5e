//! Landmark normalization into the classifier's fixed-length input.

use super::model::Landmark;
use crate::error::{Result, SignDeskError};

/// Landmarks per detected hand.
pub const LANDMARK_COUNT: usize = 21;

/// Length of the classifier input: one (x, y) pair per landmark.
pub const FEATURE_LEN: usize = LANDMARK_COUNT * 2;

/// Bounding-box-normalized landmark coordinates, always `FEATURE_LEN` long.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Wraps raw values, rejecting anything that is not `FEATURE_LEN` long.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.len() != FEATURE_LEN {
            return Err(SignDeskError::input(format!(
                "Expected {} features, got {}",
                FEATURE_LEN,
                values.len()
            )));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Turns raw landmarks into a [`FeatureVector`].
///
/// Each coordinate is shifted by the minimum x / y over the hand so the
/// features are translation invariant. Only a full hand of
/// [`LANDMARK_COUNT`] landmarks is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn extract(&self, landmarks: &[Landmark]) -> Result<FeatureVector> {
        if landmarks.len() != LANDMARK_COUNT {
            return Err(SignDeskError::input(format!(
                "Expected {} landmarks, got {}",
                LANDMARK_COUNT,
                landmarks.len()
            )));
        }

        let x_min = landmarks.iter().map(|lm| lm.x).fold(f64::INFINITY, f64::min);
        let y_min = landmarks.iter().map(|lm| lm.y).fold(f64::INFINITY, f64::min);

        let values: Vec<f64> = landmarks
            .iter()
            .flat_map(|lm| [lm.x - x_min, lm.y - y_min])
            .collect();

        Ok(FeatureVector(values))
    }
}
