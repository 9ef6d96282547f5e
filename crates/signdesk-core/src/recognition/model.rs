//! Recognition value types.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A single detected hand keypoint in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// 2D projection of a landmark, as returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl From<&Landmark> for Point {
    fn from(landmark: &Landmark) -> Self {
        Self {
            x: landmark.x,
            y: landmark.y,
        }
    }
}

/// Hand bounding box, normalized to `[0, 1]` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Pixel margin added around the landmark extent.
    pub const PADDING_PX: f64 = 10.0;

    /// Computes the box enclosing `landmarks`.
    ///
    /// When the image size is known the extent is padded by
    /// [`Self::PADDING_PX`] on every side. The result is clamped to `[0, 1]`.
    /// Returns `None` for an empty landmark set.
    pub fn around(
        landmarks: &[Landmark],
        image_width: Option<u32>,
        image_height: Option<u32>,
    ) -> Option<Self> {
        let first = landmarks.first()?;
        let (mut x_min, mut x_max, mut y_min, mut y_max) = (first.x, first.x, first.y, first.y);
        for lm in &landmarks[1..] {
            x_min = x_min.min(lm.x);
            x_max = x_max.max(lm.x);
            y_min = y_min.min(lm.y);
            y_max = y_max.max(lm.y);
        }

        let pad_x = image_width
            .filter(|w| *w > 0)
            .map_or(0.0, |w| Self::PADDING_PX / f64::from(w));
        let pad_y = image_height
            .filter(|h| *h > 0)
            .map_or(0.0, |h| Self::PADDING_PX / f64::from(h));

        Some(Self {
            x1: (x_min - pad_x).clamp(0.0, 1.0),
            y1: (y_min - pad_y).clamp(0.0, 1.0),
            x2: (x_max + pad_x).clamp(0.0, 1.0),
            y2: (y_max + pad_y).clamp(0.0, 1.0),
        })
    }
}

/// Output of the hand detector for one frame (zero or one hand).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedHand {
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub image_width: Option<u32>,
    #[serde(default)]
    pub image_height: Option<u32>,
}

impl DetectedHand {
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::around(&self.landmarks, self.image_width, self.image_height)
    }
}

/// Classifier verdict as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Prediction {
    pub letter: Option<char>,
    pub confidence: f64,
    pub label_index: Option<usize>,
}

/// One classified frame, consumed by the confirmation engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub letter: char,
    pub confidence: f64,
    pub timestamp: Instant,
}

impl Observation {
    pub fn new(letter: char, confidence: f64, timestamp: Instant) -> Self {
        Self {
            letter,
            confidence,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_without_image_size() {
        let landmarks = vec![
            Landmark::new(0.2, 0.3),
            Landmark::new(0.6, 0.1),
            Landmark::new(0.4, 0.7),
        ];
        let bbox = BoundingBox::around(&landmarks, None, None).unwrap();
        assert_eq!(bbox.x1, 0.2);
        assert_eq!(bbox.y1, 0.1);
        assert_eq!(bbox.x2, 0.6);
        assert_eq!(bbox.y2, 0.7);
    }

    #[test]
    fn test_bounding_box_is_padded_and_clamped() {
        let landmarks = vec![Landmark::new(0.0, 0.5), Landmark::new(0.5, 1.0)];
        let bbox = BoundingBox::around(&landmarks, Some(100), Some(200)).unwrap();
        assert_eq!(bbox.x1, 0.0);
        assert!((bbox.x2 - 0.6).abs() < 1e-9);
        assert!((bbox.y1 - 0.45).abs() < 1e-9);
        assert_eq!(bbox.y2, 1.0);
    }

    #[test]
    fn test_bounding_box_empty() {
        assert!(BoundingBox::around(&[], Some(640), Some(480)).is_none());
    }
}
