//! Recognition domain: landmarks, feature vectors, labels and the
//! capability traits for the external detector and classifier.

pub mod classifier;
pub mod features;
pub mod labels;
pub mod model;

pub use classifier::{Classifier, HandDetector};
pub use features::{FEATURE_LEN, FeatureExtractor, FeatureVector, LANDMARK_COUNT};
pub use labels::LabelMap;
pub use model::{BoundingBox, DetectedHand, Landmark, Observation, Point, Prediction};
