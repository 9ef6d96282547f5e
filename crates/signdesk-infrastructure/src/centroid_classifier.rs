//! Nearest-centroid classifier loaded from a JSON model artifact.
//!
//! ```json
//! { "version": 1, "feature_len": 42, "temperature": 0.1,
//!   "classes": [ { "label_index": 0, "centroid": [ ...42 floats... ] } ] }
//! ```
//!
//! Confidence is the softmax of `-distance / temperature` over all classes.

use serde::Deserialize;
use signdesk_core::error::{Result, SignDeskError};
use signdesk_core::recognition::{Classifier, FEATURE_LEN, FeatureVector};
use std::path::Path;

const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub feature_len: usize,
    pub classes: Vec<ClassCentroid>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_temperature() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassCentroid {
    pub label_index: usize,
    pub centroid: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct CentroidClassifier {
    classes: Vec<ClassCentroid>,
    temperature: f64,
}

impl CentroidClassifier {
    /// Loads and validates an artifact. Any problem is a `Model` error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SignDeskError::model(format!("Cannot read model file {}: {}", path.display(), e))
        })?;
        let artifact: ModelArtifact = serde_json::from_str(&content).map_err(|e| {
            SignDeskError::model(format!("Malformed model file {}: {}", path.display(), e))
        })?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        if artifact.version != SUPPORTED_VERSION {
            return Err(SignDeskError::model(format!(
                "Unsupported model version {}",
                artifact.version
            )));
        }
        if artifact.feature_len != FEATURE_LEN {
            return Err(SignDeskError::model(format!(
                "Model expects {} features, extractor produces {}",
                artifact.feature_len, FEATURE_LEN
            )));
        }
        if artifact.classes.is_empty() {
            return Err(SignDeskError::model("Model has no classes"));
        }
        if let Some(bad) = artifact
            .classes
            .iter()
            .find(|c| c.centroid.len() != FEATURE_LEN || c.centroid.iter().any(|v| !v.is_finite()))
        {
            return Err(SignDeskError::model(format!(
                "Centroid for label {} is not {} finite values",
                bad.label_index, FEATURE_LEN
            )));
        }
        if !(artifact.temperature.is_finite() && artifact.temperature > 0.0) {
            return Err(SignDeskError::model("Temperature must be positive"));
        }

        Ok(Self {
            classes: artifact.classes,
            temperature: artifact.temperature,
        })
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

impl Classifier for CentroidClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<(usize, f64)> {
        let x = features.as_slice();
        let distances: Vec<f64> = self
            .classes
            .iter()
            .map(|class| {
                class
                    .centroid
                    .iter()
                    .zip(x)
                    .map(|(c, v)| (c - v).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();

        let (best, best_distance) = distances
            .iter()
            .copied()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| SignDeskError::model("Model has no classes"))?;

        // Softmax of -d/t, shifted by the best logit for stability.
        let normalizer: f64 = distances
            .iter()
            .map(|d| ((best_distance - d) / self.temperature).exp())
            .sum();
        let confidence = 1.0 / normalizer;

        Ok((self.classes[best].label_index, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn centroid(value: f64) -> Vec<f64> {
        vec![value; FEATURE_LEN]
    }

    fn artifact() -> ModelArtifact {
        ModelArtifact {
            version: 1,
            feature_len: FEATURE_LEN,
            classes: vec![
                ClassCentroid {
                    label_index: 0,
                    centroid: centroid(0.0),
                },
                ClassCentroid {
                    label_index: 1,
                    centroid: centroid(0.5),
                },
            ],
            temperature: 0.1,
        }
    }

    #[test]
    fn test_predicts_nearest_centroid() {
        let classifier = CentroidClassifier::from_artifact(artifact()).unwrap();
        let features = FeatureVector::new(centroid(0.45)).unwrap();

        let (label, confidence) = classifier.predict(&features).unwrap();
        assert_eq!(label, 1);
        assert!(confidence > 0.5 && confidence <= 1.0);
    }

    #[test]
    fn test_equidistant_classes_split_confidence() {
        let classifier = CentroidClassifier::from_artifact(artifact()).unwrap();
        let features = FeatureVector::new(centroid(0.25)).unwrap();

        let (_, confidence) = classifier.predict(&features).unwrap();
        assert!((confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_artifacts() {
        let mut wrong_len = artifact();
        wrong_len.classes[0].centroid.pop();
        assert!(matches!(
            CentroidClassifier::from_artifact(wrong_len),
            Err(SignDeskError::Model(_))
        ));

        let mut no_classes = artifact();
        no_classes.classes.clear();
        assert!(CentroidClassifier::from_artifact(no_classes).is_err());

        let mut cold = artifact();
        cold.temperature = 0.0;
        assert!(CentroidClassifier::from_artifact(cold).is_err());
    }

    #[test]
    fn test_load_missing_or_malformed_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent.json");
        assert!(matches!(
            CentroidClassifier::load(&missing),
            Err(SignDeskError::Model(_))
        ));

        let broken = temp_dir.path().join("broken.json");
        let mut file = std::fs::File::create(&broken).unwrap();
        file.write_all(b"{\"version\": 1").unwrap();
        assert!(matches!(
            CentroidClassifier::load(&broken),
            Err(SignDeskError::Model(_))
        ));
    }
}
