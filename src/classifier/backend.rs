// Classifier adapter
// Wraps a pretrained binary model behind a feature-vector-in, label-out interface

use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

use crate::classifier::forest::RandomForest;
use crate::classifier::input::ModelInput;
use crate::events::FeatureVector;

/// Errors that can occur during classification
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("Model loading failed: {0}")]
    ModelLoadError(String),

    #[error("Invalid feature vector: {0}")]
    FeatureShapeError(String),
}

/// A trained binary model. Implementations are immutable after load.
pub trait BinaryModel: Send + Sync {
    /// True when the input is classified as a corner clipper
    fn predict(&self, input: &ModelInput) -> bool;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Unified classifier interface
pub struct Classifier {
    model: Box<dyn BinaryModel>,
    fingerprint: Option<String>,
}

impl Classifier {
    /// Wrap an already constructed model
    pub fn new(model: impl BinaryModel + 'static) -> Self {
        Classifier {
            model: Box::new(model),
            fingerprint: None,
        }
    }

    /// Load a random forest artifact from disk
    pub fn from_file(path: &Path) -> Result<Self, ClassifierError> {
        let data = std::fs::read(path).map_err(|e| {
            ClassifierError::ModelLoadError(format!("cannot read {}: {}", path.display(), e))
        })?;

        let forest = RandomForest::from_slice(&data).map_err(|e| match e {
            ClassifierError::ModelLoadError(reason) => {
                ClassifierError::ModelLoadError(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })?;

        let fingerprint = calculate_sha256(&data);
        log::info!(
            "Loaded {} from {} (sha256 {})",
            forest.describe(),
            path.display(),
            fingerprint
        );

        Ok(Classifier {
            model: Box::new(forest),
            fingerprint: Some(fingerprint),
        })
    }

    /// Classify an event's features
    pub fn predict(&self, features: &FeatureVector) -> Result<bool, ClassifierError> {
        let input = ModelInput::from_features(features)?;
        Ok(self.model.predict(&input))
    }

    /// Classify a raw row laid out in `MODEL_FEATURE_ORDER`
    pub fn predict_row(&self, row: &[f64]) -> Result<bool, ClassifierError> {
        let input = ModelInput::from_row(row)?;
        Ok(self.model.predict(&input))
    }

    pub fn describe(&self) -> String {
        self.model.describe()
    }

    /// SHA-256 of the loaded artifact, when loaded from a file
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("model", &self.model.describe())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FeatureName;
    use crate::test_support;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every input it sees
    struct Recording {
        seen: Mutex<Vec<[f64; 4]>>,
    }

    impl BinaryModel for Recording {
        fn predict(&self, input: &ModelInput) -> bool {
            self.seen.lock().unwrap().push(input.as_row());
            input.value(FeatureName::OuterRatio) > 0.5
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    fn features(ratio: f64) -> FeatureVector {
        FeatureVector {
            radial_cog: 300.0,
            vertical_cog: -50.0,
            outer_ratio: ratio,
            total_charge: 12.0,
        }
    }

    #[test]
    fn test_calculate_sha256() {
        let hash = calculate_sha256(b"hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_predict_with_injected_model() {
        let classifier = Classifier::new(Recording {
            seen: Mutex::new(Vec::new()),
        });

        assert!(classifier.predict(&features(0.7)).unwrap());
        assert!(!classifier.predict(&features(0.2)).unwrap());
        assert!(classifier.fingerprint().is_none());
        assert_eq!(classifier.describe(), "recording");
    }

    #[test]
    fn test_model_sees_training_column_order() {
        let model = Recording {
            seen: Mutex::new(Vec::new()),
        };
        let input = ModelInput::from_features(&features(0.7)).unwrap();
        model.predict(&input);

        assert_eq!(model.seen.lock().unwrap()[0], [300.0, 0.7, -50.0, 12.0]);
    }

    #[test]
    fn test_predict_rejects_non_finite() {
        let classifier = Classifier::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let mut bad = features(0.7);
        bad.total_charge = f64::INFINITY;

        assert!(matches!(
            classifier.predict(&bad),
            Err(ClassifierError::FeatureShapeError(_))
        ));
    }

    #[test]
    fn test_predict_row_shape() {
        let classifier = Classifier::new(Recording {
            seen: Mutex::new(Vec::new()),
        });

        assert!(classifier.predict_row(&[300.0, 0.9, -50.0, 12.0]).unwrap());
        assert!(matches!(
            classifier.predict_row(&[300.0, 0.9, -50.0]),
            Err(ClassifierError::FeatureShapeError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.json");
        fs::write(&path, test_support::RATIO_FOREST_JSON).unwrap();

        let classifier = Classifier::from_file(&path).unwrap();
        assert_eq!(
            classifier.fingerprint(),
            Some(calculate_sha256(test_support::RATIO_FOREST_JSON.as_bytes()).as_str())
        );
        assert!(classifier.predict(&features(0.95)).unwrap());
    }

    #[test]
    fn test_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trained_corner_clippers.json");

        let err = Classifier::from_file(&path).unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoadError(_)));
        assert!(err.to_string().contains("trained_corner_clippers.json"));
    }

    #[test]
    fn test_classifier_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Classifier>();
    }
}
