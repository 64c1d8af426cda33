// Model input binding
// Maps named features onto the column layout the classifier was trained with

use crate::classifier::backend::ClassifierError;
use crate::events::{FeatureName, FeatureVector};

/// Column order of the trained corner clipper model
/// (Cogr, ratio, Cogz, PEtot). This differs from the order the extractor
/// computes the features in; positional consumers must go through this constant.
pub const MODEL_FEATURE_ORDER: [FeatureName; 4] = [
    FeatureName::RadialCog,
    FeatureName::OuterRatio,
    FeatureName::VerticalCog,
    FeatureName::TotalCharge,
];

/// Validated classifier input: exactly four finite values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInput {
    features: FeatureVector,
}

impl ModelInput {
    /// Bind a feature vector, rejecting non-finite values
    pub fn from_features(features: &FeatureVector) -> Result<Self, ClassifierError> {
        for name in MODEL_FEATURE_ORDER {
            let value = features.get(name);
            if !value.is_finite() {
                return Err(ClassifierError::FeatureShapeError(format!(
                    "feature {} is not finite ({})",
                    name, value
                )));
            }
        }
        Ok(ModelInput {
            features: *features,
        })
    }

    /// Bind a raw row laid out in `MODEL_FEATURE_ORDER`
    pub fn from_row(row: &[f64]) -> Result<Self, ClassifierError> {
        if row.len() != MODEL_FEATURE_ORDER.len() {
            return Err(ClassifierError::FeatureShapeError(format!(
                "expected {} values, got {}",
                MODEL_FEATURE_ORDER.len(),
                row.len()
            )));
        }

        let value_of = |name: FeatureName| -> f64 {
            MODEL_FEATURE_ORDER
                .iter()
                .position(|n| *n == name)
                .map(|i| row[i])
                .unwrap_or(f64::NAN)
        };

        let features = FeatureVector {
            radial_cog: value_of(FeatureName::RadialCog),
            vertical_cog: value_of(FeatureName::VerticalCog),
            outer_ratio: value_of(FeatureName::OuterRatio),
            total_charge: value_of(FeatureName::TotalCharge),
        };
        Self::from_features(&features)
    }

    /// Value of a feature by name
    pub fn value(&self, name: FeatureName) -> f64 {
        self.features.get(name)
    }

    /// Values laid out in `MODEL_FEATURE_ORDER`
    pub fn as_row(&self) -> [f64; 4] {
        MODEL_FEATURE_ORDER.map(|name| self.features.get(name))
    }

    pub fn features(&self) -> &FeatureVector {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector {
            radial_cog: 410.0,
            vertical_cog: -120.0,
            outer_ratio: 0.8,
            total_charge: 55.0,
        }
    }

    #[test]
    fn test_model_feature_order() {
        let keys: Vec<&str> = MODEL_FEATURE_ORDER.iter().map(|n| n.model_key()).collect();
        assert_eq!(keys, vec!["Cogr", "ratio", "Cogz", "PEtot"]);
    }

    #[test]
    fn test_row_layout() {
        let input = ModelInput::from_features(&sample()).unwrap();
        assert_eq!(input.as_row(), [410.0, 0.8, -120.0, 55.0]);
    }

    #[test]
    fn test_from_row_binds_by_position() {
        let input = ModelInput::from_row(&[410.0, 0.8, -120.0, 55.0]).unwrap();

        assert_eq!(input.value(FeatureName::OuterRatio), 0.8);
        assert_eq!(input.value(FeatureName::VerticalCog), -120.0);
        assert_eq!(*input.features(), sample());
    }

    #[test]
    fn test_wrong_length_is_shape_error() {
        for row in [&[1.0, 2.0, 3.0][..], &[1.0, 2.0, 3.0, 4.0, 5.0][..], &[][..]] {
            assert!(matches!(
                ModelInput::from_row(row),
                Err(ClassifierError::FeatureShapeError(_))
            ));
        }
    }

    #[test]
    fn test_non_finite_is_shape_error() {
        let mut features = sample();
        features.outer_ratio = f64::NAN;
        assert!(matches!(
            ModelInput::from_features(&features),
            Err(ClassifierError::FeatureShapeError(_))
        ));

        assert!(matches!(
            ModelInput::from_row(&[1.0, f64::INFINITY, 0.0, 1.0]),
            Err(ClassifierError::FeatureShapeError(_))
        ));
    }
}
