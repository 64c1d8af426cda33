// Random forest model
// Decision-tree ensemble exported from the training notebook as JSON

use serde::{Deserialize, Serialize};

use crate::classifier::backend::{BinaryModel, ClassifierError};
use crate::classifier::input::{ModelInput, MODEL_FEATURE_ORDER};
use crate::events::FeatureName;

/// A tree node as stored in the artifact
/// Split nodes send `value <= threshold` to `left`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Class weights [non-clip, clip]
        value: [f64; 2],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

/// Serialized forest artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub model_id: String,
    pub model_version: String,

    /// Column names in training order
    pub features: Vec<String>,

    pub trees: Vec<DecisionTree>,
}

/// Resolved node with feature names bound
#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Split {
        feature: FeatureName,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        clip_probability: f64,
    },
}

/// Validated random forest ready for inference
#[derive(Debug, Clone)]
pub struct RandomForest {
    model_id: String,
    model_version: String,
    trees: Vec<Vec<Node>>,
}

impl RandomForest {
    /// Validate an artifact and bind its feature names
    pub fn from_artifact(artifact: ForestArtifact) -> Result<Self, ClassifierError> {
        check_feature_order(&artifact.features)?;

        if artifact.trees.is_empty() {
            return Err(load_error("forest has no trees"));
        }

        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(i, tree)| resolve_tree(i, tree))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RandomForest {
            model_id: artifact.model_id,
            model_version: artifact.model_version,
            trees,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let artifact: ForestArtifact = serde_json::from_str(json)
            .map_err(|e| load_error(format!("invalid forest JSON: {}", e)))?;
        Self::from_artifact(artifact)
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, ClassifierError> {
        let artifact: ForestArtifact = serde_json::from_slice(data)
            .map_err(|e| load_error(format!("invalid forest JSON: {}", e)))?;
        Self::from_artifact(artifact)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Mean clip probability over all trees
    pub fn clip_probability(&self, input: &ModelInput) -> f64 {
        let sum: f64 = self.trees.iter().map(|tree| walk(tree, input)).sum();
        sum / self.trees.len() as f64
    }
}

impl BinaryModel for RandomForest {
    fn predict(&self, input: &ModelInput) -> bool {
        // Ties go to the first class, as in the training library
        self.clip_probability(input) > 0.5
    }

    fn describe(&self) -> String {
        format!(
            "random forest {} v{} ({} trees)",
            self.model_id,
            self.model_version,
            self.trees.len()
        )
    }
}

fn load_error(message: impl Into<String>) -> ClassifierError {
    ClassifierError::ModelLoadError(message.into())
}

/// The artifact must list exactly the columns of `MODEL_FEATURE_ORDER`, in that order
fn check_feature_order(features: &[String]) -> Result<(), ClassifierError> {
    let expected: Vec<&str> = MODEL_FEATURE_ORDER.iter().map(|n| n.model_key()).collect();
    let declared: Vec<&str> = features.iter().map(|s| s.as_str()).collect();

    if declared != expected {
        return Err(load_error(format!(
            "model feature order {:?} does not match expected {:?}",
            declared, expected
        )));
    }
    Ok(())
}

fn resolve_tree(index: usize, tree: &DecisionTree) -> Result<Vec<Node>, ClassifierError> {
    if tree.nodes.is_empty() {
        return Err(load_error(format!("tree {} has no nodes", index)));
    }

    let count = tree.nodes.len();
    let mut nodes = Vec::with_capacity(count);

    for (id, node) in tree.nodes.iter().enumerate() {
        let resolved = match node {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let feature = FeatureName::from_model_key(feature).ok_or_else(|| {
                    load_error(format!("tree {} node {}: unknown feature '{}'", index, id, feature))
                })?;
                if !threshold.is_finite() {
                    return Err(load_error(format!(
                        "tree {} node {}: non-finite threshold",
                        index, id
                    )));
                }
                // Children after their parent keeps every walk finite
                for child in [*left, *right] {
                    if child <= id || child >= count {
                        return Err(load_error(format!(
                            "tree {} node {}: child index {} out of range",
                            index, id, child
                        )));
                    }
                }
                Node::Split {
                    feature,
                    threshold: *threshold,
                    left: *left,
                    right: *right,
                }
            }
            TreeNode::Leaf { value } => {
                let [non_clip, clip] = *value;
                let total = non_clip + clip;
                if !(non_clip >= 0.0 && clip >= 0.0 && total > 0.0 && total.is_finite()) {
                    return Err(load_error(format!(
                        "tree {} node {}: invalid leaf weights {:?}",
                        index, id, value
                    )));
                }
                Node::Leaf {
                    clip_probability: clip / total,
                }
            }
        };
        nodes.push(resolved);
    }

    Ok(nodes)
}

fn walk(tree: &[Node], input: &ModelInput) -> f64 {
    let mut id = 0;
    loop {
        match tree[id] {
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                id = if input.value(feature) <= threshold {
                    left
                } else {
                    right
                };
            }
            Node::Leaf { clip_probability } => return clip_probability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FeatureVector;
    use crate::test_support;

    fn input(radial: f64, ratio: f64, vertical: f64, total: f64) -> ModelInput {
        ModelInput::from_features(&FeatureVector {
            radial_cog: radial,
            vertical_cog: vertical,
            outer_ratio: ratio,
            total_charge: total,
        })
        .unwrap()
    }

    #[test]
    fn test_load_fixture_forest() {
        let forest = RandomForest::from_json(test_support::RATIO_FOREST_JSON).unwrap();
        assert_eq!(forest.tree_count(), 2);
        assert!(forest.describe().contains("ratio-cut"));
    }

    #[test]
    fn test_ratio_forest_predictions() {
        let forest = RandomForest::from_json(test_support::RATIO_FOREST_JSON).unwrap();

        assert!(forest.predict(&input(450.0, 0.9, 0.0, 20.0)));
        assert!(!forest.predict(&input(100.0, 0.1, 0.0, 20.0)));
    }

    #[test]
    fn test_probability_averages_trees() {
        let forest = RandomForest::from_json(test_support::RATIO_FOREST_JSON).unwrap();

        // Tree 1 votes clip (ratio > 0.5), tree 2 votes 0.2 (PEtot <= 100)
        let p = forest.clip_probability(&input(0.0, 0.9, 0.0, 50.0));
        assert!((p - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_tie_is_not_clip() {
        let json = r#"{
            "model_id": "tie", "model_version": "1",
            "features": ["Cogr", "ratio", "Cogz", "PEtot"],
            "trees": [{"nodes": [{"value": [5.0, 5.0]}]}]
        }"#;
        let forest = RandomForest::from_json(json).unwrap();
        assert!(!forest.predict(&input(0.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_splits_bind_by_name() {
        // Only depth decides: shallow events are clips
        let forest = RandomForest::from_json(test_support::DEPTH_FOREST_JSON).unwrap();

        // A positional swap of ratio and Cogz would read 0.9 as the depth and say no
        assert!(forest.predict(&input(0.0, 0.9, -100.0, 10.0)));
        assert!(!forest.predict(&input(0.0, -100.0, 0.9, 10.0)));
    }

    #[test]
    fn test_rejects_swapped_feature_order() {
        let json = test_support::RATIO_FOREST_JSON.replace(
            r#"["Cogr", "ratio", "Cogz", "PEtot"]"#,
            r#"["Cogr", "Cogz", "ratio", "PEtot"]"#,
        );
        let err = RandomForest::from_json(&json).unwrap_err();

        assert!(matches!(err, ClassifierError::ModelLoadError(_)));
        assert!(err.to_string().contains("feature order"));
    }

    #[test]
    fn test_rejects_unknown_feature() {
        let json = r#"{
            "model_id": "bad", "model_version": "1",
            "features": ["Cogr", "ratio", "Cogz", "PEtot"],
            "trees": [{"nodes": [
                {"feature": "zenith", "threshold": 1.0, "left": 1, "right": 2},
                {"value": [1.0, 0.0]},
                {"value": [0.0, 1.0]}
            ]}]
        }"#;
        assert!(matches!(
            RandomForest::from_json(json),
            Err(ClassifierError::ModelLoadError(_))
        ));
    }

    #[test]
    fn test_rejects_backward_child() {
        let json = r#"{
            "model_id": "loop", "model_version": "1",
            "features": ["Cogr", "ratio", "Cogz", "PEtot"],
            "trees": [{"nodes": [
                {"feature": "ratio", "threshold": 0.5, "left": 0, "right": 1},
                {"value": [0.0, 1.0]}
            ]}]
        }"#;
        let err = RandomForest::from_json(json).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_rejects_bad_leaf_and_empty_forest() {
        let bad_leaf = r#"{
            "model_id": "m", "model_version": "1",
            "features": ["Cogr", "ratio", "Cogz", "PEtot"],
            "trees": [{"nodes": [{"value": [0.0, 0.0]}]}]
        }"#;
        assert!(RandomForest::from_json(bad_leaf).is_err());

        let no_trees = r#"{
            "model_id": "m", "model_version": "1",
            "features": ["Cogr", "ratio", "Cogz", "PEtot"],
            "trees": []
        }"#;
        assert!(RandomForest::from_json(no_trees).is_err());
    }

    #[test]
    fn test_rejects_non_json() {
        let err = RandomForest::from_slice(b"\x80\x04joblib pickle").unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoadError(_)));
    }
}
