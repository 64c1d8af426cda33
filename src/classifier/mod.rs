// Classifier module
// Pretrained corner clipper model and the adapter that feeds it

pub mod backend;
pub mod forest;
pub mod input;

pub use backend::{calculate_sha256, BinaryModel, Classifier, ClassifierError};
pub use forest::{DecisionTree, ForestArtifact, RandomForest, TreeNode};
pub use input::{ModelInput, MODEL_FEATURE_ORDER};
