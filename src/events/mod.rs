// Event module
// Pulse records, feature extraction and corner clipper labels

pub mod features;
pub mod label;
pub mod types;

pub use features::{extract, ExtractError, FeatureExtractor};
pub use label::{label, EventStage, LabelError};
pub use types::{
    Event, EventKey, FeatureName, FeatureVector, Pulse, PulseRecord, SensorPulses, StreamCategory,
};
