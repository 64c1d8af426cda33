// Corner Clippers - Edge event labeling for in-ice detector data
// Module declarations

pub mod classifier;
pub mod config;
pub mod events;
pub mod geometry;
pub mod pipeline;
pub mod stream;

#[cfg(test)]
mod test_support;

pub use classifier::{Classifier, ClassifierError, RandomForest};
pub use config::{OutputMode, RunConfig};
pub use events::{Event, FeatureExtractor, FeatureVector, PulseRecord};
pub use geometry::{GeometryIndex, JsonGeometryFile, OuterSet, SensorGeometry};
pub use pipeline::{BatchRunner, BatchSummary, EventProcessor};
