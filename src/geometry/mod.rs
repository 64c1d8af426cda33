// Detector geometry module
// Sensor positions and the outer/inner topology used by the feature extractor

pub mod source;
pub mod topology;
pub mod types;

pub use source::{load, GeometryError, GeometrySource, JsonGeometryFile, SensorRecord};
pub use topology::{
    classify_outer, GeometryIndex, OuterSet, FIRST_POSITION, INNER_STRINGS, LAST_POSITION,
    OUTER_STRINGS,
};
pub use types::{Position, SensorGeometry, SensorId};
