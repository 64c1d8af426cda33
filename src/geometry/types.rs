// Geometry types
// Sensor identifiers, positions and the read-only sensor map

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifies a single sensor by its string and its slot on that string
/// Ordered by string first, then position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorId {
    /// String (vertical cable) index, starting at 1
    pub string: u32,

    /// Position on the string, 1 at the top
    pub position: u32,
}

impl SensorId {
    pub fn new(string: u32, position: u32) -> Self {
        SensorId { string, position }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.string, self.position)
    }
}

/// Sensor position in detector coordinates (metres)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }

    /// Distance from the vertical detector axis
    pub fn radial(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Mapping from sensor to position
/// Built once by `geometry::load` and never mutated afterwards
#[derive(Debug, Clone, Default)]
pub struct SensorGeometry {
    positions: HashMap<SensorId, Position>,
}

impl SensorGeometry {
    pub(crate) fn from_map(positions: HashMap<SensorId, Position>) -> Self {
        SensorGeometry { positions }
    }

    /// Look up the position of a sensor
    pub fn position(&self, sensor: &SensorId) -> Option<&Position> {
        self.positions.get(sensor)
    }

    pub fn contains(&self, sensor: &SensorId) -> bool {
        self.positions.contains_key(sensor)
    }

    /// Number of sensors in the snapshot
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// All sensor ids (unordered)
    pub fn sensor_ids(&self) -> impl Iterator<Item = &SensorId> {
        self.positions.keys()
    }

    /// Number of distinct strings with at least one sensor
    pub fn string_count(&self) -> usize {
        let mut strings: Vec<u32> = self.positions.keys().map(|s| s.string).collect();
        strings.sort_unstable();
        strings.dedup();
        strings.len()
    }
}
