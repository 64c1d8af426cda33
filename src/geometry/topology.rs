// Detector topology
// Fixed outer/inner string layout and the derived set of outer sensors

use std::collections::HashSet;

use crate::geometry::types::{SensorGeometry, SensorId};

/// Strings on the outer ring of the array
/// Every standard sensor on these strings is an outer sensor
pub const OUTER_STRINGS: [u32; 28] = [
    1, 2, 3, 4, 5, 6, 7, 13, 14, 21, 22, 30, 31, 40, 41, 50, 51, 59, 60, 67, 68, 72, 73, 74, 75,
    76, 77, 78,
];

/// Interior strings, excluding the densely instrumented sub-array (79-86)
/// Only the top and bottom sensors of these strings are outer sensors
pub const INNER_STRINGS: [u32; 50] = [
    8, 9, 10, 11, 12, 15, 16, 17, 18, 19, 20, 23, 24, 25, 26, 27, 28, 29, 32, 33, 34, 35, 36, 37,
    38, 39, 42, 43, 44, 45, 46, 47, 48, 49, 52, 53, 54, 55, 56, 57, 58, 61, 62, 63, 64, 65, 66, 69,
    70, 71,
];

/// Top sensor slot on a string
pub const FIRST_POSITION: u32 = 1;

/// Bottom standard sensor slot; higher positions are not in-ice sensors
pub const LAST_POSITION: u32 = 60;

/// Sensors classified as sitting on the edge of the array
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OuterSet {
    sensors: HashSet<SensorId>,
    outer_strings: HashSet<u32>,
}

impl OuterSet {
    /// Direct membership from the topology rules
    pub fn contains(&self, sensor: &SensorId) -> bool {
        self.sensors.contains(sensor)
    }

    /// Whether a string index belongs to the outer ring
    pub fn is_outer_string(&self, string: u32) -> bool {
        self.outer_strings.contains(&string)
    }

    /// Membership as used when summing outer charge: direct membership,
    /// or any sensor on an outer string (including positions past 60)
    pub fn is_outer(&self, sensor: &SensorId) -> bool {
        self.contains(sensor) || self.is_outer_string(sensor.string)
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorId> {
        self.sensors.iter()
    }
}

/// Classify every sensor of the geometry as outer or inner
///
/// - on an outer string, positions 1..=60 are outer
/// - on an inner string, only positions 1 and 60 are outer
/// - sensors on any other string are never outer
pub fn classify_outer(
    geometry: &SensorGeometry,
    outer_strings: &[u32],
    inner_strings: &[u32],
) -> OuterSet {
    let outer: HashSet<u32> = outer_strings.iter().copied().collect();
    let inner: HashSet<u32> = inner_strings.iter().copied().collect();

    let sensors = geometry
        .sensor_ids()
        .filter(|sensor| {
            if outer.contains(&sensor.string) {
                sensor.position <= LAST_POSITION
            } else if inner.contains(&sensor.string) {
                sensor.position == FIRST_POSITION || sensor.position == LAST_POSITION
            } else {
                false
            }
        })
        .copied()
        .collect();

    OuterSet {
        sensors,
        outer_strings: outer,
    }
}

/// Geometry plus its outer-sensor classification
/// Built once per run and shared read-only between workers
#[derive(Debug, Clone)]
pub struct GeometryIndex {
    geometry: SensorGeometry,
    outer: OuterSet,
}

impl GeometryIndex {
    /// Build the index with the fixed detector topology
    pub fn build(geometry: SensorGeometry) -> Self {
        Self::with_topology(geometry, &OUTER_STRINGS, &INNER_STRINGS)
    }

    /// Build the index with explicit string lists
    pub fn with_topology(
        geometry: SensorGeometry,
        outer_strings: &[u32],
        inner_strings: &[u32],
    ) -> Self {
        let outer = classify_outer(&geometry, outer_strings, inner_strings);
        log::info!(
            "Classified {} of {} sensors as outer",
            outer.len(),
            geometry.len()
        );
        GeometryIndex { geometry, outer }
    }

    pub fn geometry(&self) -> &SensorGeometry {
        &self.geometry
    }

    pub fn outer(&self) -> &OuterSet {
        &self.outer
    }
}
