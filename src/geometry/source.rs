// Geometry sources
// Loads a detector geometry snapshot into a SensorGeometry

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geometry::types::{Position, SensorGeometry, SensorId};

/// Errors raised while loading geometry. All of them are fatal to a run.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Geometry unavailable from {origin}: {reason}")]
    Unavailable { origin: String, reason: String },

    #[error("Geometry from {origin} contains no sensors")]
    Empty { origin: String },

    #[error("Duplicate sensor {sensor} in geometry from {origin}")]
    DuplicateSensor { origin: String, sensor: SensorId },

    #[error("Non-finite position for sensor {sensor} in geometry from {origin}")]
    InvalidPosition { origin: String, sensor: SensorId },

    #[error("Sensor {sensor} in geometry from {origin} has a zero string or position index")]
    InvalidSensor { origin: String, sensor: SensorId },
}

/// One sensor entry of a geometry snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub string: u32,
    pub position: u32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SensorRecord {
    pub fn new(sensor: SensorId, position: Position) -> Self {
        SensorRecord {
            string: sensor.string,
            position: sensor.position,
            x: position.x,
            y: position.y,
            z: position.z,
        }
    }

    pub fn sensor_id(&self) -> SensorId {
        SensorId::new(self.string, self.position)
    }

    pub fn coordinates(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

/// Anything that can hand out a geometry snapshot
pub trait GeometrySource {
    /// Reference used in log and error messages
    fn describe(&self) -> String;

    /// Produce the raw sensor list
    fn snapshot(&self) -> Result<Vec<SensorRecord>, GeometryError>;
}

impl GeometrySource for Vec<SensorRecord> {
    fn describe(&self) -> String {
        "in-memory geometry".to_string()
    }

    fn snapshot(&self) -> Result<Vec<SensorRecord>, GeometryError> {
        Ok(self.clone())
    }
}

/// On-disk geometry document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryDocument {
    /// Free-form detector configuration label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector: Option<String>,

    pub sensors: Vec<SensorRecord>,
}

/// Geometry stored as a JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonGeometryFile {
    path: PathBuf,
}

impl JsonGeometryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonGeometryFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, reason: impl ToString) -> GeometryError {
        GeometryError::Unavailable {
            origin: self.describe(),
            reason: reason.to_string(),
        }
    }
}

impl GeometrySource for JsonGeometryFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn snapshot(&self) -> Result<Vec<SensorRecord>, GeometryError> {
        let contents = std::fs::read(&self.path).map_err(|e| self.unavailable(e))?;
        let document: GeometryDocument =
            serde_json::from_slice(&contents).map_err(|e| self.unavailable(e))?;

        if let Some(ref detector) = document.detector {
            log::debug!("Geometry document {} describes {}", self.describe(), detector);
        }

        Ok(document.sensors)
    }
}

/// Load a geometry snapshot from a source
/// Rejects empty snapshots, zero indices, duplicate sensors and non-finite coordinates
pub fn load(source: &dyn GeometrySource) -> Result<SensorGeometry, GeometryError> {
    let origin = source.describe();
    let records = source.snapshot()?;

    if records.is_empty() {
        return Err(GeometryError::Empty { origin });
    }

    let mut positions = HashMap::with_capacity(records.len());
    for record in records {
        let sensor = record.sensor_id();
        let position = record.coordinates();

        if sensor.string == 0 || sensor.position == 0 {
            return Err(GeometryError::InvalidSensor { origin, sensor });
        }
        if !position.is_finite() {
            return Err(GeometryError::InvalidPosition { origin, sensor });
        }

        match positions.entry(sensor) {
            Entry::Occupied(_) => {
                return Err(GeometryError::DuplicateSensor { origin, sensor });
            }
            Entry::Vacant(slot) => {
                slot.insert(position);
            }
        }
    }

    let geometry = SensorGeometry::from_map(positions);
    log::info!(
        "Loaded geometry from {}: {} sensors on {} strings",
        origin,
        geometry.len(),
        geometry.string_count()
    );

    Ok(geometry)
}
