// Event feature extraction
// Charge-weighted centre of gravity, outer charge ratio and total charge per event

use std::sync::Arc;
use thiserror::Error;

use crate::events::types::{FeatureVector, PulseRecord};
use crate::geometry::{GeometryIndex, OuterSet, SensorGeometry, SensorId};

/// Per-event extraction failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("Pulse record is empty")]
    NoPulses,

    #[error("Pulse record from {sensors} sensors carries zero total charge")]
    ZeroCharge { sensors: usize },

    #[error("Sensor {0} has no geometry entry")]
    UnknownSensor(SensorId),

    #[error("Sensor {sensor} carries a negative pulse charge")]
    NegativeCharge { sensor: SensorId },
}

/// Compute the feature vector of one pulse record
///
/// Every sensor in the record must have a geometry entry and only
/// non-negative pulse charges. The record
/// is walked in sensor order, so repeated calls give identical results.
pub fn extract(
    record: &PulseRecord,
    geometry: &SensorGeometry,
    outer: &OuterSet,
) -> Result<FeatureVector, ExtractError> {
    if record.is_empty() {
        return Err(ExtractError::NoPulses);
    }

    let mut total_charge = 0.0;
    let mut outer_charge = 0.0;
    let mut r_numerator = 0.0;
    let mut z_numerator = 0.0;

    for (sensor, pulses) in record.iter() {
        let position = geometry
            .position(sensor)
            .ok_or(ExtractError::UnknownSensor(*sensor))?;

        // NaN fails this comparison too
        if pulses.iter().any(|p| !(p.charge >= 0.0)) {
            return Err(ExtractError::NegativeCharge { sensor: *sensor });
        }

        let qt: f64 = pulses.iter().map(|p| p.charge).sum();
        total_charge += qt;

        if outer.is_outer(sensor) {
            outer_charge += qt;
        }

        r_numerator += qt * position.radial();
        z_numerator += qt * position.z;
    }

    if total_charge == 0.0 {
        return Err(ExtractError::ZeroCharge {
            sensors: record.sensor_count(),
        });
    }

    Ok(FeatureVector {
        radial_cog: r_numerator / total_charge,
        vertical_cog: z_numerator / total_charge,
        outer_ratio: outer_charge / total_charge,
        total_charge,
    })
}

/// Feature extractor bound to a shared geometry index
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    index: Arc<GeometryIndex>,
}

impl FeatureExtractor {
    pub fn new(index: Arc<GeometryIndex>) -> Self {
        FeatureExtractor { index }
    }

    /// Extract features for one event's pulse record
    pub fn extract(&self, record: &PulseRecord) -> Result<FeatureVector, ExtractError> {
        extract(record, self.index.geometry(), self.index.outer())
    }

    pub fn index(&self) -> &GeometryIndex {
        &self.index
    }
}
