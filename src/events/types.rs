// Event types
// Pulse records, feature vectors and the event records that flow through the pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::geometry::SensorId;

/// A single detected light signal at a sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    /// Charge in photoelectrons (non-negative)
    pub charge: f64,

    /// Arrival time in nanoseconds
    pub time: f64,
}

impl Pulse {
    pub fn new(charge: f64, time: f64) -> Self {
        Pulse { charge, time }
    }
}

/// Wire form of one sensor's pulses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPulses {
    pub string: u32,
    pub position: u32,
    pub pulses: Vec<Pulse>,
}

/// Per-event sparse map from sensor to its pulses
/// Only sensors with at least one pulse are stored. Iteration is ordered by sensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SensorPulses>", into = "Vec<SensorPulses>")]
pub struct PulseRecord {
    pulses: BTreeMap<SensorId, Vec<Pulse>>,
}

impl PulseRecord {
    pub fn new() -> Self {
        PulseRecord::default()
    }

    /// Append pulses for a sensor; an empty list leaves the record unchanged
    pub fn insert(&mut self, sensor: SensorId, pulses: Vec<Pulse>) {
        if pulses.is_empty() {
            return;
        }
        self.pulses.entry(sensor).or_default().extend(pulses);
    }

    /// Builder form of `insert`
    pub fn with_sensor(mut self, sensor: SensorId, pulses: Vec<Pulse>) -> Self {
        self.insert(sensor, pulses);
        self
    }

    pub fn pulses(&self, sensor: &SensorId) -> Option<&[Pulse]> {
        self.pulses.get(sensor).map(|p| p.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SensorId, &[Pulse])> {
        self.pulses.iter().map(|(sensor, pulses)| (sensor, pulses.as_slice()))
    }

    /// Number of sensors with pulses
    pub fn sensor_count(&self) -> usize {
        self.pulses.len()
    }

    /// Number of pulses across all sensors
    pub fn pulse_count(&self) -> usize {
        self.pulses.values().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }
}

impl From<Vec<SensorPulses>> for PulseRecord {
    fn from(entries: Vec<SensorPulses>) -> Self {
        let mut record = PulseRecord::new();
        for entry in entries {
            record.insert(SensorId::new(entry.string, entry.position), entry.pulses);
        }
        record
    }
}

impl From<PulseRecord> for Vec<SensorPulses> {
    fn from(record: PulseRecord) -> Self {
        record
            .pulses
            .into_iter()
            .map(|(sensor, pulses)| SensorPulses {
                string: sensor.string,
                position: sensor.position,
                pulses,
            })
            .collect()
    }
}

/// Names of the extracted features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureName {
    /// Charge-weighted mean distance from the detector axis
    RadialCog,
    /// Charge-weighted mean depth coordinate
    VerticalCog,
    /// Fraction of charge collected by outer sensors
    OuterRatio,
    /// Total charge in the event
    TotalCharge,
}

impl FeatureName {
    pub const ALL: [FeatureName; 4] = [
        FeatureName::RadialCog,
        FeatureName::VerticalCog,
        FeatureName::OuterRatio,
        FeatureName::TotalCharge,
    ];

    /// Column name used by trained model artifacts
    pub fn model_key(&self) -> &'static str {
        match self {
            FeatureName::RadialCog => "Cogr",
            FeatureName::VerticalCog => "Cogz",
            FeatureName::OuterRatio => "ratio",
            FeatureName::TotalCharge => "PEtot",
        }
    }

    /// Parse a model column name
    pub fn from_model_key(key: &str) -> Option<Self> {
        FeatureName::ALL.into_iter().find(|name| name.model_key() == key)
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_key())
    }
}

/// The four per-event summary features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Radial centre of gravity (m)
    pub radial_cog: f64,

    /// Vertical centre of gravity (m)
    pub vertical_cog: f64,

    /// Outer charge / total charge, in [0, 1] for non-negative charges
    pub outer_ratio: f64,

    /// Total charge (PE)
    pub total_charge: f64,
}

impl FeatureVector {
    /// Look up a feature by name
    pub fn get(&self, name: FeatureName) -> f64 {
        match name {
            FeatureName::RadialCog => self.radial_cog,
            FeatureName::VerticalCog => self.vertical_cog,
            FeatureName::OuterRatio => self.outer_ratio,
            FeatureName::TotalCharge => self.total_charge,
        }
    }
}

/// Event stream category (frame type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StreamCategory {
    TrayInfo,
    Geometry,
    Calibration,
    DetectorStatus,
    #[serde(rename = "DAQ")]
    Daq,
    Physics,
    /// Simulation frames
    #[serde(rename = "S")]
    Simulation,
}

impl StreamCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamCategory::TrayInfo => "TrayInfo",
            StreamCategory::Geometry => "Geometry",
            StreamCategory::Calibration => "Calibration",
            StreamCategory::DetectorStatus => "DetectorStatus",
            StreamCategory::Daq => "DAQ",
            StreamCategory::Physics => "Physics",
            StreamCategory::Simulation => "S",
        }
    }
}

/// Identifies an event for logging and failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
    pub run_id: u32,
    pub event_id: u32,
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run {} event {}", self.run_id, self.event_id)
    }
}

/// One record of the event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub run_id: u32,

    pub event_id: u32,

    /// Stream category this record belongs to
    pub stream: StreamCategory,

    /// Named pulse series (e.g. "SRTHVInIcePulses")
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pulse_series: BTreeMap<String, PulseRecord>,

    /// Corner clipper label, written once by the labeler
    #[serde(rename = "isclip", default, skip_serializing_if = "Option::is_none")]
    pub is_clip: Option<bool>,
}

impl Event {
    /// Create an event without pulse series
    pub fn new(run_id: u32, event_id: u32, stream: StreamCategory) -> Self {
        Event {
            run_id,
            event_id,
            stream,
            pulse_series: BTreeMap::new(),
            is_clip: None,
        }
    }

    /// Create a physics event carrying one pulse series
    pub fn physics(run_id: u32, event_id: u32, series: &str, record: PulseRecord) -> Self {
        let mut event = Event::new(run_id, event_id, StreamCategory::Physics);
        event.pulse_series.insert(series.to_string(), record);
        event
    }

    pub fn key(&self) -> EventKey {
        EventKey {
            run_id: self.run_id,
            event_id: self.event_id,
        }
    }

    /// Pulse series by name
    pub fn pulses(&self, series: &str) -> Option<&PulseRecord> {
        self.pulse_series.get(series)
    }

    pub fn is_physics(&self) -> bool {
        self.stream == StreamCategory::Physics
    }
}
