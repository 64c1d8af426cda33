// Shared test fixtures
// Synthetic detector geometry, pulse records and small forest artifacts

use crate::events::{Pulse, PulseRecord};
use crate::geometry::{load, Position, SensorGeometry, SensorId, SensorRecord};

/// Two trees: clip when ratio > 0.5, with a weak low-charge vote
pub const RATIO_FOREST_JSON: &str = r#"{
    "model_id": "ratio-cut",
    "model_version": "0.1.0",
    "features": ["Cogr", "ratio", "Cogz", "PEtot"],
    "trees": [
        {"nodes": [
            {"feature": "ratio", "threshold": 0.5, "left": 1, "right": 2},
            {"value": [10.0, 0.0]},
            {"value": [0.0, 10.0]}
        ]},
        {"nodes": [
            {"feature": "PEtot", "threshold": 100.0, "left": 1, "right": 2},
            {"value": [8.0, 2.0]},
            {"value": [1.0, 9.0]}
        ]}
    ]
}"#;

/// One tree: clip when the vertical centre of gravity is at or below zero
pub const DEPTH_FOREST_JSON: &str = r#"{
    "model_id": "depth-cut",
    "model_version": "0.1.0",
    "features": ["Cogr", "ratio", "Cogz", "PEtot"],
    "trees": [
        {"nodes": [
            {"feature": "Cogz", "threshold": 0.0, "left": 1, "right": 2},
            {"value": [0.0, 1.0]},
            {"value": [1.0, 0.0]}
        ]}
    ]
}"#;

/// Sensor records for strings 1..=86 with 60 sensors each
pub fn full_geometry_records() -> Vec<SensorRecord> {
    let mut records = Vec::with_capacity(86 * 60);
    for string in 1..=86u32 {
        let angle = string as f64 * 0.7;
        let radius = 20.0 + 6.0 * string as f64;
        for position in 1..=60u32 {
            records.push(SensorRecord::new(
                SensorId::new(string, position),
                Position::new(
                    radius * angle.cos(),
                    radius * angle.sin(),
                    500.0 - 17.0 * position as f64,
                ),
            ));
        }
    }
    records
}

pub fn full_geometry() -> SensorGeometry {
    load(&full_geometry_records()).expect("synthetic geometry is valid")
}

/// Deterministic pseudo-random pulse record over the full geometry
pub fn scattered_record(seed: u64) -> PulseRecord {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        state >> 33
    };

    let mut record = PulseRecord::new();
    let sensors = 5 + next() % 30;
    for _ in 0..sensors {
        let string = 1 + (next() % 86) as u32;
        let position = 1 + (next() % 60) as u32;
        let pulses = (0..1 + next() % 4)
            .map(|i| {
                let charge = 0.1 + (next() % 5000) as f64 / 1000.0;
                Pulse::new(charge, 9_800.0 + 40.0 * i as f64)
            })
            .collect();
        record.insert(SensorId::new(string, position), pulses);
    }
    record
}
