// Event processor
// Runs one event through extraction, classification and labeling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::classifier::{Classifier, ClassifierError};
use crate::events::{label, Event, EventKey, EventStage, ExtractError, FeatureExtractor, LabelError};

/// Why a single event could not be labeled
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("Pulse series '{0}' not found")]
    MissingPulseSeries(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Classify(#[from] ClassifierError),

    #[error(transparent)]
    Label(#[from] LabelError),
}

/// Failure categories counted in the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingPulseSeries,
    NoPulses,
    ZeroCharge,
    UnknownSensor,
    NegativeCharge,
    FeatureShape,
    ModelLoad,
    AlreadyLabeled,
}

impl FailureKind {
    /// Failures that point at a bug rather than at the data
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            FailureKind::FeatureShape | FailureKind::ModelLoad | FailureKind::AlreadyLabeled
        )
    }
}

impl EventError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EventError::MissingPulseSeries(_) => FailureKind::MissingPulseSeries,
            EventError::Extract(ExtractError::NoPulses) => FailureKind::NoPulses,
            EventError::Extract(ExtractError::ZeroCharge { .. }) => FailureKind::ZeroCharge,
            EventError::Extract(ExtractError::UnknownSensor(_)) => FailureKind::UnknownSensor,
            EventError::Extract(ExtractError::NegativeCharge { .. }) => {
                FailureKind::NegativeCharge
            }
            EventError::Classify(ClassifierError::FeatureShapeError(_)) => {
                FailureKind::FeatureShape
            }
            EventError::Classify(ClassifierError::ModelLoadError(_)) => FailureKind::ModelLoad,
            EventError::Label(LabelError::AlreadyLabeled { .. }) => FailureKind::AlreadyLabeled,
        }
    }
}

/// An event that halted before reaching `EventStage::Labeled`
#[derive(Debug, Clone, PartialEq)]
pub struct EventFailure {
    pub event: EventKey,
    /// Last stage the event completed
    pub stage: EventStage,
    pub error: EventError,
}

impl fmt::Display for EventFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} halted at stage {:?}: {}",
            self.event, self.stage, self.error
        )
    }
}

/// Labels physics events; other stream categories pass through untouched
#[derive(Debug, Clone)]
pub struct EventProcessor {
    extractor: FeatureExtractor,
    classifier: Arc<Classifier>,
    pulse_series: String,
}

impl EventProcessor {
    pub fn new(
        extractor: FeatureExtractor,
        classifier: Arc<Classifier>,
        pulse_series: impl Into<String>,
    ) -> Self {
        EventProcessor {
            extractor,
            classifier,
            pulse_series: pulse_series.into(),
        }
    }

    pub fn pulse_series(&self) -> &str {
        &self.pulse_series
    }

    /// Process one event
    pub fn process(&self, event: Event) -> Result<Event, EventFailure> {
        if !event.is_physics() {
            return Ok(event);
        }

        let key = event.key();
        let fail = |stage: EventStage, error: EventError| EventFailure {
            event: key,
            stage,
            error,
        };

        let record = event.pulses(&self.pulse_series).ok_or_else(|| {
            fail(
                EventStage::Unlabeled,
                EventError::MissingPulseSeries(self.pulse_series.clone()),
            )
        })?;

        let features = self
            .extractor
            .extract(record)
            .map_err(|e| fail(EventStage::Unlabeled, e.into()))?;

        let is_clip = self
            .classifier
            .predict(&features)
            .map_err(|e| fail(EventStage::Extracted, e.into()))?;

        let event = label(event, is_clip).map_err(|e| fail(EventStage::Classified, e.into()))?;

        log::debug!(
            "{}: Cogr={:.2} ratio={:.3} Cogz={:.2} PEtot={:.2} -> isclip={}",
            key,
            features.radial_cog,
            features.outer_ratio,
            features.vertical_cog,
            features.total_charge,
            is_clip
        );

        Ok(event)
    }
}
