// Event labeling
// Attaches the corner clipper flag to an event exactly once

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::types::{Event, EventKey};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabelError {
    #[error("{event} already labeled isclip={existing}, refusing isclip={requested}")]
    AlreadyLabeled {
        event: EventKey,
        existing: bool,
        requested: bool,
    },
}

/// Processing stage reached by an event
/// Stages advance one at a time; a failure leaves the event at its current stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStage {
    Unlabeled,
    Extracted,
    Classified,
    Labeled,
}

impl EventStage {
    /// The stage that follows this one, if any
    pub fn next(&self) -> Option<EventStage> {
        match self {
            EventStage::Unlabeled => Some(EventStage::Extracted),
            EventStage::Extracted => Some(EventStage::Classified),
            EventStage::Classified => Some(EventStage::Labeled),
            EventStage::Labeled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl Event {
    /// Set the corner clipper flag
    /// Idempotent for the same value; a conflicting value is rejected
    pub fn set_clip_label(&mut self, is_clip: bool) -> Result<(), LabelError> {
        match self.is_clip {
            None => {
                self.is_clip = Some(is_clip);
                Ok(())
            }
            Some(existing) if existing == is_clip => Ok(()),
            Some(existing) => Err(LabelError::AlreadyLabeled {
                event: self.key(),
                existing,
                requested: is_clip,
            }),
        }
    }
}

/// Return the event with its corner clipper flag attached
pub fn label(mut event: Event, is_clip: bool) -> Result<Event, LabelError> {
    event.set_clip_label(is_clip)?;
    Ok(event)
}
