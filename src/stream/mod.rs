// Event stream module
// JSON-lines event files: reading inputs and writing filtered outputs

pub mod reader;
pub mod writer;

use std::path::PathBuf;
use thiserror::Error;

pub use reader::{read_events, EventReader};
pub use writer::{EventWriter, StreamFilter};

/// Errors raised while reading or writing event files
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed event at {path}:{line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
