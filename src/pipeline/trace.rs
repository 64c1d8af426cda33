// Run trace
// Append-only JSONL record of a labeling run: resource loads, inputs, failures, summary

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A single line of the run trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// RFC 3339 timestamp of when this entry was created
    pub timestamp: String,

    /// Identifies the labeling run that wrote the entry
    pub run: Uuid,

    /// Stage name ("geometry", "model", "input", "event", "summary")
    pub stage: String,

    /// Fraction of inputs processed [0.0, 1.0]
    pub progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn new(run: Uuid, stage: String, progress: f32, message: String) -> Self {
        TraceEntry {
            timestamp: Utc::now().to_rfc3339(),
            run,
            stage,
            progress: progress.clamp(0.0, 1.0),
            message,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Trace writer for one run
pub struct TraceWriter {
    file_path: PathBuf,
    run: Uuid,
}

impl TraceWriter {
    /// Trace a new run with a fresh id
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter {
            file_path,
            run: Uuid::new_v4(),
        }
    }

    pub fn run(&self) -> Uuid {
        self.run
    }

    /// Start an entry for a stage of this run
    pub fn stage(&self, stage: impl Into<String>) -> TraceBuilder {
        TraceBuilder {
            run: self.run,
            stage: stage.into(),
        }
    }

    /// Append an entry, creating the file if needed
    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        let json_line = entry.to_json_line()?;
        file.write_all(json_line.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Append an entry; failures are logged and otherwise ignored
    pub fn record(&self, entry: TraceEntry) {
        if let Err(e) = self.write(&entry) {
            log::warn!(
                "Failed to write trace entry to {}: {}",
                self.file_path.display(),
                e
            );
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Helper for building entries of one stage
pub struct TraceBuilder {
    run: Uuid,
    stage: String,
}

impl TraceBuilder {
    pub fn start(self, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run, self.stage, 0.0, message.into())
    }

    pub fn progress(self, progress: f32, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run, self.stage, progress, message.into())
    }

    pub fn complete(self, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run, self.stage, 1.0, message.into())
    }
}

/// Read trace entries from a JSONL file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let entry: TraceEntry = serde_json::from_str(line)?;
        entries.push(entry);
    }

    Ok(entries)
}
