// Run configuration
// TOML file settings, command-line overrides and validation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::events::StreamCategory;
use crate::stream::StreamFilter;

pub const DEFAULT_GEOMETRY: &str = "detector_geometry.json";
pub const DEFAULT_MODEL: &str = "trained_corner_clippers.json";
pub const DEFAULT_PULSE_SERIES: &str = "SRTHVInIcePulses";
pub const DEFAULT_COMBINED_OUTPUT: &str = "no_cornerclippers.jsonl";
pub const DEFAULT_SUFFIX: &str = "_no_cc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How labeled events are grouped into output files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// All inputs into a single output file
    #[default]
    Combined,
    /// One output file next to each input
    PerInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub mode: OutputMode,

    /// Output file for `combined` mode
    pub path: PathBuf,

    /// Appended to the input file stem in `per-input` mode
    pub suffix: String,

    /// Stream categories written to the output
    pub streams: Vec<StreamCategory>,

    /// Categories dropped when no physics event follows them
    pub drop_orphan_streams: Vec<StreamCategory>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let filter = StreamFilter::default();
        OutputConfig {
            mode: OutputMode::Combined,
            path: PathBuf::from(DEFAULT_COMBINED_OUTPUT),
            suffix: DEFAULT_SUFFIX.to_string(),
            streams: filter.streams.into_iter().collect(),
            drop_orphan_streams: filter.drop_orphans.into_iter().collect(),
        }
    }
}

impl OutputConfig {
    pub fn filter(&self) -> StreamFilter {
        StreamFilter::new(
            self.streams.iter().copied(),
            self.drop_orphan_streams.iter().copied(),
        )
    }
}

/// Settings for one labeling run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Detector geometry document
    pub geometry: PathBuf,

    /// Trained classifier artifact
    pub model: PathBuf,

    /// Name of the pulse series read from each physics event
    pub pulse_series: String,

    /// Worker threads for event processing (1 = sequential)
    pub workers: usize,

    /// Optional JSONL trace file
    pub trace: Option<PathBuf>,

    pub output: OutputConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            geometry: PathBuf::from(DEFAULT_GEOMETRY),
            model: PathBuf::from(DEFAULT_MODEL),
            pulse_series: DEFAULT_PULSE_SERIES.to_string(),
            workers: 1,
            trace: None,
            output: OutputConfig::default(),
        }
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub geometry: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub pulse_series: Option<String>,
    pub workers: Option<usize>,
    pub trace: Option<PathBuf>,
    pub mode: Option<OutputMode>,
    pub output: Option<PathBuf>,
    pub suffix: Option<String>,
}

impl RunConfig {
    /// Load settings from a TOML file; missing keys take defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve settings: CLI overrides, then config file, then defaults
    pub fn resolve(file: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => RunConfig::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(geometry) = overrides.geometry {
            self.geometry = geometry;
        }
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(pulse_series) = overrides.pulse_series {
            self.pulse_series = pulse_series;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if overrides.trace.is_some() {
            self.trace = overrides.trace;
        }
        if let Some(mode) = overrides.mode {
            self.output.mode = mode;
        }
        if let Some(path) = overrides.output {
            self.output.path = path;
        }
        if let Some(suffix) = overrides.suffix {
            self.output.suffix = suffix;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if self.pulse_series.trim().is_empty() {
            return Err(ConfigError::Invalid("pulse_series must not be empty".to_string()));
        }
        if self.output.streams.is_empty() {
            return Err(ConfigError::Invalid(
                "output.streams must name at least one category".to_string(),
            ));
        }
        if self.output.mode == OutputMode::PerInput && self.output.suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "output.suffix must not be empty in per-input mode".to_string(),
            ));
        }
        Ok(())
    }
}
