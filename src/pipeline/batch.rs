// Batch runner
// Streams input files through the event processor into the configured outputs

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{OutputMode, RunConfig};
use crate::events::Event;
use crate::pipeline::processor::{EventFailure, EventProcessor, FailureKind};
use crate::pipeline::trace::TraceWriter;
use crate::stream::{EventReader, EventWriter, StreamError, StreamFilter};

/// Events handed to the worker pool at once
const CHUNK_SIZE: usize = 1024;

/// Errors that stop the whole batch
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("No input files given")]
    NoInputs,

    #[error("Output {0} would overwrite an input file")]
    OutputOverwritesInput(PathBuf),

    #[error("Several inputs would write to {0}")]
    DuplicateOutput(PathBuf),

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub inputs: usize,
    pub events_read: usize,
    pub physics_events: usize,
    pub labeled: usize,
    pub clips: usize,
    pub failures: BTreeMap<FailureKind, usize>,
    pub events_written: usize,
    pub outputs: Vec<PathBuf>,
}

impl BatchSummary {
    pub fn non_clips(&self) -> usize {
        self.labeled - self.clips
    }

    pub fn failed(&self) -> usize {
        self.failures.values().sum()
    }

    /// Failures that indicate a bug rather than bad data
    pub fn defects(&self) -> usize {
        self.failures
            .iter()
            .filter(|(kind, _)| kind.is_defect())
            .map(|(_, count)| count)
            .sum()
    }

    fn record_read(&mut self, event: &Event) {
        self.events_read += 1;
        if event.is_physics() {
            self.physics_events += 1;
        }
    }

    fn record_failure(&mut self, kind: FailureKind) {
        *self.failures.entry(kind).or_insert(0) += 1;
    }
}

/// Where and how labeled events are written
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub mode: OutputMode,
    pub output: PathBuf,
    pub suffix: String,
    pub filter: StreamFilter,
    pub workers: usize,
}

impl BatchOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        BatchOptions {
            mode: config.output.mode,
            output: config.output.path.clone(),
            suffix: config.output.suffix.clone(),
            filter: config.output.filter(),
            workers: config.workers,
        }
    }
}

/// Output file for one input in per-input mode
///
/// `run_1.jsonl` with suffix `_no_cc` becomes `run_1_no_cc.jsonl` in the same
/// directory. Inputs without a `.jsonl` extension keep their full name.
pub fn output_path_for(input: &Path, suffix: &str) -> PathBuf {
    let base = match input.extension().and_then(|ext| ext.to_str()) {
        Some("jsonl") => input.file_stem(),
        _ => input.file_name(),
    };
    let base = base
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    input.with_file_name(format!("{}{}.jsonl", base, suffix))
}

pub struct BatchRunner {
    processor: EventProcessor,
    options: BatchOptions,
    pool: Option<rayon::ThreadPool>,
    trace: Option<TraceWriter>,
}

impl BatchRunner {
    pub fn new(processor: EventProcessor, options: BatchOptions) -> Result<Self, BatchError> {
        let pool = if options.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(options.workers)
                .thread_name(|i| format!("clipper-worker-{}", i))
                .build()
                .map_err(|e| BatchError::WorkerPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        Ok(BatchRunner {
            processor,
            options,
            pool,
            trace: None,
        })
    }

    pub fn with_trace(mut self, trace: TraceWriter) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Process every input, in order
    pub fn run(&self, inputs: &[PathBuf]) -> Result<BatchSummary, BatchError> {
        if inputs.is_empty() {
            return Err(BatchError::NoInputs);
        }

        let outputs = self.output_paths(inputs);
        let mut seen = HashSet::with_capacity(outputs.len());
        for output in &outputs {
            if inputs.iter().any(|input| same_file(input, output)) {
                return Err(BatchError::OutputOverwritesInput(output.clone()));
            }
            if !seen.insert(normalize(output)) {
                return Err(BatchError::DuplicateOutput(output.clone()));
            }
        }

        let mut summary = BatchSummary {
            inputs: inputs.len(),
            ..BatchSummary::default()
        };

        match self.options.mode {
            OutputMode::Combined => {
                let mut writer =
                    EventWriter::create(&self.options.output, self.options.filter.clone())?;
                for (i, input) in inputs.iter().enumerate() {
                    self.run_input(input, &mut writer, &mut summary)?;
                    self.trace_input(i, inputs.len(), input, writer.path());
                }
                summary.events_written += writer.finish()?;
                summary.outputs.push(self.options.output.clone());
            }
            OutputMode::PerInput => {
                for (i, (input, output)) in inputs.iter().zip(outputs).enumerate() {
                    let mut writer = EventWriter::create(&output, self.options.filter.clone())?;
                    self.run_input(input, &mut writer, &mut summary)?;
                    self.trace_input(i, inputs.len(), input, writer.path());
                    summary.events_written += writer.finish()?;
                    summary.outputs.push(output);
                }
            }
        }

        self.report(&summary);
        Ok(summary)
    }

    fn output_paths(&self, inputs: &[PathBuf]) -> Vec<PathBuf> {
        match self.options.mode {
            OutputMode::Combined => vec![self.options.output.clone()],
            OutputMode::PerInput => inputs
                .iter()
                .map(|input| output_path_for(input, &self.options.suffix))
                .collect(),
        }
    }

    /// Stream one input through the processor, one event or one chunk at a time
    fn run_input(
        &self,
        input: &Path,
        writer: &mut EventWriter,
        summary: &mut BatchSummary,
    ) -> Result<(), BatchError> {
        let reader = EventReader::open(input)?;
        let read_before = summary.events_read;

        match &self.pool {
            None => {
                for event in reader {
                    let event = event?;
                    summary.record_read(&event);
                    let result = self.processor.process(event);
                    self.dispose(result, writer, summary)?;
                }
            }
            Some(pool) => {
                let mut chunk = Vec::with_capacity(CHUNK_SIZE);
                for event in reader {
                    let event = event?;
                    summary.record_read(&event);
                    chunk.push(event);
                    if chunk.len() == CHUNK_SIZE {
                        let full = std::mem::replace(&mut chunk, Vec::with_capacity(CHUNK_SIZE));
                        self.run_chunk(pool, full, writer, summary)?;
                    }
                }
                self.run_chunk(pool, chunk, writer, summary)?;
            }
        }

        log::info!(
            "Read {} events from {}",
            summary.events_read - read_before,
            input.display()
        );
        Ok(())
    }

    /// Process a chunk on the pool; results come back in input order
    fn run_chunk(
        &self,
        pool: &rayon::ThreadPool,
        events: Vec<Event>,
        writer: &mut EventWriter,
        summary: &mut BatchSummary,
    ) -> Result<(), BatchError> {
        if events.is_empty() {
            return Ok(());
        }

        let processor = &self.processor;
        let results: Vec<Result<Event, EventFailure>> = pool.install(|| {
            events
                .into_par_iter()
                .map(|event| processor.process(event))
                .collect()
        });

        for result in results {
            self.dispose(result, writer, summary)?;
        }
        Ok(())
    }

    /// Write a processed event, or count and report its failure
    fn dispose(
        &self,
        result: Result<Event, EventFailure>,
        writer: &mut EventWriter,
        summary: &mut BatchSummary,
    ) -> Result<(), BatchError> {
        match result {
            Ok(event) => {
                if let Some(is_clip) = event.is_clip.filter(|_| event.is_physics()) {
                    summary.labeled += 1;
                    if is_clip {
                        summary.clips += 1;
                    }
                }
                writer.write(&event)?;
            }
            Err(failure) => self.report_failure(&failure, summary),
        }
        Ok(())
    }

    fn report_failure(&self, failure: &EventFailure, summary: &mut BatchSummary) {
        let kind = failure.error.kind();
        summary.record_failure(kind);

        if kind.is_defect() {
            log::error!("Excluding {}", failure);
        } else {
            log::warn!("Excluding {}", failure);
        }

        if let Some(trace) = &self.trace {
            trace.record(
                trace
                    .stage("event")
                    .start(failure.to_string())
                    .with_data(serde_json::json!({
                        "run_id": failure.event.run_id,
                        "event_id": failure.event.event_id,
                        "stage": failure.stage,
                        "kind": kind,
                        "error": failure.error.to_string(),
                    })),
            );
        }
    }

    fn trace_input(&self, index: usize, total: usize, input: &Path, output: &Path) {
        if let Some(trace) = &self.trace {
            trace.record(trace.stage("input").progress(
                (index + 1) as f32 / total as f32,
                format!("Processed {} into {}", input.display(), output.display()),
            ));
        }
    }

    fn report(&self, summary: &BatchSummary) {
        log::info!(
            "Labeled {} of {} physics events ({} clips, {} kept) from {} inputs",
            summary.labeled,
            summary.physics_events,
            summary.clips,
            summary.non_clips(),
            summary.inputs
        );
        if summary.failed() > 0 {
            log::warn!("{} events excluded: {:?}", summary.failed(), summary.failures);
        }
        if summary.defects() > 0 {
            log::error!("{} excluded events point at a defect", summary.defects());
        }
        log::info!(
            "Wrote {} events to {} file(s)",
            summary.events_written,
            summary.outputs.len()
        );

        if let Some(trace) = &self.trace {
            let data = serde_json::to_value(summary).unwrap_or(serde_json::Value::Null);
            trace.record(
                trace
                    .stage("summary")
                    .complete(format!("Labeled {} events", summary.labeled))
                    .with_data(data),
            );
        }
    }
}

/// Absolute form of a path whose file may not exist yet
fn normalize(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b || normalize(a) == normalize(b) {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
