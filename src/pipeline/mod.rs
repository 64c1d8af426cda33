// Pipeline execution and monitoring module
// Drives event files through labeling and records the run trace

pub mod batch;
pub mod processor;
pub mod trace;

pub use batch::{output_path_for, BatchError, BatchOptions, BatchRunner, BatchSummary};
pub use processor::{EventError, EventFailure, EventProcessor, FailureKind};
pub use trace::{read_trace_file, TraceBuilder, TraceEntry, TraceError, TraceWriter};
