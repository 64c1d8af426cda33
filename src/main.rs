// Corner Clippers - command-line entry point
// Labels physics events as corner clippers and writes the filtered event streams

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corner_clippers::config::{OutputMode, Overrides, RunConfig};
use corner_clippers::events::FeatureExtractor;
use corner_clippers::geometry::{self, GeometryIndex, JsonGeometryFile};
use corner_clippers::pipeline::{BatchOptions, BatchRunner, EventProcessor, TraceWriter};
use corner_clippers::Classifier;

/// Command-line arguments for corner-clippers
#[derive(Parser, Debug)]
#[command(name = "corner-clippers")]
#[command(about = "Label corner clipper events in JSON-lines event files")]
#[command(version)]
struct Args {
    /// Event files to process
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// TOML run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Detector geometry document
    #[arg(short, long, env = "CORNER_CLIPPERS_GEOMETRY")]
    geometry: Option<PathBuf>,

    /// Trained random forest artifact
    #[arg(short, long, env = "CORNER_CLIPPERS_MODEL")]
    model: Option<PathBuf>,

    /// Pulse series read from physics events
    #[arg(long)]
    pulses: Option<String>,

    /// Output grouping
    #[arg(long, value_enum)]
    mode: Option<OutputMode>,

    /// Output file in combined mode
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output file name suffix in per-input mode
    #[arg(long)]
    suffix: Option<String>,

    /// Worker threads for event processing
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Append a JSONL run trace to this file
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            geometry: self.geometry.clone(),
            model: self.model.clone(),
            pulse_series: self.pulses.clone(),
            workers: self.jobs,
            trace: self.trace.clone(),
            mode: self.mode,
            output: self.output.clone(),
            suffix: self.suffix.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "corner_clippers=debug"
    } else {
        "corner_clippers=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = RunConfig::resolve(args.config.as_deref(), args.overrides())
        .context("Failed to resolve run configuration")?;

    let trace = config.trace.clone().map(TraceWriter::new);

    let source = JsonGeometryFile::new(&config.geometry);
    let geometry = geometry::load(&source)
        .with_context(|| format!("Failed to load geometry from {}", config.geometry.display()))?;
    let index = Arc::new(GeometryIndex::build(geometry));
    if let Some(trace) = &trace {
        trace.record(trace.stage("geometry").complete(format!(
            "Loaded {} sensors from {}",
            index.geometry().len(),
            config.geometry.display()
        )));
    }

    let classifier = Classifier::from_file(&config.model)
        .with_context(|| format!("Failed to load model from {}", config.model.display()))?;
    if let Some(trace) = &trace {
        let entry = trace
            .stage("model")
            .complete(format!("Loaded {}", classifier.describe()))
            .with_data(serde_json::json!({
                "path": config.model,
                "sha256": classifier.fingerprint(),
            }));
        trace.record(entry);
    }

    let processor = EventProcessor::new(
        FeatureExtractor::new(index),
        Arc::new(classifier),
        config.pulse_series.clone(),
    );

    let mut runner = BatchRunner::new(processor, BatchOptions::from_config(&config))
        .context("Failed to set up batch")?;
    if let Some(trace) = trace {
        runner = runner.with_trace(trace);
    }

    let summary = runner.run(&args.inputs).context("Batch aborted")?;
    for output in &summary.outputs {
        log::info!("Output: {}", output.display());
    }

    Ok(())
}
