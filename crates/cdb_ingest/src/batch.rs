//! Sequential import driver.
//!
//! Filters the host's layers, runs `cdb-inject` for each survivor (topmost
//! first), then runs `gdaladdo` once. Exactly one tool runs at a time.
//! A failing layer is recorded and the loop moves on; cancellation is polled
//! before every layer and between output lines, and stops the batch once the
//! running tool has exited. Overviews are never built for a cancelled batch.

use crate::config::RunConfiguration;
use crate::error::IngestError;
use crate::extent::Extent;
use crate::filter::{select_layers, Selection};
use crate::host::Host;
use crate::layer::{Layer, LayerClass, LayerKind};
use crate::process::{ToolExit, ToolRunner};
use crate::progress::{parse_percent, ProgressState};
use crate::tool::{Invocation, Toolchain};
use log::{debug, info};
use std::collections::VecDeque;
use std::fmt;

/// Lines of captured output kept for a failure report.
const FAILURE_OUTPUT_TAIL: usize = 20;

pub const CANCELLED_MESSAGE: &str = "Build Cancelled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    Cancelled,
}

/// A tool that failed to launch, failed while streaming, or exited non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub command: String,
    /// Exit code; `None` if the tool never ran or died from a signal.
    pub code: Option<i32>,
    /// Launch or I/O error, if any.
    pub error: Option<String>,
    /// The last non-progress output lines, in order.
    pub output: Vec<String>,
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.code) {
            (Some(error), _) => write!(f, "{error}")?,
            (None, Some(code)) => write!(f, "exited with return code {code}")?,
            (None, None) => write!(f, "terminated without a return code")?,
        }
        write!(f, ": {}", self.command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerStatus {
    Ingested(LayerClass),
    /// Not a raster, or a band count other than 1, 3 or 4.
    Unsupported,
    Failed(ToolFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    pub layer: String,
    pub status: LayerStatus,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    pub selection: Selection,
    /// One entry per layer the loop reached, in processing order.
    pub layers: Vec<LayerReport>,
    /// `None` when the batch was cancelled before the overview step.
    pub overviews: Option<Result<(), ToolFailure>>,
}

impl BatchReport {
    pub fn failures(&self) -> usize {
        let layer_failures = self
            .layers
            .iter()
            .filter(|r| matches!(r.status, LayerStatus::Failed(_)))
            .count();
        let overview_failures = usize::from(matches!(self.overviews, Some(Err(_))));
        layer_failures + overview_failures
    }

    pub fn ingested(&self) -> usize {
        self.layers
            .iter()
            .filter(|r| matches!(r.status, LayerStatus::Ingested(_)))
            .count()
    }
}

/// Runs one import over the host's project.
pub fn run_batch<H, R>(
    host: &mut H,
    runner: &mut R,
    config: &RunConfiguration,
    toolchain: &Toolchain,
    extent: &Extent,
) -> BatchReport
where
    H: Host + ?Sized,
    R: ToolRunner + ?Sized,
{
    let bounds = extent.bounds_args();
    host.report_status(&format!("Bounds: [{}]", bounds.join(", ")));
    host.report_status(&format!("Using {}", toolchain.inject_path().display()));
    info!(
        "Attribute ruleset {}, imagery LOD {}, elevation LOD {}",
        config.ruleset, config.imagery_lod, config.elevation_lod
    );

    let selection = select_layers(host, extent);
    debug!("{} layer(s) selected for import", selection.layers.len());

    let mut report = BatchReport {
        outcome: BatchOutcome::Completed,
        selection,
        layers: Vec::new(),
        overviews: None,
    };

    let mut progress = ProgressState::new(report.selection.layers.len());
    for layer in &report.selection.layers {
        if host.is_cancelled() {
            host.report_error(CANCELLED_MESSAGE);
            report.outcome = BatchOutcome::Cancelled;
            return report;
        }

        let (status, cancelled) = import_layer(host, runner, config, toolchain, extent, layer, &progress);
        report.layers.push(LayerReport {
            layer: layer.name.clone(),
            status,
        });

        progress.advance();
        host.report_progress(progress.overall(0.0));

        if cancelled {
            host.report_error(CANCELLED_MESSAGE);
            report.outcome = BatchOutcome::Cancelled;
            return report;
        }
    }

    if host.is_cancelled() {
        host.report_error(CANCELLED_MESSAGE);
        report.outcome = BatchOutcome::Cancelled;
        return report;
    }

    host.report_status("Building LODs...");
    let invocation = toolchain.overviews(config);
    let (result, _) = run_tool(host, runner, &invocation, None);
    if let Err(failure) = &result {
        report_failure(host, failure);
    }
    report.overviews = Some(result);

    host.report_progress(100.0);
    report
}

/// Imports one layer. Returns its status and whether cancellation was
/// observed while the tool ran.
fn import_layer<H, R>(
    host: &mut H,
    runner: &mut R,
    config: &RunConfiguration,
    toolchain: &Toolchain,
    extent: &Extent,
    layer: &Layer,
    progress: &ProgressState,
) -> (LayerStatus, bool)
where
    H: Host + ?Sized,
    R: ToolRunner + ?Sized,
{
    let Some(class) = LayerClass::of(layer) else {
        let why = match layer.kind {
            LayerKind::Vector => "it is not a raster layer".to_owned(),
            LayerKind::Raster => format!("{} band(s) is neither elevation nor imagery", layer.band_count),
        };
        host.report_status(&format!("Skipping layer {} because {why}.", layer.name));
        return (LayerStatus::Unsupported, false);
    };

    host.report_status(&format!(
        "Processing {class} file {}",
        layer.source.display()
    ));

    let invocation = toolchain.ingest(config, extent, layer, class);
    let (result, cancelled) = run_tool(host, runner, &invocation, Some(progress));

    let status = match result {
        Ok(()) => LayerStatus::Ingested(class),
        Err(failure) => {
            report_failure(host, &failure);
            LayerStatus::Failed(failure)
        }
    };
    (status, cancelled)
}

/// Runs a tool, forwarding its output. With `progress`, bare percentage lines
/// update overall progress; otherwise every non-blank line is status text.
fn run_tool<H, R>(
    host: &mut H,
    runner: &mut R,
    invocation: &Invocation,
    progress: Option<&ProgressState>,
) -> (Result<(), ToolFailure>, bool)
where
    H: Host + ?Sized,
    R: ToolRunner + ?Sized,
{
    let mut output = VecDeque::with_capacity(FAILURE_OUTPUT_TAIL);
    let mut cancelled = false;

    let result = runner.run(invocation, &mut |line: &str| {
        if !line.trim().is_empty() {
            match (progress, parse_percent(line)) {
                (Some(progress), Some(pct)) => host.report_progress(progress.overall(pct)),
                _ => {
                    host.report_status(line);
                    if output.len() == FAILURE_OUTPUT_TAIL {
                        output.pop_front();
                    }
                    output.push_back(line.to_owned());
                }
            }
        }

        if !cancelled && host.is_cancelled() {
            cancelled = true;
            host.report_status("Cancellation requested; waiting for the running tool to exit.");
        }
    });

    let result = match result {
        Ok(exit) if exit.success() => Ok(()),
        Ok(ToolExit { code }) => Err(ToolFailure {
            command: invocation.to_string(),
            code,
            error: None,
            output: output.into(),
        }),
        Err(e) => {
            let error = match e {
                IngestError::Launch { source, .. } => format!("failed to launch: {source}"),
                IngestError::ToolIo { source, .. } => format!("failed reading tool output: {source}"),
                other => other.to_string(),
            };
            Err(ToolFailure {
                command: invocation.to_string(),
                code: None,
                error: Some(error),
                output: output.into(),
            })
        }
    };
    (result, cancelled)
}

fn report_failure<H: Host + ?Sized>(host: &mut H, failure: &ToolFailure) {
    host.report_error(&failure.to_string());

    for line in &failure.output {
        host.report_error(line);
    }
}
