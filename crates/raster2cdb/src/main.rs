mod console;

use anyhow::{Context, Result};
use cdb_ingest::{
    run_batch, AttributeRuleset, BatchOutcome, BatchReport, DryRunner, Extent, Lod, Project,
    RunConfiguration, SystemRunner, Toolchain,
};
use clap::Parser;
use crate::console::ConsoleHost;
use env_logger::Env;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(windows)]
const DEFAULT_TOOL_DIR: &str = r"C:\Program Files\CDB Productivity Suite\bin";
#[cfg(not(windows))]
const DEFAULT_TOOL_DIR: &str = "/usr/local/bin";

const EXIT_PARTIAL_FAILURE: i32 = 2;
const EXIT_CANCELLED: i32 = 130;

/// Adds the raster layers of a GIS project to a new or existing CDB datastore.
///
/// Layers that are checked, intersect `--extent` and whose files exist are
/// passed to `cdb-inject` one at a time (topmost layer first); `gdaladdo`
/// then builds the imagery LODs.
#[derive(Parser, Debug)]
#[command(name = "raster2cdb", version, about, long_about = None)]
struct Args {
    /// Project file (JSON) listing layers in draw order and the layer tree.
    #[arg(long, env = "RASTER2CDB_PROJECT")]
    project: PathBuf,

    /// CDB output directory.
    #[arg(long, env = "RASTER2CDB_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Extent to process as `xmin,xmax,ymin,ymax` (degrees); a trailing
    /// `[EPSG:4326]` is accepted and ignored.
    #[arg(long, env = "RASTER2CDB_EXTENT", allow_hyphen_values = true)]
    extent: Extent,

    /// CDB tool application directory (holds cdb-inject and gdaladdo).
    #[arg(long, env = "RASTER2CDB_TOOL_DIR", default_value = DEFAULT_TOOL_DIR)]
    tool_dir: PathBuf,

    /// Imagery LOD (-10..=19).
    #[arg(long, env = "RASTER2CDB_IMAGERY_LOD", default_value_t = Lod::default(), allow_negative_numbers = true)]
    imagery_lod: Lod,

    /// Elevation LOD (-10..=19).
    #[arg(long, env = "RASTER2CDB_ELEVATION_LOD", default_value_t = Lod::default(), allow_negative_numbers = true)]
    elevation_lod: Lod,

    /// Attribute translation ruleset: GGDM, OpenStreetMaps or "SE Core".
    #[arg(long, env = "RASTER2CDB_RULESET", default_value_t = AttributeRuleset::default())]
    ruleset: AttributeRuleset,

    /// Print the tool command lines without running them.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let code = run(args)?;
    std::process::exit(code);
}

fn run(args: Args) -> Result<i32> {
    let project = Project::load(&args.project)
        .with_context(|| format!("Cannot load project {}", args.project.display()))?;
    info!(
        "Loaded {} layer(s) from {}",
        project.layers.len(),
        args.project.display()
    );

    let config = RunConfiguration {
        output_dir: args.output_dir,
        tool_dir: args.tool_dir,
        imagery_lod: args.imagery_lod,
        elevation_lod: args.elevation_lod,
        ruleset: args.ruleset,
        dry_run: args.dry_run,
    };

    let toolchain = Toolchain::new(&config.tool_dir);
    if !config.dry_run {
        for tool in [toolchain.inject_path(), toolchain.overviews_path()] {
            if !tool.is_file() {
                warn!("{} not found; launches will fail.", tool.display());
            }
        }
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl-C handler")?;

    let mut host = ConsoleHost::new(project, cancel);
    let report = if config.dry_run {
        run_batch(&mut host, &mut DryRunner, &config, &toolchain, &args.extent)
    } else {
        run_batch(&mut host, &mut SystemRunner, &config, &toolchain, &args.extent)
    };

    let code = exit_code(&report);
    host.finish(match code {
        0 => "Done",
        EXIT_CANCELLED => "Cancelled",
        _ => "Done with errors",
    });

    info!(
        "Imported {} of {} selected layer(s), skipped {}, {} failure(s).",
        report.ingested(),
        report.selection.layers.len(),
        report.selection.skipped.len(),
        report.failures()
    );
    Ok(code)
}

fn exit_code(report: &BatchReport) -> i32 {
    match report.outcome {
        BatchOutcome::Cancelled => EXIT_CANCELLED,
        BatchOutcome::Completed if report.failures() > 0 => EXIT_PARTIAL_FAILURE,
        BatchOutcome::Completed => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdb_ingest::Selection;

    #[test]
    fn parses_negative_extent_and_lods() {
        let args = Args::try_parse_from([
            "raster2cdb",
            "--project",
            "p.json",
            "--output-dir",
            "out",
            "--extent",
            "-118.5,-117,33,34 [EPSG:4326]",
            "--imagery-lod",
            "-2",
            "--ruleset",
            "SE Core",
        ])
        .unwrap();

        assert_eq!(args.extent, Extent::new(-118.5, 33.0, -117.0, 34.0).unwrap());
        assert_eq!(args.imagery_lod.get(), -2);
        assert_eq!(args.elevation_lod, Lod::default());
        assert_eq!(args.ruleset, AttributeRuleset::SeCore);
        assert!(!args.dry_run);
    }

    #[test]
    fn rejects_out_of_range_lod() {
        let result = Args::try_parse_from([
            "raster2cdb",
            "--project",
            "p.json",
            "--output-dir",
            "out",
            "--extent",
            "0,1,0,1",
            "--elevation-lod",
            "20",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn exit_codes_reflect_outcome() {
        let mut report = BatchReport {
            outcome: BatchOutcome::Completed,
            selection: Selection::default(),
            layers: Vec::new(),
            overviews: Some(Ok(())),
        };
        assert_eq!(exit_code(&report), 0);

        report.overviews = Some(Err(cdb_ingest::ToolFailure {
            command: "gdaladdo".into(),
            code: Some(1),
            error: None,
            output: Vec::new(),
        }));
        assert_eq!(exit_code(&report), EXIT_PARTIAL_FAILURE);

        report.outcome = BatchOutcome::Cancelled;
        assert_eq!(exit_code(&report), EXIT_CANCELLED);
    }
}
