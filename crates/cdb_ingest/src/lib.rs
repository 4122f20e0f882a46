//! cdb_ingest: loads GIS raster layers into a CDB datastore through the
//! external `cdb-inject` and `gdaladdo` tools.
//!
//! - Filters a project's layers by checked state, extent and file presence.
//! - Classifies rasters by band count: 1 = elevation, 3/4 = imagery.
//! - Runs `cdb-inject` per layer, one process at a time, scraping `NN%`
//!   lines into an overall progress figure.
//! - Runs `gdaladdo` once afterwards to build imagery LODs 0..=imagery LOD.
//!
//! The hosting application is reached only through [`Host`], and processes
//! only through [`ToolRunner`].

pub mod batch;
pub mod config;
pub mod error;
pub mod extent;
pub mod filter;
pub mod host;
pub mod layer;
pub mod process;
pub mod progress;
pub mod project;
pub mod tool;

pub use batch::{run_batch, BatchOutcome, BatchReport, LayerReport, LayerStatus, ToolFailure};
pub use config::{AttributeRuleset, Lod, RunConfiguration};
pub use error::{IngestError, Result};
pub use extent::Extent;
pub use filter::{filter_layers, select_layers, Selection, SkipReason, Skipped};
pub use host::Host;
pub use layer::{checked_layer_names, Layer, LayerClass, LayerKind, TreeNode};
pub use process::{DryRunner, OutputLines, SystemRunner, ToolExit, ToolRunner};
pub use progress::{parse_percent, ProgressState};
pub use project::Project;
pub use tool::{Invocation, Toolchain};
