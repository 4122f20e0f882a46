//! Command lines for the external CDB toolchain.
//!
//! `cdb-inject` loads one raster into the datastore:
//!   cdb-inject -bounds <south> <west> <north> <east> -skip-overviews
//!              -lod <lod> (-elevation|-imagery) <source> <datastore>
//!
//! `gdaladdo` then builds the imagery pyramid through GDAL's CDB driver:
//!   gdaladdo --config LODMIN 0 --config LODMAX <imagery lod> CDB:<datastore>:Imagery_Yearly
//!
//! Both run with the tool directory first on `PATH` and GDAL pointed at the
//! plugins and data shipped next to them. The overrides only ever reach the
//! child process.

use crate::config::RunConfiguration;
use crate::extent::Extent;
use crate::layer::{Layer, LayerClass};
use log::warn;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

pub const INJECT_TOOL: &str = "cdb-inject";
pub const OVERVIEW_TOOL: &str = "gdaladdo";
pub const IMAGERY_LAYER: &str = "Imagery_Yearly";

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Applied on top of the inherited environment of the child only.
    pub env: Vec<(OsString, OsString)>,
}

impl Invocation {
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Shell-ish rendering for status and error messages.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn quoted(f: &mut fmt::Formatter<'_>, s: &OsStr) -> fmt::Result {
            let s = s.to_string_lossy();
            if s.is_empty() || s.contains(char::is_whitespace) {
                write!(f, "\"{s}\"")
            } else {
                f.write_str(&s)
            }
        }

        quoted(f, self.program.as_os_str())?;
        for arg in &self.args {
            f.write_str(" ")?;
            quoted(f, arg)?;
        }
        Ok(())
    }
}

/// Locations of the toolchain plus the child environment it needs.
#[derive(Debug, Clone)]
pub struct Toolchain {
    inject: PathBuf,
    overviews: PathBuf,
    env: Vec<(OsString, OsString)>,
}

impl Toolchain {
    /// Resolves the tools inside `tool_dir`, snapshotting the caller's `PATH`.
    pub fn new(tool_dir: &Path) -> Self {
        Self::with_base_path(tool_dir, env::var_os("PATH"))
    }

    pub fn with_base_path(tool_dir: &Path, base_path: Option<OsString>) -> Self {
        Self {
            inject: executable(tool_dir, INJECT_TOOL),
            overviews: executable(tool_dir, OVERVIEW_TOOL),
            env: child_env(tool_dir, base_path),
        }
    }

    pub fn inject_path(&self) -> &Path {
        &self.inject
    }

    pub fn overviews_path(&self) -> &Path {
        &self.overviews
    }

    pub fn env(&self) -> &[(OsString, OsString)] {
        &self.env
    }

    /// `cdb-inject` command for one classified layer.
    pub fn ingest(
        &self,
        config: &RunConfiguration,
        extent: &Extent,
        layer: &Layer,
        class: LayerClass,
    ) -> Invocation {
        let lod = match class {
            LayerClass::Elevation => config.elevation_lod,
            LayerClass::Imagery => config.imagery_lod,
        };

        let mut args: Vec<OsString> = vec!["-bounds".into()];
        args.extend(extent.bounds_args().into_iter().map(OsString::from));
        args.extend(
            ["-skip-overviews", "-lod", &lod.to_string(), class.flag()]
                .into_iter()
                .map(OsString::from),
        );
        args.push(layer.source.clone().into_os_string());
        args.push(config.output_dir.clone().into_os_string());

        Invocation {
            program: self.inject.clone(),
            args,
            env: self.env.clone(),
        }
    }

    /// `gdaladdo` command building imagery LODs 0..=imagery_lod.
    pub fn overviews(&self, config: &RunConfiguration) -> Invocation {
        let args = vec![
            "--config".into(),
            "LODMIN".into(),
            "0".into(),
            "--config".into(),
            "LODMAX".into(),
            config.imagery_lod.to_string().into(),
            imagery_uri(&config.output_dir),
        ];

        Invocation {
            program: self.overviews.clone(),
            args,
            env: self.env.clone(),
        }
    }
}

/// `CDB:<datastore>:Imagery_Yearly`
pub fn imagery_uri(datastore: &Path) -> OsString {
    let mut uri = OsString::from("CDB:");
    uri.push(datastore.as_os_str());
    uri.push(":");
    uri.push(IMAGERY_LAYER);
    uri
}

fn executable(tool_dir: &Path, name: &str) -> PathBuf {
    tool_dir.join(format!("{name}{}", env::consts::EXE_SUFFIX))
}

fn child_env(tool_dir: &Path, base_path: Option<OsString>) -> Vec<(OsString, OsString)> {
    let mut vars = Vec::with_capacity(3);

    let entries = std::iter::once(tool_dir.to_path_buf())
        .chain(base_path.iter().flat_map(env::split_paths));
    match env::join_paths(entries) {
        Ok(path) => vars.push((OsString::from("PATH"), path)),
        Err(e) => warn!(
            "Cannot prepend {} to PATH ({e}); leaving PATH unchanged.",
            tool_dir.display()
        ),
    }

    vars.push((
        OsString::from("GDAL_DRIVER_PATH"),
        tool_dir.join("gdalplugins").into_os_string(),
    ));
    vars.push((
        OsString::from("GDAL_DATA"),
        tool_dir.join("gdal-data").into_os_string(),
    ));
    vars
}
