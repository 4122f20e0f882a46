use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("invalid extent '{input}': {reason}")]
    InvalidExtent { input: String, reason: String },

    #[error("invalid LOD '{input}': {reason}")]
    InvalidLod { input: String, reason: String },

    #[error("LOD {value} is outside the supported range {min}..={max}")]
    LodOutOfRange { value: i32, min: i32, max: i32 },

    #[error("unknown attribute ruleset '{0}' (expected GGDM, OpenStreetMaps or SE Core)")]
    UnknownRuleset(String),

    #[error("failed to read project file {path}")]
    ProjectIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse project file {path}")]
    ProjectParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to launch {command}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while reading output of {command}")]
    ToolIo {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
