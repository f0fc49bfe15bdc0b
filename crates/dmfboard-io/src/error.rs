use std::io;
use std::path::PathBuf;

use dmfboard_core::{ConstructionError, CrenellationError, GeometryError, Refdes};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown peripheral template '{0}'")]
    UnknownTemplate(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Crenellation(#[from] CrenellationError),

    #[error("Cannot build fabrication outline for {refdes}: {source}")]
    Fabrication {
        refdes: Refdes,
        #[source]
        source: GeometryError,
    },
}

pub type Result<T> = std::result::Result<T, IoError>;

/// Read a whole file, keeping the path in the error.
pub(crate) fn read_file(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })
}
