//! Library error type. The binary wraps these in `anyhow` at the edge.
use thiserror::Error;

use crate::path::Path;
use crate::value::ScalarValue;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    // ------------------------------ Ingestion ------------------------------ //
    #[error("[{path}] value {value} is out of range for a strict classifier")]
    ClassifierOverflow { path: Path, value: ScalarValue },

    // ------------------------------- Typing -------------------------------- //
    #[error("value {value} exceeds the largest column type")]
    SqlTypeOverflow { value: ScalarValue },

    #[error("[{field}] arrays cannot directly contain arrays")]
    NestedArray { field: String },

    #[error("top-level records must be objects to form table columns")]
    RootNotObject,

    // ---------------------------- Configuration ---------------------------- //
    #[error("{source_name}: at JSON path {path}: {message}")]
    Config { source_name: String, path: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
