//! Structured, non-fatal findings returned alongside an export.
//!
//! Nothing here is logged from inside the library; callers decide where the
//! list goes (the CLI forwards it to `tracing`).
use std::fmt;

use serde::Serialize;

use crate::path::Path;
use crate::value::DtypeTag;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Array,
    NonArray,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ambiguity {
    /// Ended at `path` in some records and went deeper in others.
    Terminal { path: Path },
    /// `path` held an array in some records and an object in others.
    ArrayParent {
        path: Path,
        winner: Branch,
        array_total: u64,
        non_array_total: u64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    MixedDtype { path: Path, dtypes: Vec<DtypeTag> },
    NullField { path: Path },
    AmbiguousStructure(Ambiguity),
}

impl Diagnostic {
    pub fn level(&self) -> Level {
        match self {
            Diagnostic::NullField { .. } => Level::Info,
            Diagnostic::MixedDtype { .. } | Diagnostic::AmbiguousStructure(_) => Level::Warning,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Diagnostic::MixedDtype { path, .. }
            | Diagnostic::NullField { path }
            | Diagnostic::AmbiguousStructure(Ambiguity::Terminal { path })
            | Diagnostic::AmbiguousStructure(Ambiguity::ArrayParent { path, .. }) => path,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MixedDtype { path, dtypes } => {
                let names: Vec<&str> = dtypes.iter().map(|d| d.as_str()).collect();
                write!(f, "[{path}] dtypes detected {}", names.join(", "))
            }
            Diagnostic::NullField { path } => write!(f, "Ignoring key with None value: {path}"),
            Diagnostic::AmbiguousStructure(Ambiguity::Terminal { path }) => {
                write!(f, "Terminal key detected: {path}")
            }
            Diagnostic::AmbiguousStructure(Ambiguity::ArrayParent { path, winner, array_total, non_array_total }) => {
                match winner {
                    Branch::Array => write!(
                        f,
                        "{path}: Array keys override non-arrays: {array_total} >= {non_array_total}"
                    ),
                    Branch::NonArray => write!(
                        f,
                        "{path}: Non-Array keys override arrays: {non_array_total} > {array_total}"
                    ),
                }
            }
        }
    }
}
