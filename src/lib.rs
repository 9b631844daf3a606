//! Merged schema inference for semi-structured records.
//!
//! Records are flattened into `(path, leaf)` pairs, accumulated per path,
//! cleaned of structural conflicts and rebuilt into one merged tree that can
//! be rendered as external-table DDL.
pub mod value;
pub mod path;
pub mod error;
pub mod diagnostics;
pub mod inference;
pub mod ir;
pub mod lower;
pub mod data_types;
pub mod naming;
pub mod ddl;
pub mod path_de;
pub mod cli;

pub use diagnostics::Diagnostic;
pub use error::{Error, Result};
pub use inference::{Export, FieldStats, SchemaAccumulator};
pub use ir::MergedTree;
pub use path::{Path, PathSegment};
pub use value::{DtypeTag, Leaf, ScalarValue};
