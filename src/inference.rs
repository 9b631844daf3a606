//! Path-wise schema accumulation.
//!
//! Stream records in, keep per-path sufficient statistics (dtype histogram plus
//! the widest value per dtype), and export one merged tree on demand.
//!
//! Design goals:
//! - No history besides sufficient statistics; memory is bounded by the number
//!   of distinct paths, not the number of records.
//! - `merge` is associative and commutative, so shards can be ingested
//!   independently and folded in any order.
//! - Export is a read-only derivation: conflicts are resolved into an override
//!   set every time instead of being written back.
pub mod classify;
pub mod field;
pub mod resolve;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde_json::Value;

pub use classify::{DtypeClassifier, OutOfRange, ScalarClassifier};
pub use field::FieldStats;
pub use resolve::Overrides;

use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::ir::MergedTree;
use crate::lower::TreeBuilder;
use crate::path::{self, Path};
use crate::value::Leaf;

// ------------------------------- State ------------------------------------ //

#[derive(Clone)]
pub struct SchemaAccumulator {
    fields: BTreeMap<Path, FieldStats>,
    seen: BTreeMap<Path, u64>,
    renames: IndexMap<String, String>,
    str_numeric_override: bool,
    classifier: Arc<dyn DtypeClassifier>,
}

/// Result of [`SchemaAccumulator::export`].
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub tree: MergedTree,
    /// resolved field name → original source name, as recorded by the caller
    pub renames: IndexMap<String, String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Debug for SchemaAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaAccumulator")
            .field("paths", &self.fields.len())
            .field("str_numeric_override", &self.str_numeric_override)
            .finish_non_exhaustive()
    }
}

impl Default for SchemaAccumulator {
    fn default() -> Self { Self::new() }
}

// ------------------------------ Front API --------------------------------- //

impl SchemaAccumulator {
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
            seen: BTreeMap::new(),
            renames: IndexMap::new(),
            str_numeric_override: false,
            classifier: Arc::new(ScalarClassifier::default()),
        }
    }

    /// Strings seen next to numbers force the field to String.
    #[must_use]
    pub fn with_str_numeric_override(mut self, enabled: bool) -> Self {
        self.str_numeric_override = enabled;
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: impl DtypeClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Same configuration, no observations.
    pub fn empty_like(&self) -> Self {
        Self {
            fields: BTreeMap::new(),
            seen: BTreeMap::new(),
            renames: IndexMap::new(),
            str_numeric_override: self.str_numeric_override,
            classifier: Arc::clone(&self.classifier),
        }
    }

    /// Record one observation. A classifier overflow rejects the value and
    /// leaves the accumulator exactly as it was.
    pub fn add(&mut self, path: Path, leaf: Leaf) -> Result<()> {
        let overflow = |path: &Path, e: OutOfRange| Error::ClassifierOverflow { path: path.clone(), value: e.0 };
        match self.fields.get_mut(&path) {
            Some(stats) => stats.add(leaf, self.classifier.as_ref()).map_err(|e| overflow(&path, e))?,
            None => {
                let mut stats = FieldStats::new();
                stats.add(leaf, self.classifier.as_ref()).map_err(|e| overflow(&path, e))?;
                self.fields.insert(path.clone(), stats);
            }
        }
        *self.seen.entry(path).or_insert(0) += 1;
        Ok(())
    }

    /// Add every terminal of `record`. A rejected value skips only itself; the
    /// first rejection is returned once the whole record has been walked.
    pub fn load(&mut self, record: &Value) -> Result<()> {
        let mut first_err = None;
        for (path, leaf) in path::extract(record) {
            if let Err(e) = self.add(path, leaf) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn load_all<'a, I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut first_err = None;
        for record in records {
            if let Err(e) = self.load(record) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Sharded ingestion: each chunk of `shard_size` records goes into its own
    /// accumulator on the rayon pool, then the shards are folded with `merge`.
    pub fn load_parallel(&mut self, records: &[Value], shard_size: usize) -> Result<()> {
        let template = self.empty_like();
        let (merged, err) = records
            .par_chunks(shard_size.max(1))
            .map(|chunk| {
                let mut shard = template.empty_like();
                let err = shard.load_all(chunk).err();
                (shard, err)
            })
            .reduce(
                || (template.empty_like(), None),
                |(a, ea), (b, eb)| (a.merge(&b), ea.or(eb)),
            );
        self.merge_from(&merged);
        err.map_or(Ok(()), Err)
    }

    /// Record that `resolved` was produced from source key `original`.
    pub fn note_rename(&mut self, resolved: impl Into<String>, original: impl Into<String>) {
        self.renames.entry(resolved.into()).or_insert_with(|| original.into());
    }

    pub fn note_renames<I, K, V>(&mut self, renames: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in renames {
            self.note_rename(k, v);
        }
    }

    /// Union of two accumulators. Counts add up; per-dtype representatives are
    /// joined with an order-free tie-break, so `a.merge(b) == b.merge(a)`.
    /// Configuration (classifier) is taken from `self`.
    pub fn merge(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.merge_from(other);
        out
    }

    pub fn merge_from(&mut self, other: &Self) {
        for (path, theirs) in &other.fields {
            let joined = match self.fields.get(path) {
                Some(mine) => FieldStats::join(mine, theirs),
                None => theirs.clone(),
            };
            self.fields.insert(path.clone(), joined);
        }
        for (path, n) in &other.seen {
            *self.seen.entry(path.clone()).or_insert(0) += n;
        }
        for (k, v) in &other.renames {
            self.renames.entry(k.clone()).or_insert_with(|| v.clone());
        }
        self.str_numeric_override |= other.str_numeric_override;
    }

    // ------------------------------ Queries ------------------------------- //

    pub fn fields(&self) -> impl Iterator<Item = (&Path, &FieldStats)> { self.fields.iter() }

    pub fn field(&self, path: &Path) -> Option<&FieldStats> { self.fields.get(path) }

    /// Times `path` was observed, nulls included.
    pub fn times_seen(&self, path: &Path) -> u64 { self.seen.get(path).copied().unwrap_or(0) }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    /// `(non-null observations, null observations)` across every path.
    pub fn fields_seen(&self) -> (u64, u64) {
        self.fields.values().fold((0, 0), |(tot, na), f| (tot + f.observations(), na + f.null_count()))
    }

    pub fn renames(&self) -> &IndexMap<String, String> { &self.renames }

    /// Paths excluded from the next export, with the findings that led there.
    pub fn overrides(&self) -> Overrides { resolve::resolve(&self.fields) }

    // ------------------------------- Export ------------------------------- //

    /// Merged tree of the surviving paths. With `resolve_types`, scalar leaves
    /// carry their resolved dtype instead of the representative value.
    pub fn export(&self, resolve_types: bool) -> Export {
        let overrides = self.overrides();
        let mut diagnostics: Vec<Diagnostic> = self
            .fields
            .iter()
            .filter(|(_, f)| f.is_mixed())
            .map(|(path, f)| Diagnostic::MixedDtype { path: path.clone(), dtypes: f.dtypes() })
            .collect();
        diagnostics.extend(overrides.diagnostics.iter().cloned());

        let mut builder = TreeBuilder::new();
        for (path, stats) in &self.fields {
            if overrides.contains(path) {
                continue;
            }
            let Some(value) = stats.max_value(self.str_numeric_override) else {
                diagnostics.push(Diagnostic::NullField { path: path.clone() });
                continue;
            };
            let terminal = match (&value, stats.dtype(self.str_numeric_override)) {
                (Leaf::Scalar(_), Some(dtype)) if resolve_types => MergedTree::Dtype(dtype),
                _ => MergedTree::from(value),
            };
            builder.insert(path, terminal);
        }

        Export { tree: builder.build(), renames: self.renames.clone(), diagnostics }
    }
}
