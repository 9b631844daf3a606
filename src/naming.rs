//! Field-name handling on both sides of the core.
//!
//! - Before ingestion, `KeyNormalizer` rewrites record keys (ignore list,
//!   lowercase, user mapping, hyphen conversion) and remembers every rename so
//!   the SerDe can map columns back to source keys.
//! - At render time, `quote_identifier` wraps reserved words and names the
//!   dialect cannot take bare.
use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static BARE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "all", "alter", "and", "array", "as", "authorization", "between", "bigint", "binary",
        "boolean", "both", "by", "case", "cast", "char", "column", "conf", "create", "cross",
        "cube", "current", "current_date", "current_timestamp", "cursor", "database", "date",
        "decimal", "delete", "describe", "distinct", "double", "drop", "else", "end",
        "exchange", "exists", "extended", "external", "false", "fetch", "float", "following",
        "for", "from", "full", "function", "grant", "group", "grouping", "having", "if",
        "import", "in", "inner", "insert", "int", "integer", "intersect", "interval", "into",
        "is", "join", "lateral", "left", "less", "like", "local", "macro", "map", "more",
        "none", "not", "null", "of", "on", "or", "order", "out", "outer", "over",
        "partialscan", "partition", "percent", "preceding", "preserve", "procedure", "range",
        "reads", "reduce", "revoke", "right", "rollup", "row", "rows", "select", "set",
        "smallint", "table", "tablesample", "then", "time", "timestamp", "to", "transform",
        "trigger", "true", "truncate", "unbounded", "union", "uniquejoin", "update", "user",
        "using", "utc_timestamp", "values", "varchar", "when", "where", "window", "with",
    ]
    .into_iter()
    .collect()
});

pub fn is_reserved(name: &str) -> bool { RESERVED.contains(name.to_ascii_lowercase().as_str()) }

/// Double-quote `name` when it is reserved or not a bare identifier.
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    if is_reserved(name) {
        tracing::info!("Enclosing reserved keyword in quotes: {name}");
    } else if BARE_IDENTIFIER.is_match(name) {
        return Cow::Borrowed(name);
    }
    Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
}

// ----------------------------- Normalizer --------------------------------- //

#[derive(Clone, Debug)]
pub struct NormalizeOptions {
    /// source key → column name; looked up after lowercasing
    pub mapping: IndexMap<String, String>,
    /// dropped together with everything below them
    pub ignore_fields: BTreeSet<String>,
    pub convert_hyphens: bool,
    /// lowercase every key, no rename recorded (the SerDe matches case-insensitively)
    pub case_insensitive: bool,
    /// lowercase keys that contain uppercase characters and record the rename
    pub case_map: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            mapping: IndexMap::new(),
            ignore_fields: BTreeSet::new(),
            convert_hyphens: true,
            case_insensitive: false,
            case_map: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct KeyNormalizer {
    options: NormalizeOptions,
    renames: IndexMap<String, String>,
}

impl KeyNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options, renames: IndexMap::new() }
    }

    pub fn options(&self) -> &NormalizeOptions { &self.options }

    /// Column name for one source key, or `None` if the key is ignored.
    pub fn normalize_key(&mut self, key: &str) -> Option<String> {
        if self.options.ignore_fields.contains(key) {
            return None;
        }
        let mut name = if self.options.case_insensitive { key.to_lowercase() } else { key.to_string() };

        let renamed = if let Some(mapped) = self.options.mapping.get(&name) {
            Some(mapped.clone())
        } else if self.options.convert_hyphens && name.contains('-') {
            Some(name.replace('-', "_"))
        } else {
            None
        };
        let renamed = match renamed {
            Some(r) if self.options.case_map => Some(r.to_lowercase()),
            Some(r) => Some(r),
            None if self.options.case_map && name.chars().any(char::is_uppercase) => Some(name.to_lowercase()),
            None => None,
        };

        if let Some(new) = renamed.filter(|new| *new != name) {
            tracing::debug!(from = %name, to = %new, "renamed field");
            self.renames.entry(new.clone()).or_insert_with(|| key.to_string());
            name = new;
        }
        Some(name)
    }

    /// Rewrite every object key in `value`, recursively.
    pub fn normalize(&mut self, value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    if let Some(name) = self.normalize_key(&k) {
                        let v = self.normalize(v);
                        out.insert(name, v);
                    }
                }
                Value::Object(out)
            }
            Value::Array(xs) => Value::Array(xs.into_iter().map(|x| self.normalize(x)).collect()),
            scalar => scalar,
        }
    }

    pub fn renames(&self) -> &IndexMap<String, String> { &self.renames }

    pub fn take_renames(&mut self) -> IndexMap<String, String> { std::mem::take(&mut self.renames) }
}
