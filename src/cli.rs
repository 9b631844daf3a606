//! Minimal CLI: infer → (ddl | tree)
use std::collections::BTreeSet;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;
use serde_json::Value;

use crate::ddl::{self, DdlOptions};
use crate::diagnostics::{Diagnostic, Level};
use crate::inference::{Export, ScalarClassifier, SchemaAccumulator};
use crate::naming::{KeyNormalizer, NormalizeOptions};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// infer one merged schema from JSON/NDJSON records and output either an
/// external-table DDL statement or the merged tree
#[derive(Parser, Debug)]
#[command(name = "spectron", version)]
pub struct CommandLineInterface {
    /// more log output (-v info, -vv debug); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// infer and print a CREATE EXTERNAL TABLE statement
    Ddl(DdlOut),
    /// infer and print the merged tree as JSON
    Tree(TreeOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// records per shard for parallel ingestion (0 = single-threaded)
    #[arg(long, default_value_t = 0)]
    shard_size: usize,
}

#[derive(Args, Debug, Clone)]
struct InferenceSettings {
    /// a field seen as both number and string is typed as string
    #[arg(long, default_value_t = false)]
    str_numeric_override: bool,

    /// reject floats a FLOAT8 column cannot hold instead of capping them
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug, Clone)]
struct NormalizeSettings {
    /// JSON object of source key → column name
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// keys dropped before inference, together with everything below them
    #[arg(long, num_args = 1..)]
    ignore_fields: Vec<String>,

    /// lowercase every key before inference
    #[arg(long, default_value_t = false)]
    lowercase: bool,

    /// lowercase keys with uppercase characters and map them back in the SerDe
    #[arg(long, default_value_t = false)]
    case_map: bool,

    /// keep '-' in keys instead of converting to '_'
    #[arg(long, default_value_t = false)]
    retain_hyphens: bool,
}

#[derive(clap::Parser, Debug)]
struct DdlOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    inference: InferenceSettings,

    #[command(flatten)]
    normalize: NormalizeSettings,

    #[arg(long)]
    schema: Option<String>,

    #[arg(long)]
    table: Option<String>,

    /// table location, e.g. s3://bucket/prefix/
    #[arg(long)]
    s3_key: Option<String>,

    /// JSON object of partition column → type
    #[arg(long)]
    partitions: Option<PathBuf>,

    /// JSON object of field → column type, bypassing inference
    #[arg(long)]
    type_map: Option<PathBuf>,

    /// type ISO 8601 strings as DATE / TIMESTAMP
    #[arg(long, default_value_t = false)]
    infer_dates: bool,

    /// fail on arrays of arrays instead of skipping them
    #[arg(long, default_value_t = false)]
    reject_nested_arrays: bool,

    /// output .sql file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct TreeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    inference: InferenceSettings,

    #[command(flatten)]
    normalize: NormalizeSettings,

    /// print resolved dtypes instead of representative values
    #[arg(long, default_value_t = false)]
    types: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Every record across all inputs, in input order.
    fn load_records(&self) -> anyhow::Result<Vec<Value>> {
        let mut records = Vec::new();
        for source in resolve_file_path_patterns(&self.input)? {
            let source_name = source.to_string_lossy().to_string();
            let text = if source_name == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
                buf
            } else {
                std::fs::read_to_string(&source)
                    .with_context(|| format!("Failed to read source file: {source_name}"))?
            };
            let before = records.len();
            if self.ndjson {
                for (lineno, line) in text.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let value = serde_json::from_str::<Value>(line).with_context(|| {
                        format!("Failed to parse JSON ({source_name}, line {})", lineno + 1)
                    })?;
                    self.select(value, &source_name, &mut records)?;
                }
            } else {
                let value = serde_json::from_str::<Value>(&text)
                    .with_context(|| format!("Failed to parse JSON source file ({source_name})"))?;
                self.select(value, &source_name, &mut records)?;
            }
            tracing::info!("{source_name}: {} records", records.len() - before);
        }
        Ok(records)
    }

    /// Apply `--json-pointer`; a top-level array is a list of records.
    fn select(&self, value: Value, source_name: &str, out: &mut Vec<Value>) -> anyhow::Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(ptr) => match value.pointer(ptr) {
                Some(v) => v.clone(),
                None => bail!("JSON pointer {ptr} matched nothing in {source_name}"),
            },
        };
        match value {
            Value::Array(xs) if !self.ndjson => out.extend(xs),
            other => out.push(other),
        }
        Ok(())
    }
}

impl InferenceSettings {
    fn accumulator(&self) -> SchemaAccumulator {
        SchemaAccumulator::new()
            .with_str_numeric_override(self.str_numeric_override)
            .with_classifier(ScalarClassifier { strict: self.strict })
    }
}

impl NormalizeSettings {
    fn normalizer(&self) -> anyhow::Result<KeyNormalizer> {
        let mapping = match &self.mapping {
            Some(path) => load_side_file(path)?,
            None => IndexMap::new(),
        };
        Ok(KeyNormalizer::new(NormalizeOptions {
            mapping,
            ignore_fields: self.ignore_fields.iter().cloned().collect::<BTreeSet<_>>(),
            convert_hyphens: !self.retain_hyphens,
            case_insensitive: self.lowercase,
            case_map: self.case_map,
        }))
    }
}

fn load_side_file(path: &std::path::Path) -> anyhow::Result<IndexMap<String, String>> {
    crate::path_de::from_file_with_path(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Read, normalize, ingest and export. Ingestion errors are reported and the
/// offending values skipped.
fn infer(
    input: &InputSettings,
    inference: &InferenceSettings,
    normalize: &NormalizeSettings,
    resolve_types: bool,
) -> anyhow::Result<Export> {
    let mut normalizer = normalize.normalizer()?;
    let records: Vec<Value> = input
        .load_records()?
        .into_iter()
        .map(|record| normalizer.normalize(record))
        .collect();

    let mut acc = inference.accumulator();
    let loaded = if input.shard_size > 0 {
        acc.load_parallel(&records, input.shard_size)
    } else {
        acc.load_all(&records)
    };
    if let Err(error) = loaded {
        if inference.strict {
            return Err(error).context("Strict ingestion rejected a value");
        }
        tracing::warn!("{error}");
    }
    acc.note_renames(normalizer.take_renames());

    let export = acc.export(resolve_types);
    report(&acc, records.len(), &export.diagnostics);
    Ok(export)
}

fn report(acc: &SchemaAccumulator, records: usize, diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        match d.level() {
            Level::Info => tracing::info!("{d}"),
            Level::Warning => tracing::warn!("{d}"),
        }
    }
    let (total, nulls) = acc.fields_seen();
    let warnings = diagnostics.iter().filter(|d| d.level() == Level::Warning).count();
    let summary = format!(
        "{records} records, {} paths, {total} values ({nulls} null), {warnings} warnings",
        acc.len()
    );
    if warnings > 0 {
        eprintln!("{}", summary.yellow());
    } else {
        eprintln!("{}", summary.green());
    }
}

fn write_output(out: Option<&PathBuf>, contents: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(out, contents).with_context(|| format!("Failed to write {}", out.display()))
        }
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

impl DdlOut {
    fn options(&self) -> anyhow::Result<DdlOptions> {
        let mut options = DdlOptions::default()
            .with_infer_dates(self.infer_dates)
            .with_strict(self.inference.strict);
        options.ignore_nested_arrays = !self.reject_nested_arrays;
        if let Some(schema) = &self.schema {
            options = options.with_schema(schema);
        }
        if let Some(table) = &self.table {
            options = options.with_table(table);
        }
        if let Some(key) = &self.s3_key {
            options = options.with_s3_key(key);
        }
        if let Some(path) = &self.partitions {
            options = options.with_partitions(load_side_file(path)?);
        }
        if let Some(path) = &self.type_map {
            options = options.with_type_map(load_side_file(path)?);
        }
        Ok(options)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Ddl(target) => {
                let options = target.options()?;
                let export = infer(&target.input_settings, &target.inference, &target.normalize, false)?;
                let statement = ddl::from_export(&export, &options).context("Failed to render DDL")?;
                write_output(target.out.as_ref(), &statement)
            }
            Command::Tree(target) => {
                let export = infer(&target.input_settings, &target.inference, &target.normalize, target.types)?;
                let src = serde_json::to_string_pretty(&export.tree.to_json())?;
                write_output(target.out.as_ref(), &src)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ddl_flags() {
        let cli = CommandLineInterface::try_parse_from([
            "spectron", "-v", "ddl", "-i", "a.json", "b.json", "--ndjson", "--table", "t",
            "--str-numeric-override", "--ignore-fields", "x", "y", "--shard-size", "100",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Command::Ddl(target) = cli.cmd else { panic!("expected ddl") };
        assert_eq!(target.input_settings.input, ["a.json", "b.json"]);
        assert!(target.input_settings.ndjson);
        assert_eq!(target.input_settings.shard_size, 100);
        assert!(target.inference.str_numeric_override);
        assert_eq!(target.normalize.ignore_fields, ["x", "y"]);
        assert_eq!(target.options().unwrap().table.as_deref(), Some("t"));
    }

    #[test]
    fn tree_requires_input() {
        assert!(CommandLineInterface::try_parse_from(["spectron", "tree", "--types"]).is_err());
    }

    #[test]
    fn literal_paths_and_stdin_pass_through() {
        let paths = resolve_file_path_patterns(["-", "does/not/exist.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("-"), PathBuf::from("does/not/exist.json")]);
        assert!(resolve_file_path_patterns(["/definitely/missing/*.json"]).is_err());
    }

    #[test]
    fn pointer_selects_and_arrays_spread() {
        let settings = InputSettings {
            ndjson: false,
            json_pointer: Some("/data".into()),
            input: vec![],
            shard_size: 0,
        };
        let mut out = Vec::new();
        settings
            .select(serde_json::json!({"data": [{"a": 1}, {"a": 2}]}), "mem", &mut out)
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(settings.select(serde_json::json!({}), "mem", &mut out).is_err());
    }
}
