//! Render a merged tree as a `CREATE EXTERNAL TABLE` statement over a JSON
//! SerDe.
//!
//! ```text
//! CREATE EXTERNAL TABLE {schema}.{table} (
//!     id SMALLINT,
//!     tags array<VARCHAR>,
//!     geo struct<lat: FLOAT4, lon: FLOAT4>
//! )
//! ROW FORMAT SERDE ...
//! ```
use indexmap::IndexMap;

use crate::data_types::{sql_type, SqlType};
use crate::error::{Error, Result};
use crate::inference::Export;
use crate::ir::MergedTree;
use crate::naming::quote_identifier;

pub const SERDE_FORMAT: &str = "org.openx.data.jsonserde.JsonSerDe";
pub const INPUTFORMAT: &str = "org.apache.hadoop.mapred.TextInputFormat";
pub const OUTPUTFORMAT: &str = "org.apache.hadoop.hive.ql.io.IgnoreKeyTextOutputFormat";

const INDENT: &str = "    ";

// ------------------------------- Options ---------------------------------- //

#[derive(Clone, Debug)]
pub struct DdlOptions {
    pub schema: Option<String>,
    pub table: Option<String>,
    /// partition column → type
    pub partitions: IndexMap<String, String>,
    pub s3_key: Option<String>,
    pub case_insensitive: bool,
    pub ignore_malformed_json: bool,
    /// skip arrays of arrays instead of failing
    pub ignore_nested_arrays: bool,
    pub infer_dates: bool,
    pub strict: bool,
    /// field name → column type, bypassing inference
    pub type_map: IndexMap<String, String>,
}

impl Default for DdlOptions {
    fn default() -> Self {
        Self {
            schema: None,
            table: None,
            partitions: IndexMap::new(),
            s3_key: None,
            case_insensitive: true,
            ignore_malformed_json: true,
            ignore_nested_arrays: true,
            infer_dates: false,
            strict: false,
            type_map: IndexMap::new(),
        }
    }
}

impl DdlOptions {
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_s3_key(mut self, key: impl Into<String>) -> Self {
        self.s3_key = Some(key.into());
        self
    }

    pub fn with_partitions(mut self, partitions: IndexMap<String, String>) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_type_map(mut self, type_map: IndexMap<String, String>) -> Self {
        self.type_map = type_map;
        self
    }

    pub fn with_infer_dates(mut self, enabled: bool) -> Self {
        self.infer_dates = enabled;
        self
    }

    pub fn with_strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }
}

// ------------------------------- Columns ---------------------------------- //

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnType {
    Scalar(String),
    Struct(Vec<(String, ColumnType)>),
    Array(Box<ColumnType>),
}

impl ColumnType {
    /// Inline form used for nested types.
    pub fn render(&self) -> String {
        match self {
            ColumnType::Scalar(t) => t.clone(),
            ColumnType::Array(item) => format!("array<{}>", item.render()),
            ColumnType::Struct(fields) => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|(name, ty)| format!("{}: {}", quote_identifier(name), ty.render()))
                    .collect();
                format!("struct<{}>", inner.join(", "))
            }
        }
    }
}

/// Column types for a merged tree. Fields with nothing to type (nulls, empty
/// objects) are left out.
pub fn define_types(tree: &MergedTree, options: &DdlOptions) -> Result<Vec<(String, ColumnType)>> {
    let MergedTree::Object(fields) = tree else {
        return Err(Error::RootNotObject);
    };
    let mut out = Vec::with_capacity(fields.len());
    for (name, node) in fields {
        if let Some(ty) = column_type(name, node, options)? {
            out.push((name.clone(), ty));
        }
    }
    Ok(out)
}

fn column_type(field: &str, node: &MergedTree, options: &DdlOptions) -> Result<Option<ColumnType>> {
    if matches!(node, MergedTree::Scalar(_) | MergedTree::Dtype(_)) {
        if let Some(known) = options.type_map.get(field) {
            return Ok(Some(ColumnType::Scalar(known.clone())));
        }
    }
    inferred_type(field, node, options)
}

fn inferred_type(field: &str, node: &MergedTree, options: &DdlOptions) -> Result<Option<ColumnType>> {
    Ok(match node {
        MergedTree::Scalar(v) => sql_type(v, options.strict, options.infer_dates)?
            .map(|t| ColumnType::Scalar(t.to_string())),
        MergedTree::Dtype(d) => SqlType::for_dtype(*d).map(|t| ColumnType::Scalar(t.to_string())),
        MergedTree::Object(children) => {
            let mut fields = Vec::with_capacity(children.len());
            for (name, child) in children {
                if let Some(ty) = column_type(name, child, options)? {
                    fields.push((name.clone(), ty));
                }
            }
            if fields.is_empty() {
                tracing::warn!("Skipping struct without typed fields: {field}");
                None
            } else {
                Some(ColumnType::Struct(fields))
            }
        }
        MergedTree::Array(None) => {
            tracing::warn!("No element type seen for array {field}, defaulting to VARCHAR");
            Some(ColumnType::Array(Box::new(ColumnType::Scalar(SqlType::Varchar.to_string()))))
        }
        MergedTree::Array(Some(item)) => {
            if matches!(**item, MergedTree::Array(_)) {
                if !options.ignore_nested_arrays {
                    return Err(Error::NestedArray { field: field.to_string() });
                }
                tracing::warn!("Skipping nested array: {field}");
                return Ok(None);
            }
            // element types are never looked up by the array's own name
            inferred_type(field, item, options)?.map(|t| ColumnType::Array(Box::new(t)))
        }
    })
}

/// One `name TYPE` line per top-level column.
pub fn format_definitions(columns: &[(String, ColumnType)]) -> String {
    columns
        .iter()
        .map(|(name, ty)| format!("{INDENT}{} {}", quote_identifier(name), ty.render()))
        .collect::<Vec<_>>()
        .join(",\n")
}

// ------------------------------ Statement --------------------------------- //

pub fn create_table(definitions: &str, schema: Option<&str>, table: Option<&str>) -> String {
    let schema = schema.unwrap_or("{schema}");
    let table = table.unwrap_or("{table}");
    format!("CREATE EXTERNAL TABLE {schema}.{table} (\n{}\n)", definitions.trim_matches('\n'))
}

fn bool_str(b: bool) -> &'static str { if b { "TRUE" } else { "FALSE" } }

fn indent_quoted(s: &str) -> String { format!("{INDENT}'{s}'") }

/// Everything after the column list: partitions, SerDe properties, formats
/// and location.
pub fn set_options(key_map: &IndexMap<String, String>, options: &DdlOptions) -> String {
    let mut lines: Vec<String> = Vec::new();

    if !options.partitions.is_empty() {
        let keys: Vec<String> = options
            .partitions
            .iter()
            .map(|(k, t)| format!("{} {}", quote_identifier(k), t.to_uppercase()))
            .collect();
        lines.push(format!("PARTITIONED BY ({})", keys.join(", ")));
    }

    let mut props: Vec<String> = key_map
        .iter()
        .map(|(column, source)| format!("{INDENT}'mapping.{column}'='{source}'"))
        .collect();
    props.push(format!("{INDENT}'case.insensitive'='{}'", bool_str(options.case_insensitive)));
    props.push(format!("{INDENT}'ignore.malformed.json'='{}'", bool_str(options.ignore_malformed_json)));

    lines.push("ROW FORMAT SERDE".to_string());
    lines.push(indent_quoted(SERDE_FORMAT));
    lines.push("WITH SERDEPROPERTIES (".to_string());
    lines.push(props.join(",\n"));
    lines.push(")".to_string());
    lines.push("STORED AS INPUTFORMAT".to_string());
    lines.push(indent_quoted(INPUTFORMAT));
    lines.push("OUTPUTFORMAT".to_string());
    lines.push(indent_quoted(OUTPUTFORMAT));
    lines.push(format!("LOCATION '{}';", options.s3_key.as_deref().unwrap_or("s3://{bucket}/{prefix}")));
    lines.join("\n")
}

pub fn create_statement(definitions: &str, key_map: &IndexMap<String, String>, options: &DdlOptions) -> String {
    let table = create_table(definitions, options.schema.as_deref(), options.table.as_deref());
    format!("{table}\n{}", set_options(key_map, options))
}

/// Full statement for an export: column types from the tree, `mapping.*`
/// SerDe properties from its renames.
pub fn from_export(export: &Export, options: &DdlOptions) -> Result<String> {
    let columns = define_types(&export.tree, options)?;
    let definitions = format_definitions(&columns);
    Ok(create_statement(&definitions, &export.renames, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::SchemaAccumulator;
    use serde_json::json;

    fn export_of(records: &[serde_json::Value]) -> Export {
        let mut acc = SchemaAccumulator::new();
        acc.load_all(records).unwrap();
        acc.export(false)
    }

    #[test]
    fn nested_columns_render_inline() {
        let export = export_of(&[json!({
            "id": 1,
            "geo": {"lat": 37.4, "lon": -122.1},
            "tags": ["a", "bb"],
            "events": [{"at": "2019-01-01", "n": 70000}],
        })]);
        let columns = define_types(&export.tree, &DdlOptions::default()).unwrap();
        assert_eq!(
            format_definitions(&columns),
            [
                "    events array<struct<at: VARCHAR, n: INT>>",
                "    geo struct<lat: FLOAT4, lon: FLOAT4>",
                "    id SMALLINT",
                "    tags array<VARCHAR>",
            ]
            .join(",\n")
        );
    }

    #[test]
    fn type_map_and_date_inference() {
        let export = export_of(&[json!({"at": "2019-01-01T00:00:00", "code": 5})]);
        let options = DdlOptions {
            infer_dates: true,
            type_map: IndexMap::from([("code".to_string(), "CHAR(2)".to_string())]),
            ..DdlOptions::default()
        };
        let columns = define_types(&export.tree, &options).unwrap();
        assert_eq!(columns, vec![
            ("at".to_string(), ColumnType::Scalar("TIMESTAMP".to_string())),
            ("code".to_string(), ColumnType::Scalar("CHAR(2)".to_string())),
        ]);
    }

    #[test]
    fn type_map_leaves_containers_alone() {
        let export = export_of(&[json!({"geo": {"geo": 1.5}, "tags": ["a"]})]);
        let options = DdlOptions::default().with_type_map(IndexMap::from([
            ("geo".to_string(), "DOUBLE".to_string()),
            ("tags".to_string(), "STRING".to_string()),
        ]));
        let columns = define_types(&export.tree, &options).unwrap();
        assert_eq!(
            format_definitions(&columns),
            "    geo struct<geo: DOUBLE>,\n    tags array<VARCHAR>"
        );
    }

    #[test]
    fn nested_arrays_skip_or_fail() {
        let export = export_of(&[json!({"m": [[1, 2]], "ok": true})]);
        let columns = define_types(&export.tree, &DdlOptions::default()).unwrap();
        assert_eq!(columns, vec![("ok".to_string(), ColumnType::Scalar("BOOL".to_string()))]);

        let strict = DdlOptions { ignore_nested_arrays: false, ..DdlOptions::default() };
        assert!(matches!(define_types(&export.tree, &strict), Err(Error::NestedArray { ref field }) if field == "m"));
    }

    #[test]
    fn untyped_fields_are_dropped_and_reserved_names_quoted() {
        let export = export_of(&[json!({"empty": {}, "date": "x", "list": [], "gone": null})]);
        let definitions = format_definitions(&define_types(&export.tree, &DdlOptions::default()).unwrap());
        assert_eq!(definitions, "    \"date\" VARCHAR,\n    list array<VARCHAR>");
    }

    #[test]
    fn root_must_be_an_object() {
        let export = export_of(&[json!([1, 2])]);
        assert!(matches!(define_types(&export.tree, &DdlOptions::default()), Err(Error::RootNotObject)));
    }

    #[test]
    fn full_statement_with_placeholders() {
        let mut acc = SchemaAccumulator::new();
        acc.load(&json!({"user_id": 1})).unwrap();
        acc.note_rename("user_id", "user-id");
        let stmt = from_export(&acc.export(false), &DdlOptions::default()).unwrap();
        let expected = "\
CREATE EXTERNAL TABLE {schema}.{table} (
    user_id SMALLINT
)
ROW FORMAT SERDE
    'org.openx.data.jsonserde.JsonSerDe'
WITH SERDEPROPERTIES (
    'mapping.user_id'='user-id',
    'case.insensitive'='TRUE',
    'ignore.malformed.json'='TRUE'
)
STORED AS INPUTFORMAT
    'org.apache.hadoop.mapred.TextInputFormat'
OUTPUTFORMAT
    'org.apache.hadoop.hive.ql.io.IgnoreKeyTextOutputFormat'
LOCATION 's3://{bucket}/{prefix}';";
        assert_eq!(stmt, expected);
    }

    #[test]
    fn partitions_schema_table_and_location() {
        let options = DdlOptions {
            schema: Some("lake".into()),
            table: Some("events".into()),
            partitions: IndexMap::from([("dt".to_string(), "date".to_string())]),
            s3_key: Some("s3://bucket/events/".into()),
            case_insensitive: false,
            ..DdlOptions::default()
        };
        let stmt = create_statement("    a INT", &IndexMap::new(), &options);
        assert!(stmt.starts_with("CREATE EXTERNAL TABLE lake.events (\n    a INT\n)\nPARTITIONED BY (dt DATE)\n"));
        assert!(stmt.contains("'case.insensitive'='FALSE'"));
        assert!(stmt.ends_with("LOCATION 's3://bucket/events/';"));
    }
}
