//! Column types for the external-table dialect.
//!
//! Integers pick the narrowest of SMALLINT / INT / BIGINT, floats split on
//! magnitude into FLOAT4 / FLOAT8, strings are VARCHAR unless date inference is
//! on and they parse as ISO 8601.
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::inference::classify::FLOAT_MAGNITUDE_LIMIT;
use crate::value::{DtypeTag, ScalarValue};

const SMALLINT_MAX: i64 = i16::MAX as i64;
const INT_MAX: i64 = i32::MAX as i64;
/// 2^24: largest magnitude a FLOAT4 holds without losing integer precision.
const FLOAT4_LIMIT: f64 = 16_777_216.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SqlType {
    SmallInt,
    Int,
    BigInt,
    Float4,
    Float8,
    Varchar,
    Bool,
    Date,
    Timestamp,
}

impl SqlType {
    pub fn as_str(self) -> &'static str {
        match self {
            SqlType::SmallInt => "SMALLINT",
            SqlType::Int => "INT",
            SqlType::BigInt => "BIGINT",
            SqlType::Float4 => "FLOAT4",
            SqlType::Float8 => "FLOAT8",
            SqlType::Varchar => "VARCHAR",
            SqlType::Bool => "BOOL",
            SqlType::Date => "DATE",
            SqlType::Timestamp => "TIMESTAMP",
        }
    }

    /// Widest column type for a dtype when no value is at hand.
    pub fn for_dtype(dtype: DtypeTag) -> Option<Self> {
        match dtype {
            DtypeTag::Int => Some(SqlType::BigInt),
            DtypeTag::Float => Some(SqlType::Float8),
            DtypeTag::String => Some(SqlType::Varchar),
            DtypeTag::Bool => Some(SqlType::Bool),
            DtypeTag::Other => None,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Column type for one representative value. `None` for null.
///
/// `strict` turns floats beyond FLOAT8 (and non-finite floats) into an error
/// instead of quietly capping them at FLOAT8.
pub fn sql_type(value: &ScalarValue, strict: bool, infer_dates: bool) -> Result<Option<SqlType>> {
    Ok(Some(match value {
        ScalarValue::Null => return Ok(None),
        ScalarValue::Bool(_) => SqlType::Bool,
        ScalarValue::Int(i) => {
            let m = i.unsigned_abs();
            if m <= SMALLINT_MAX as u64 {
                SqlType::SmallInt
            } else if m <= INT_MAX as u64 {
                SqlType::Int
            } else {
                SqlType::BigInt
            }
        }
        ScalarValue::Float(f) => {
            let m = f.abs();
            if m < FLOAT4_LIMIT {
                SqlType::Float4
            } else if m < FLOAT_MAGNITUDE_LIMIT {
                SqlType::Float8
            } else if strict || !f.is_finite() {
                return Err(Error::SqlTypeOverflow { value: value.clone() });
            } else {
                SqlType::Float8
            }
        }
        ScalarValue::String(s) => {
            if infer_dates {
                guess_date_type(s).unwrap_or(SqlType::Varchar)
            } else {
                SqlType::Varchar
            }
        }
    }))
}

// ------------------------------- Dates ------------------------------------ //

fn num_digits(s: &str) -> usize { s.chars().filter(char::is_ascii_digit).count() }

const DATES: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];
const DATETIMES: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y%m%dT%H%M%S",
    "%Y-%m-%dT%H:%M",
];
const DATETIMES_TZ: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Trailing UTC offset: `Z`, `+hh`, `+hhmm` or `+hh:mm`.
static UTC_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:Z|[+-]\d{2}(?::?\d{2})?)$").expect("valid offset regex"));

fn parses_as_naive_datetime(s: &str) -> bool {
    DATETIMES.iter().any(|f| NaiveDateTime::parse_from_str(s, f).is_ok())
}

fn parses_as_iso8601(s: &str) -> bool {
    if DateTime::parse_from_rfc3339(s).is_ok()
        || DATES.iter().any(|f| NaiveDate::parse_from_str(s, f).is_ok())
        || parses_as_naive_datetime(s)
        || DATETIMES_TZ.iter().any(|f| DateTime::parse_from_str(s, f).is_ok())
    {
        return true;
    }
    // offsets chrono cannot represent (e.g. +8000) are still well-formed ISO 8601
    match UTC_OFFSET.find(s) {
        Some(m) if m.start() > 0 => parses_as_naive_datetime(&s[..m.start()]),
        _ => false,
    }
}

/// DATE for an 8-digit ISO 8601 date, TIMESTAMP for anything longer that
/// still parses. Fewer than 8 digits can never be a full date.
pub fn guess_date_type(s: &str) -> Option<SqlType> {
    let n = num_digits(s);
    if n < 8 || !parses_as_iso8601(s) {
        return None;
    }
    Some(if n == 8 { SqlType::Date } else { SqlType::Timestamp })
}
