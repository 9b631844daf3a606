//! Scalar vocabulary shared by every stage of the pipeline.
//!
//! - `ScalarValue` is what a terminal position holds after parsing.
//! - `Leaf` adds the two empty-container markers so `{}` and `[]` keep their
//!   structural presence instead of collapsing into null.
//! - `DtypeTag` is the coarse classification the accumulator counts by.
use std::cmp::Ordering;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::Serialize;
use serde_json::Value;

// ------------------------------- Scalars ---------------------------------- //

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool { matches!(self, ScalarValue::Null) }

    /// Compare absolute magnitudes. `None` unless both sides are numeric.
    /// Integers compare exactly against each other and against floats.
    pub fn cmp_magnitude(&self, other: &Self) -> Option<Ordering> {
        Some(match (self, other) {
            (ScalarValue::Int(a), ScalarValue::Int(b)) => a.unsigned_abs().cmp(&b.unsigned_abs()),
            (ScalarValue::Float(a), ScalarValue::Float(b)) => OrderedFloat(a.abs()).cmp(&OrderedFloat(b.abs())),
            (ScalarValue::Int(a), ScalarValue::Float(b)) => cmp_int_float(i128::from(a.unsigned_abs()), b.abs()),
            (ScalarValue::Float(a), ScalarValue::Int(b)) => {
                cmp_int_float(i128::from(b.unsigned_abs()), a.abs()).reverse()
            }
            _ => return None,
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int(i) => Some(*i as f64),
            ScalarValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Length in characters for strings.
    pub fn char_len(&self) -> Option<usize> {
        match self {
            ScalarValue::String(s) => Some(s.chars().count()),
            _ => None,
        }
    }

    /// Convert a JSON scalar. Containers map to `None`.
    ///
    /// Integers outside the `i64` range degrade to `Float`; a strict classifier
    /// rejects them later instead of letting them pass silently.
    pub fn from_json(v: &Value) -> Option<Self> {
        match v {
            Value::Null => Some(ScalarValue::Null),
            Value::Bool(b) => Some(ScalarValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ScalarValue::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Some(ScalarValue::Float(u as f64))
                } else {
                    n.as_f64().map(ScalarValue::Float)
                }
            }
            Value::String(s) => Some(ScalarValue::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Null => Value::Null,
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Int(i) => Value::from(*i),
            ScalarValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ScalarValue::String(s) => Value::String(s.clone()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            ScalarValue::Null => 0,
            ScalarValue::Bool(_) => 1,
            ScalarValue::Int(_) | ScalarValue::Float(_) => 2,
            ScalarValue::String(_) => 3,
        }
    }

    /// Total order used only to break ties between accumulators.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a.cmp(b),
            (ScalarValue::String(a), ScalarValue::String(b)) => a.cmp(b),
            (ScalarValue::Int(a), ScalarValue::Int(b)) => a.cmp(b),
            (ScalarValue::Float(a), ScalarValue::Float(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            // 1 vs 1.0: integers sit below equal floats so the order stays total
            (ScalarValue::Int(a), ScalarValue::Float(b)) => {
                cmp_int_float(i128::from(*a), *b).then(Ordering::Less)
            }
            (ScalarValue::Float(a), ScalarValue::Int(b)) => {
                cmp_int_float(i128::from(*b), *a).reverse().then(Ordering::Greater)
            }
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }
}

/// Exact `i` vs `f`, with NaN above everything (as `OrderedFloat` does).
fn cmp_int_float(i: i128, f: f64) -> Ordering {
    const LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0; // 2^127
    if f.is_nan() || f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    i.cmp(&(whole as i128)).then_with(|| {
        if f > whole {
            Ordering::Less
        } else if f < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "null"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Int(i) => write!(f, "{i}"),
            ScalarValue::Float(x) => write!(f, "{x}"),
            ScalarValue::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for ScalarValue { fn from(b: bool) -> Self { ScalarValue::Bool(b) } }
impl From<i64> for ScalarValue { fn from(i: i64) -> Self { ScalarValue::Int(i) } }
impl From<f64> for ScalarValue { fn from(f: f64) -> Self { ScalarValue::Float(f) } }
impl From<&str> for ScalarValue { fn from(s: &str) -> Self { ScalarValue::String(s.to_string()) } }
impl From<String> for ScalarValue { fn from(s: String) -> Self { ScalarValue::String(s) } }

// -------------------------------- Leaves ---------------------------------- //

/// What a terminal path position held in one record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Leaf {
    Scalar(ScalarValue),
    EmptyObject,
    EmptyArray,
}

impl Leaf {
    pub fn null() -> Self { Leaf::Scalar(ScalarValue::Null) }

    pub fn is_null(&self) -> bool {
        matches!(self, Leaf::Scalar(ScalarValue::Null))
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Leaf::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn cmp_magnitude(&self, other: &Self) -> Option<Ordering> {
        self.as_scalar()?.cmp_magnitude(other.as_scalar()?)
    }

    pub fn char_len(&self) -> Option<usize> { self.as_scalar().and_then(ScalarValue::char_len) }

    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        fn rank(l: &Leaf) -> u8 {
            match l {
                Leaf::Scalar(_) => 0,
                Leaf::EmptyObject => 1,
                Leaf::EmptyArray => 2,
            }
        }
        match (self, other) {
            (Leaf::Scalar(a), Leaf::Scalar(b)) => a.canonical_cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

impl From<ScalarValue> for Leaf { fn from(v: ScalarValue) -> Self { Leaf::Scalar(v) } }
impl From<bool> for Leaf { fn from(b: bool) -> Self { Leaf::Scalar(b.into()) } }
impl From<i64> for Leaf { fn from(i: i64) -> Self { Leaf::Scalar(i.into()) } }
impl From<f64> for Leaf { fn from(f: f64) -> Self { Leaf::Scalar(f.into()) } }
impl From<&str> for Leaf { fn from(s: &str) -> Self { Leaf::Scalar(s.into()) } }
impl From<String> for Leaf { fn from(s: String) -> Self { Leaf::Scalar(s.into()) } }

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Scalar(s) => s.fmt(f),
            Leaf::EmptyObject => write!(f, "{{}}"),
            Leaf::EmptyArray => write!(f, "[]"),
        }
    }
}

// ------------------------------- Dtypes ----------------------------------- //

/// Coarse scalar classification. The declaration order doubles as the
/// deterministic tie-break when two dtypes share the highest count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DtypeTag {
    Int,
    Float,
    String,
    Bool,
    Other,
}

impl DtypeTag {
    pub fn is_numeric(self) -> bool { matches!(self, DtypeTag::Int | DtypeTag::Float) }

    pub fn as_str(self) -> &'static str {
        match self {
            DtypeTag::Int => "int",
            DtypeTag::Float => "float",
            DtypeTag::String => "str",
            DtypeTag::Bool => "bool",
            DtypeTag::Other => "other",
        }
    }
}

impl fmt::Display for DtypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_keep_integer_width() {
        assert_eq!(ScalarValue::from_json(&json!(10_000_000_000i64)), Some(ScalarValue::Int(10_000_000_000)));
        assert_eq!(ScalarValue::from_json(&json!(1.5)), Some(ScalarValue::Float(1.5)));
        assert_eq!(ScalarValue::from_json(&json!(u64::MAX)), Some(ScalarValue::Float(u64::MAX as f64)));
        assert_eq!(ScalarValue::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn canonical_order_is_total_across_numeric_kinds() {
        let a = ScalarValue::Int(1);
        let b = ScalarValue::Float(1.0);
        assert_eq!(a.canonical_cmp(&b), Ordering::Less);
        assert_eq!(b.canonical_cmp(&a), Ordering::Greater);
        assert_eq!(ScalarValue::Int(-3).canonical_cmp(&ScalarValue::Int(3)), Ordering::Less);
        assert_eq!(Leaf::from(true).canonical_cmp(&Leaf::EmptyArray), Ordering::Less);
    }

    #[test]
    fn large_integers_compare_exactly() {
        let (big, bigger) = (ScalarValue::Int(9_007_199_254_740_992), ScalarValue::Int(9_007_199_254_740_993));
        assert_eq!(bigger.cmp_magnitude(&big), Some(Ordering::Greater));
        assert_eq!(ScalarValue::Int(-9_007_199_254_740_993).cmp_magnitude(&big), Some(Ordering::Greater));
        assert_eq!(ScalarValue::Int(i64::MIN).cmp_magnitude(&ScalarValue::Int(i64::MAX)), Some(Ordering::Greater));
        assert_eq!(big.canonical_cmp(&bigger), Ordering::Less);
        assert_eq!(bigger.canonical_cmp(&big), Ordering::Greater);
    }

    #[test]
    fn mixed_numeric_comparisons_are_exact() {
        let float = ScalarValue::Float(9_007_199_254_740_992.0);
        let int = ScalarValue::Int(9_007_199_254_740_993);
        assert_eq!(int.cmp_magnitude(&float), Some(Ordering::Greater));
        assert_eq!(float.cmp_magnitude(&int), Some(Ordering::Less));
        assert_eq!(ScalarValue::Int(2).cmp_magnitude(&ScalarValue::Float(-2.0)), Some(Ordering::Equal));
        assert_eq!(ScalarValue::Int(2).cmp_magnitude(&ScalarValue::Float(2.5)), Some(Ordering::Less));
        assert_eq!(ScalarValue::Int(3).cmp_magnitude(&ScalarValue::Float(f64::INFINITY)), Some(Ordering::Less));
        assert_eq!(ScalarValue::Int(-3).canonical_cmp(&ScalarValue::Float(-2.5)), Ordering::Less);
        assert_eq!(ScalarValue::Float(-2.5).canonical_cmp(&ScalarValue::Int(-2)), Ordering::Less);
        assert_eq!(ScalarValue::Int(1).cmp_magnitude(&ScalarValue::from("x")), None);
    }
}
