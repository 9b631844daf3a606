use thiserror::Error;

use crate::value::{DtypeTag, Leaf, ScalarValue};

/// Largest float magnitude a column type can hold exactly (2^48).
pub const FLOAT_MAGNITUDE_LIMIT: f64 = 281_474_976_710_656.0;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("value {0} is out of range")]
pub struct OutOfRange(pub ScalarValue);

/// Maps a non-null leaf to the dtype it is counted under.
pub trait DtypeClassifier: Send + Sync {
    fn classify(&self, leaf: &Leaf) -> Result<DtypeTag, OutOfRange>;
}

/// Classifies by variant. In strict mode, floats that cannot be represented
/// by any column type are rejected instead of being counted.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarClassifier {
    pub strict: bool,
}

impl ScalarClassifier {
    pub fn strict() -> Self { Self { strict: true } }
}

impl DtypeClassifier for ScalarClassifier {
    fn classify(&self, leaf: &Leaf) -> Result<DtypeTag, OutOfRange> {
        let scalar = match leaf {
            Leaf::Scalar(s) => s,
            Leaf::EmptyObject | Leaf::EmptyArray => return Ok(DtypeTag::Other),
        };
        Ok(match scalar {
            ScalarValue::Int(_) => DtypeTag::Int,
            ScalarValue::Float(f) => {
                if self.strict && (!f.is_finite() || f.abs() >= FLOAT_MAGNITUDE_LIMIT) {
                    return Err(OutOfRange(scalar.clone()));
                }
                DtypeTag::Float
            }
            ScalarValue::String(_) => DtypeTag::String,
            ScalarValue::Bool(_) => DtypeTag::Bool,
            ScalarValue::Null => DtypeTag::Other,
        })
    }
}

impl<F> DtypeClassifier for F
where
    F: Fn(&Leaf) -> Result<DtypeTag, OutOfRange> + Send + Sync,
{
    fn classify(&self, leaf: &Leaf) -> Result<DtypeTag, OutOfRange> { self(leaf) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_accepts_huge_floats() {
        let c = ScalarClassifier::default();
        assert_eq!(c.classify(&Leaf::from(1e300)), Ok(DtypeTag::Float));
        assert_eq!(c.classify(&Leaf::EmptyArray), Ok(DtypeTag::Other));
        assert_eq!(c.classify(&Leaf::from("x")), Ok(DtypeTag::String));
    }

    #[test]
    fn strict_rejects_out_of_range_floats() {
        let c = ScalarClassifier::strict();
        assert_eq!(c.classify(&Leaf::from(FLOAT_MAGNITUDE_LIMIT - 1.0)), Ok(DtypeTag::Float));
        assert!(c.classify(&Leaf::from(FLOAT_MAGNITUDE_LIMIT)).is_err());
        assert!(c.classify(&Leaf::from(-1e20)).is_err());
        assert!(c.classify(&Leaf::from(f64::NAN)).is_err());
        assert_eq!(c.classify(&Leaf::from(i64::MAX)), Ok(DtypeTag::Int));
    }

    #[test]
    fn closures_are_classifiers() {
        let everything_is_a_string = |_: &Leaf| -> Result<DtypeTag, OutOfRange> { Ok(DtypeTag::String) };
        assert_eq!(everything_is_a_string.classify(&Leaf::from(1i64)), Ok(DtypeTag::String));
    }
}
