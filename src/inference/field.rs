use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::classify::{DtypeClassifier, OutOfRange};
use crate::value::{DtypeTag, Leaf, ScalarValue};

/// Sufficient statistics for one path: how often each dtype was seen and the
/// widest value seen per dtype.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldStats {
    histogram: BTreeMap<DtypeTag, u64>,
    representative: BTreeMap<DtypeTag, Leaf>,
    null_count: u64,
}

// ---------------------------- Comparators --------------------------------- //

/// `true` when `incoming` replaces `current`. Incoming wins ties.
fn incoming_wins(tag: DtypeTag, incoming: &Leaf, current: &Leaf) -> bool {
    match tag {
        DtypeTag::Int | DtypeTag::Float => incoming.cmp_magnitude(current) != Some(Ordering::Less),
        DtypeTag::String => match (incoming.char_len(), current.char_len()) {
            (Some(a), Some(b)) => a >= b,
            _ => true,
        },
        DtypeTag::Bool | DtypeTag::Other => true,
    }
}

/// Order-free variant for joining two accumulators: same primary key as
/// `incoming_wins`, ties settled by the canonical value order.
fn widest(tag: DtypeTag, a: &Leaf, b: &Leaf) -> Leaf {
    let primary = match tag {
        DtypeTag::Int | DtypeTag::Float => a.cmp_magnitude(b).unwrap_or(Ordering::Equal),
        DtypeTag::String => match (a.char_len(), b.char_len()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => Ordering::Equal,
        },
        DtypeTag::Bool | DtypeTag::Other => Ordering::Equal,
    };
    match primary.then_with(|| a.canonical_cmp(b)) {
        Ordering::Less => b.clone(),
        _ => a.clone(),
    }
}

impl FieldStats {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, leaf: Leaf, classifier: &dyn DtypeClassifier) -> Result<(), OutOfRange> {
        if leaf.is_null() {
            self.null_count += 1;
            return Ok(());
        }
        let tag = classifier.classify(&leaf)?;
        *self.histogram.entry(tag).or_insert(0) += 1;
        match self.representative.get_mut(&tag) {
            None => { self.representative.insert(tag, leaf); }
            Some(current) => {
                if incoming_wins(tag, &leaf, current) {
                    *current = leaf;
                }
            }
        }
        Ok(())
    }

    pub(super) fn join(a: &Self, b: &Self) -> Self {
        let mut out = a.clone();
        out.null_count += b.null_count;
        for (tag, n) in &b.histogram {
            *out.histogram.entry(*tag).or_insert(0) += n;
        }
        for (tag, rep) in &b.representative {
            let merged = match out.representative.get(tag) {
                Some(mine) => widest(*tag, mine, rep),
                None => rep.clone(),
            };
            out.representative.insert(*tag, merged);
        }
        out
    }

    pub fn histogram(&self) -> &BTreeMap<DtypeTag, u64> { &self.histogram }
    pub fn representative(&self, tag: DtypeTag) -> Option<&Leaf> { self.representative.get(&tag) }
    pub fn null_count(&self) -> u64 { self.null_count }

    /// Non-null observations across every dtype.
    pub fn observations(&self) -> u64 { self.histogram.values().sum() }

    pub fn dtypes(&self) -> Vec<DtypeTag> { self.histogram.keys().copied().collect() }

    pub fn is_mixed(&self) -> bool { self.histogram.len() > 1 }

    /// Resolved dtype.
    ///
    /// Int together with Float resolves to Float. With `str_numeric_override`
    /// any string observed next to a number forces String. Otherwise the most
    /// frequent dtype wins, ties going to the lowest `DtypeTag`.
    pub fn dtype(&self, str_numeric_override: bool) -> Option<DtypeTag> {
        let mut keys = self.histogram.keys().copied();
        match self.histogram.len() {
            0 => return None,
            1 => return keys.next(),
            _ => {}
        }
        let has = |t: DtypeTag| self.histogram.contains_key(&t);
        let numeric = has(DtypeTag::Int) || has(DtypeTag::Float);
        if str_numeric_override && numeric && has(DtypeTag::String) {
            return Some(DtypeTag::String);
        }
        if has(DtypeTag::Int) && has(DtypeTag::Float) {
            return Some(DtypeTag::Float);
        }
        let mut best: Option<(DtypeTag, u64)> = None;
        for (tag, n) in &self.histogram {
            if best.is_none_or(|(_, m)| *n > m) {
                best = Some((*tag, *n));
            }
        }
        best.map(|(tag, _)| tag)
    }

    /// Representative value for the resolved dtype.
    pub fn max_value(&self, str_numeric_override: bool) -> Option<Leaf> {
        let dtype = self.dtype(str_numeric_override)?;
        if dtype == DtypeTag::Float {
            if let (Some(float), Some(int)) = (
                self.representative.get(&DtypeTag::Float),
                self.representative.get(&DtypeTag::Int),
            ) {
                let keep = if incoming_wins(DtypeTag::Float, float, int) { float } else { int };
                let as_float = keep.as_scalar().and_then(ScalarValue::as_f64);
                return as_float.map(Leaf::from).or_else(|| Some(keep.clone()));
            }
        }
        self.representative.get(&dtype).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::classify::ScalarClassifier;

    fn field_of(vals: &[Leaf]) -> FieldStats {
        let mut f = FieldStats::new();
        for v in vals {
            f.add(v.clone(), &ScalarClassifier::default()).unwrap();
        }
        f
    }

    fn resolved(f: &FieldStats) -> (Option<DtypeTag>, Option<Leaf>) {
        (f.dtype(false), f.max_value(false))
    }

    #[test]
    fn only_nulls_resolve_to_nothing() {
        let f = field_of(&[Leaf::null(), Leaf::null()]);
        assert_eq!(resolved(&f), (None, None));
        assert_eq!(f.null_count(), 2);
        assert!(f.histogram().is_empty());
    }

    #[test]
    fn nulls_do_not_touch_the_histogram() {
        let f = field_of(&[Leaf::null(), Leaf::from(1i64), Leaf::null()]);
        assert_eq!(resolved(&f), (Some(DtypeTag::Int), Some(Leaf::from(1i64))));
        assert_eq!(f.observations(), 1);
        assert_eq!(f.null_count(), 2);
    }

    #[test]
    fn numeric_magnitude_tie_goes_to_incoming() {
        let f = field_of(&[Leaf::from(1i64), Leaf::from(100i64), Leaf::from(-100i64)]);
        assert_eq!(resolved(&f), (Some(DtypeTag::Int), Some(Leaf::from(-100i64))));
    }

    #[test]
    fn bools_are_last_write_wins() {
        let f = field_of(&[Leaf::from(true), Leaf::from(false)]);
        assert_eq!(resolved(&f), (Some(DtypeTag::Bool), Some(Leaf::from(false))));
    }

    #[test]
    fn strings_keep_the_longest() {
        let f = field_of(&[Leaf::from("x"), Leaf::from(""), Leaf::from("xx"), Leaf::from("")]);
        assert_eq!(resolved(&f), (Some(DtypeTag::String), Some(Leaf::from("xx"))));
    }

    #[test]
    fn string_length_counts_characters() {
        let f = field_of(&[Leaf::from("ééé"), Leaf::from("abcd")]);
        assert_eq!(f.max_value(false), Some(Leaf::from("abcd")));
    }

    #[test]
    fn int_and_float_resolve_to_float_regardless_of_counts() {
        let f = field_of(&[Leaf::from(1i64), Leaf::from(5i64), Leaf::from(7i64), Leaf::from(0.1)]);
        assert_eq!(resolved(&f), (Some(DtypeTag::Float), Some(Leaf::from(7.0))));

        let f = field_of(&[Leaf::from(0.1), Leaf::from(1i64)]);
        assert_eq!(resolved(&f), (Some(DtypeTag::Float), Some(Leaf::from(1.0))));
    }

    #[test]
    fn float_representative_wins_magnitude_tie_with_int() {
        let f = field_of(&[Leaf::from(-2.0), Leaf::from(2i64)]);
        assert_eq!(f.max_value(false), Some(Leaf::from(-2.0)));
    }

    #[test]
    fn string_override_beats_numeric_dominance() {
        let vals = [Leaf::from(1i64), Leaf::from(2.1), Leaf::from("x"), Leaf::from(1i64), Leaf::from("xx"), Leaf::from(100i64), Leaf::from(true)];
        let f = field_of(&vals);
        assert_eq!(f.dtype(false), Some(DtypeTag::Float));
        assert_eq!(f.max_value(false), Some(Leaf::from(100.0)));
        assert_eq!(f.dtype(true), Some(DtypeTag::String));
        assert_eq!(f.max_value(true), Some(Leaf::from("xx")));
        assert!(f.is_mixed());
    }

    #[test]
    fn highest_count_wins_without_numeric_pair() {
        let f = field_of(&[Leaf::from("a"), Leaf::from(true), Leaf::from(false)]);
        assert_eq!(f.dtype(false), Some(DtypeTag::Bool));
        // 1:1 tie goes to the lower tag
        let f = field_of(&[Leaf::from(true), Leaf::from("a")]);
        assert_eq!(f.dtype(false), Some(DtypeTag::String));
    }

    #[test]
    fn join_sums_counts_and_keeps_widest() {
        let a = field_of(&[Leaf::from(3i64), Leaf::null(), Leaf::from("ab")]);
        let b = field_of(&[Leaf::from(-9i64), Leaf::from("a")]);
        let ab = FieldStats::join(&a, &b);
        assert_eq!(ab.histogram().get(&DtypeTag::Int), Some(&2));
        assert_eq!(ab.histogram().get(&DtypeTag::String), Some(&2));
        assert_eq!(ab.null_count(), 1);
        assert_eq!(ab.representative(DtypeTag::Int), Some(&Leaf::from(-9i64)));
        assert_eq!(ab.representative(DtypeTag::String), Some(&Leaf::from("ab")));
        assert_eq!(ab, FieldStats::join(&b, &a));
    }

    #[test]
    fn join_breaks_ties_without_regard_to_side() {
        let a = field_of(&[Leaf::from(-100i64), Leaf::from(true)]);
        let b = field_of(&[Leaf::from(100i64), Leaf::from(false)]);
        let ab = FieldStats::join(&a, &b);
        let ba = FieldStats::join(&b, &a);
        assert_eq!(ab, ba);
        assert_eq!(ab.representative(DtypeTag::Int), Some(&Leaf::from(100i64)));
        assert_eq!(ab.representative(DtypeTag::Bool), Some(&Leaf::from(true)));
    }

    #[test]
    fn integers_beyond_f64_precision_keep_the_larger() {
        let f = field_of(&[Leaf::from(9_007_199_254_740_993i64), Leaf::from(9_007_199_254_740_992i64)]);
        assert_eq!(f.max_value(false), Some(Leaf::from(9_007_199_254_740_993i64)));

        let f = field_of(&[Leaf::from(i64::MAX - 1), Leaf::from(i64::MAX)]);
        assert_eq!(f.max_value(false), Some(Leaf::from(i64::MAX)));
    }

    #[test]
    fn join_of_large_integers_is_commutative() {
        let a = field_of(&[Leaf::from(9_007_199_254_740_993i64)]);
        let b = field_of(&[Leaf::from(9_007_199_254_740_992i64)]);
        let ab = FieldStats::join(&a, &b);
        assert_eq!(ab, FieldStats::join(&b, &a));
        assert_eq!(ab.representative(DtypeTag::Int), Some(&Leaf::from(9_007_199_254_740_993i64)));

        // equal magnitude, opposite sign: settled by value order on both sides
        let a = field_of(&[Leaf::from(-9_007_199_254_740_993i64)]);
        let b = field_of(&[Leaf::from(9_007_199_254_740_993i64)]);
        assert_eq!(FieldStats::join(&a, &b), FieldStats::join(&b, &a));
        assert_eq!(FieldStats::join(&a, &b).representative(DtypeTag::Int), Some(&Leaf::from(9_007_199_254_740_993i64)));
    }
}
