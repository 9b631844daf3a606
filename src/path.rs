//! Field paths and the walk that flattens a record into them.
//!
//! Every array index collapses onto one `ArrayMarker` segment, so `[0].x` and
//! `[7].x` address the same field.
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::value::{Leaf, ScalarValue};

// ------------------------------- Segments --------------------------------- //

/// Declaration order gives `Name < ArrayMarker`; names compare as strings.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    Name(String),
    ArrayMarker,
}

impl PathSegment {
    pub fn name(s: impl Into<String>) -> Self { PathSegment::Name(s.into()) }
    pub fn is_array(&self) -> bool { matches!(self, PathSegment::ArrayMarker) }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Name(n) => f.write_str(n),
            PathSegment::ArrayMarker => f.write_str("[array]"),
        }
    }
}

// --------------------------------- Path ----------------------------------- //

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self { Self(Vec::new()) }

    pub fn segments(&self) -> &[PathSegment] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn child(&self, seg: PathSegment) -> Self {
        let mut segs = Vec::with_capacity(self.0.len() + 1);
        segs.extend_from_slice(&self.0);
        segs.push(seg);
        Self(segs)
    }

    pub fn prefix(&self, len: usize) -> Self { Self(self.0[..len.min(self.0.len())].to_vec()) }

    pub fn has_array(&self) -> bool { self.0.iter().any(PathSegment::is_array) }

    /// `self` is a strict prefix of `other`.
    pub fn is_parent_of(&self, other: &Path) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// Every prefix that ends right before an array marker, i.e. every path
    /// whose value is an array, shallowest first.
    pub fn array_parents(&self) -> impl Iterator<Item = Path> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_array())
            .map(|(ix, _)| self.prefix(ix))
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self { Self(iter.into_iter().collect()) }
}

/// Shorthand for tests: `"[]"` stands for the array marker.
#[cfg(test)]
pub(crate) fn p(segs: &[&str]) -> Path {
    segs.iter()
        .map(|s| if *s == "[]" { PathSegment::ArrayMarker } else { PathSegment::name(*s) })
        .collect()
}

impl From<Vec<PathSegment>> for Path {
    fn from(segs: Vec<PathSegment>) -> Self { Self(segs) }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 { f.write_str(".")?; }
            seg.fmt(f)?;
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

// ------------------------------- Extract ---------------------------------- //

/// Lazily walks one record, yielding `(path, leaf)` per terminal position.
pub struct Extract<'a> {
    stack: Vec<(Path, &'a Value)>,
}

pub fn extract(value: &Value) -> Extract<'_> {
    Extract { stack: vec![(Path::root(), value)] }
}

impl<'a> Iterator for Extract<'a> {
    type Item = (Path, Leaf);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (path, value) = self.stack.pop()?;
            match value {
                Value::Object(map) if map.is_empty() => return Some((path, Leaf::EmptyObject)),
                Value::Array(xs) if xs.is_empty() => return Some((path, Leaf::EmptyArray)),
                Value::Object(map) => {
                    // reversed so keys come out in document order
                    for (k, v) in map.iter().rev() {
                        self.stack.push((path.child(PathSegment::name(k.as_str())), v));
                    }
                }
                Value::Array(xs) => {
                    for v in xs.iter().rev() {
                        self.stack.push((path.child(PathSegment::ArrayMarker), v));
                    }
                }
                scalar => {
                    let leaf = ScalarValue::from_json(scalar).map(Leaf::Scalar).unwrap_or_else(Leaf::null);
                    return Some((path, leaf));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_and_arrays_flatten_to_marker_paths() {
        let v = json!({"a": {"b": [{"c": 1}, {"c": 2, "d": "x"}]}, "e": null});
        let pairs: Vec<_> = extract(&v).collect();
        assert_eq!(pairs, vec![
            (p(&["a", "b", "[]", "c"]), Leaf::from(1i64)),
            (p(&["a", "b", "[]", "c"]), Leaf::from(2i64)),
            (p(&["a", "b", "[]", "d"]), Leaf::from("x")),
            (p(&["e"]), Leaf::null()),
        ]);
    }

    #[test]
    fn empty_containers_keep_their_position() {
        let v = json!({"a": {}, "s": {"arr": []}});
        let pairs: Vec<_> = extract(&v).collect();
        assert_eq!(pairs, vec![
            (p(&["a"]), Leaf::EmptyObject),
            (p(&["s", "arr"]), Leaf::EmptyArray),
        ]);
    }

    #[test]
    fn nested_arrays_stack_markers() {
        let v = json!({"a": [[{"x": true}]]});
        let pairs: Vec<_> = extract(&v).collect();
        assert_eq!(pairs, vec![(p(&["a", "[]", "[]", "x"]), Leaf::from(true))]);
    }

    #[test]
    fn marker_sorts_after_names() {
        let mut paths = vec![p(&["a", "[]"]), p(&["a", "z"]), p(&["a"]), p(&["a", "b", "c"])];
        paths.sort();
        assert_eq!(paths, vec![p(&["a"]), p(&["a", "b", "c"]), p(&["a", "z"]), p(&["a", "[]"])]);
    }

    #[test]
    fn array_parents_stop_before_each_marker() {
        let path = p(&["a", "[]", "b", "[]", "c"]);
        let parents: Vec<_> = path.array_parents().collect();
        assert_eq!(parents, vec![p(&["a"]), p(&["a", "[]", "b"])]);
        assert!(p(&["a"]).is_parent_of(&path));
        assert!(!path.is_parent_of(&path));
    }
}
