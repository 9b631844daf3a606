// Merged output tree. Built by `lower`, consumed by `ddl` and the CLI.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::value::{DtypeTag, Leaf, ScalarValue};

#[derive(Debug, Clone, PartialEq)]
pub enum MergedTree {
    Scalar(ScalarValue),     // representative value
    Dtype(DtypeTag),         // type-resolved export
    Object(BTreeMap<String, MergedTree>),
    Array(Option<Box<MergedTree>>), // one representative element; None = only `[]` seen
}

impl MergedTree {
    pub fn empty_object() -> Self { MergedTree::Object(BTreeMap::new()) }

    /// A container that already has content below it.
    pub fn is_branch(&self) -> bool {
        match self {
            MergedTree::Object(m) => !m.is_empty(),
            MergedTree::Array(item) => item.is_some(),
            MergedTree::Scalar(_) | MergedTree::Dtype(_) => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&MergedTree> {
        match self {
            MergedTree::Object(m) => m.get(key),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            MergedTree::Scalar(s) => s.to_json(),
            MergedTree::Dtype(t) => Value::String(t.as_str().to_string()),
            MergedTree::Object(m) => {
                let mut out = Map::new();
                for (k, v) in m {
                    out.insert(k.clone(), v.to_json());
                }
                Value::Object(out)
            }
            MergedTree::Array(item) => Value::Array(item.iter().map(|x| x.to_json()).collect()),
        }
    }
}

impl From<Leaf> for MergedTree {
    fn from(leaf: Leaf) -> Self {
        match leaf {
            Leaf::Scalar(s) => MergedTree::Scalar(s),
            Leaf::EmptyObject => MergedTree::empty_object(),
            Leaf::EmptyArray => MergedTree::Array(None),
        }
    }
}
