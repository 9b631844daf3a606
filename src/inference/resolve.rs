//! Structural conflict resolution over the flat path set.
//!
//! Two passes produce one override set (paths left out of the merged tree):
//!
//! 1. Terminal/parent: a path that is a key *and* a strict prefix of another key
//!    ended early in some records. The deeper structure always wins.
//! 2. Array/non-array: a path that held an array in some records and an object
//!    in others. Observation counts below each branch vote; arrays win ties.
//!
//! Neither pass mutates the accumulator.
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use super::field::FieldStats;
use crate::diagnostics::{Ambiguity, Branch, Diagnostic};
use crate::path::{Path, PathSegment};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overrides {
    pub paths: BTreeSet<Path>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Overrides {
    pub fn contains(&self, path: &Path) -> bool { self.paths.contains(path) }
}

fn by_depth(a: &Path, b: &Path) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Keys strictly below `parent`. Lexicographic order keeps them contiguous
/// right after `parent` itself.
fn descendants<'a>(
    fields: &'a BTreeMap<Path, FieldStats>,
    parent: &'a Path,
) -> impl Iterator<Item = (&'a Path, &'a FieldStats)> + 'a {
    fields
        .range::<Path, _>((Bound::Excluded(parent), Bound::Unbounded))
        .take_while(move |(k, _)| parent.is_parent_of(k))
}

pub fn resolve(fields: &BTreeMap<Path, FieldStats>) -> Overrides {
    let mut out = Overrides::default();
    mixed_terminals(fields, &mut out);
    mixed_array_parents(fields, &mut out);
    out
}

// ------------------------------ Pass A ------------------------------------ //

fn mixed_terminals(fields: &BTreeMap<Path, FieldStats>, out: &mut Overrides) {
    let mut terminals: Vec<&Path> = fields
        .keys()
        .filter(|k| descendants(fields, k).next().is_some())
        .collect();
    terminals.sort_by(|a, b| by_depth(a, b));

    for path in terminals {
        out.paths.insert(path.clone());
        out.diagnostics.push(Diagnostic::AmbiguousStructure(Ambiguity::Terminal { path: path.clone() }));
    }
}

// ------------------------------ Pass B ------------------------------------ //

#[derive(Default)]
struct Group<'a> {
    keys: Vec<&'a Path>,
    total: u64,
}

fn mixed_array_parents(fields: &BTreeMap<Path, FieldStats>, out: &mut Overrides) {
    let mut parents: Vec<Path> = fields
        .keys()
        .filter(|k| k.has_array() && !out.contains(k))
        .flat_map(|k| k.array_parents())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    parents.sort_by(by_depth);

    for parent in &parents {
        let depth = parent.len();
        let mut array = Group::default();
        let mut non_array = Group::default();

        // re-read the survivors so an outer decision is never re-litigated
        for (key, stats) in descendants(fields, parent) {
            if out.contains(key) {
                continue;
            }
            let group = match key.segments()[depth] {
                PathSegment::ArrayMarker => &mut array,
                PathSegment::Name(_) => &mut non_array,
            };
            group.keys.push(key);
            group.total += stats.observations();
        }

        if array.keys.is_empty() || non_array.keys.is_empty() {
            continue;
        }

        let (winner, losers) = if array.total >= non_array.total {
            (Branch::Array, &non_array.keys)
        } else {
            (Branch::NonArray, &array.keys)
        };
        out.paths.extend(losers.iter().map(|k| (*k).clone()));
        out.diagnostics.push(Diagnostic::AmbiguousStructure(Ambiguity::ArrayParent {
            path: parent.clone(),
            winner,
            array_total: array.total,
            non_array_total: non_array.total,
        }));
    }
}
