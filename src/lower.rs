//! Lowering: flat `(path, terminal)` pairs → nested `MergedTree`.
//!
//! Paths are expected to be conflict-free (see `inference::resolve`), but the
//! builder stays total on any input: a terminal never overwrites a branch that
//! already has content, and a branch of the other container kind is left alone.
use crate::ir::MergedTree;
use crate::path::{Path, PathSegment};
use crate::value::ScalarValue;

#[derive(Debug, Clone, PartialEq)]
pub struct TreeBuilder {
    root: MergedTree,
}

impl Default for TreeBuilder {
    fn default() -> Self { Self::new() }
}

impl TreeBuilder {
    pub fn new() -> Self { Self { root: MergedTree::empty_object() } }

    /// Insert one terminal. Returns `false` if existing structure blocked it.
    /// Re-inserting a pair that is already present changes nothing.
    pub fn insert(&mut self, path: &Path, terminal: MergedTree) -> bool {
        attach(&mut self.root, path.segments(), terminal)
    }

    pub fn tree(&self) -> &MergedTree { &self.root }

    pub fn build(self) -> MergedTree { self.root }
}

fn placeholder() -> MergedTree { MergedTree::Scalar(ScalarValue::Null) }

fn attach(node: &mut MergedTree, segs: &[PathSegment], terminal: MergedTree) -> bool {
    let Some((head, rest)) = segs.split_first() else {
        if node.is_branch() {
            return false;
        }
        *node = terminal;
        return true;
    };

    match head {
        PathSegment::Name(name) => {
            if !matches!(node, MergedTree::Object(_)) {
                if node.is_branch() { return false; }
                *node = MergedTree::empty_object();
            }
            match node {
                MergedTree::Object(children) => {
                    let fresh = !children.contains_key(name);
                    let child = children.entry(name.clone()).or_insert_with(placeholder);
                    let attached = attach(child, rest, terminal);
                    if fresh && !attached {
                        children.remove(name);
                    }
                    attached
                }
                _ => false,
            }
        }
        PathSegment::ArrayMarker => {
            if !matches!(node, MergedTree::Array(_)) {
                if node.is_branch() { return false; }
                *node = MergedTree::Array(None);
            }
            match node {
                MergedTree::Array(item) => {
                    let fresh = item.is_none();
                    let child = item.get_or_insert_with(|| Box::new(placeholder()));
                    let attached = attach(child, rest, terminal);
                    if fresh && !attached {
                        *item = None;
                    }
                    attached
                }
                _ => false,
            }
        }
    }
}

/// Build a tree from pairs in ascending path order.
pub fn lower_paths<'a, I>(pairs: I) -> MergedTree
where
    I: IntoIterator<Item = (&'a Path, MergedTree)>,
{
    let mut sorted: Vec<_> = pairs.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let mut builder = TreeBuilder::new();
    for (path, terminal) in sorted {
        builder.insert(path, terminal);
    }
    builder.build()
}
