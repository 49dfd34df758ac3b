//! Bipartitions ("splits") of a tree's leaf set, and tree reconstruction
//! from a compatible split set.
//!
//! # What is a split?
//! Each edge of a tree divides the leaves into two groups:
//! ```text
//!      root
//!     /    \
//!   {A,B}  {C,D}   ← this edge induces the split {A,B} | {C,D}
//! ```
//! A [`Split`] stores either both sides (an unrooted split) or a single
//! side, implicitly against "everything else" (an anchored split). Splits
//! are pure value data keyed by taxon *names*, never by node ids: ids are
//! an artifact of one particular arena, names are what two trees share.
//!
//! # Compatibility
//! Two splits can coexist in one tree iff they are compatible: for
//! one-sided splits, their sides are disjoint or nested; for two-sided
//! splits, at least one of the four side pairings is disjoint. Splits with
//! more than two sides are not supported and fail loudly (a deliberate,
//! preserved limitation).

use crate::transform::combined_length;
use crate::tree::{NodeId, Tree};
use itertools::Itertools;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Placeholder name marking the rooted side of a binary root's split.
pub const ROOT_PLACEHOLDER: &str = "@Root";

/// How a split's length value is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthType {
    /// Length of the single edge inducing the split.
    Length,
    /// Absolute distance of the node from the time origin.
    Age,
}

/// A set of taxon names forming one side of a split.
pub type LeafSet = BTreeSet<String>;

/// A bipartition of a tree's leaf-name set, annotated with a length
/// (interpretation chosen by [`LengthType`]) and a support value.
///
/// One side: anchored against the rest of the leaf set. Two sides: a full
/// unrooted bipartition; the *last* side is the subtree side when the
/// split was enumerated from a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    sides: Vec<LeafSet>,
    pub length: f64,
    pub length_type: LengthType,
    pub support: f64,
}

impl Split {
    /// An anchored split: one explicit side against everything else.
    pub fn anchored(
        side: impl IntoIterator<Item = impl Into<String>>,
        length: f64,
        length_type: LengthType,
        support: f64,
    ) -> Self {
        Split {
            sides: vec![side.into_iter().map(Into::into).collect()],
            length,
            length_type,
            support,
        }
    }

    /// A full two-sided unrooted split.
    pub fn bipartition(
        side1: impl IntoIterator<Item = impl Into<String>>,
        side2: impl IntoIterator<Item = impl Into<String>>,
        length: f64,
        length_type: LengthType,
        support: f64,
    ) -> Self {
        Split {
            sides: vec![
                side1.into_iter().map(Into::into).collect(),
                side2.into_iter().map(Into::into).collect(),
            ],
            length,
            length_type,
            support,
        }
    }

    pub fn sides(&self) -> &[LeafSet] {
        &self.sides
    }

    /// The side used for grouping during reconstruction: the subtree side
    /// of an enumerated split, or the only side of an anchored one.
    pub fn grouping_side(&self) -> &LeafSet {
        self.sides.last().expect("a split has at least one side")
    }

    /// Symmetric pairwise compatibility test; see the module docs.
    ///
    /// # Panics
    /// `unimplemented!` for splits with more than two sides; a known
    /// limitation, not a recoverable error.
    pub fn is_compatible_with(&self, other: &Split) -> bool {
        are_compatible(self, other)
    }
}

/// One-sided compatibility: the sides are disjoint or one contains the
/// other.
fn sides_compatible(a: &LeafSet, b: &LeafSet) -> bool {
    a.is_disjoint(b) || a.is_subset(b) || b.is_subset(a)
}

/// Whether two splits can coexist in a single tree.
///
/// A one-sided split must be compatible with *both* sides of a two-sided
/// one independently. Two two-sided splits are compatible iff at least one
/// of the four side pairings is disjoint.
///
/// # Panics
/// `unimplemented!` when either split has more than two sides.
pub fn are_compatible(a: &Split, b: &Split) -> bool {
    match (a.sides.len(), b.sides.len()) {
        (1, 1) => sides_compatible(&a.sides[0], &b.sides[0]),
        (1, 2) => b.sides.iter().all(|side| sides_compatible(&a.sides[0], side)),
        (2, 1) => a.sides.iter().all(|side| sides_compatible(&b.sides[0], side)),
        (2, 2) => a
            .sides
            .iter()
            .any(|x| b.sides.iter().any(|y| x.is_disjoint(y))),
        _ => unimplemented!("compatibility between splits with more than two sides"),
    }
}

/// Renders as sorted, comma-joined sides separated by `|`.
impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .sides
            .iter()
            .map(|side| side.iter().join(","))
            .join("|");
        write!(f, "{text}")
    }
}

impl Tree {
    /// The split induced by the edge above `node`: (everything else, this
    /// subtree's leaves), tagged with the node's edge length and support.
    ///
    /// The true root induces no edge: its split has an empty first side
    /// (or the [`ROOT_PLACEHOLDER`] when the root is binary, marking the
    /// tree as rooted) against every leaf, with length 0.
    pub fn split_of(&self, node: NodeId) -> Split {
        let all: LeafSet = self
            .leaf_names(self.root_id())
            .into_iter()
            .map(String::from)
            .collect();

        if node == self.root_id() {
            let marker: LeafSet = if self[node].children().len() == 2 {
                [ROOT_PLACEHOLDER.to_string()].into()
            } else {
                LeafSet::new()
            };
            return Split {
                sides: vec![marker, all],
                length: 0.0,
                length_type: LengthType::Length,
                support: self[node].support(),
            };
        }

        let below: LeafSet = self
            .leaf_names(node)
            .into_iter()
            .map(String::from)
            .collect();
        let rest: LeafSet = all.difference(&below).cloned().collect();
        Split {
            sides: vec![rest, below],
            length: self[node].length(),
            length_type: LengthType::Length,
            support: self[node].support(),
        }
    }

    /// One split per node of the tree, in pre-order.
    pub fn splits(&self) -> Vec<Split> {
        self.preorder(self.root_id())
            .map(|id| self.split_of(id))
            .collect()
    }
}

/// NaN-aware support tightening: the smaller of the two specified values.
fn min_support(a: f64, b: f64) -> f64 {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.min(b),
        (false, true) => a,
        (true, false) => b,
        (true, true) => f64::NAN,
    }
}

/// Reconstructs a tree from a list of pairwise-compatible splits.
///
/// # Precondition
/// The caller guarantees pairwise compatibility; the set is not
/// re-validated and the result on an incompatible set is unspecified.
///
/// # Algorithm
/// 1. Seed one leaf per singleton grouping side.
/// 2. For growing side size `k`, group currently-unparented nodes whose
///    leaf sets exactly cover a size-`k` grouping side under a new
///    internal node carrying the split's length and support. A side that
///    matches a single existing node instead folds into it: lengths are
///    summed (ages replaced) and the support tightens to the minimum.
/// 3. If every contributing split was age-typed, ages become branch
///    lengths (`node age − parent age`; the root's length becomes NaN).
/// 4. A root left with fewer than 3 children is unrooted when an unrooted
///    tree was requested.
pub fn build_tree(splits: &[Split], rooted: bool) -> Tree {
    let mut tree = Tree::new();
    if splits.is_empty() {
        return tree;
    }

    let mut free: Vec<NodeId> = Vec::new();
    let mut leaf_sets: HashMap<NodeId, LeafSet> = HashMap::new();

    let fold = |tree: &mut Tree, id: NodeId, split: &Split| {
        match split.length_type {
            LengthType::Length => {
                let merged = combined_length(tree[id].length(), split.length);
                tree[id].set_length(merged);
            }
            LengthType::Age => tree[id].set_length(split.length),
        }
        let support = min_support(tree[id].support(), split.support);
        tree[id].set_support(support);
    };

    // Seed leaves from singleton sides.
    for split in splits {
        let side = split.grouping_side();
        if side.len() != 1 || side.contains(ROOT_PLACEHOLDER) {
            continue;
        }
        let name = side.first().expect("singleton side");
        match free
            .iter()
            .find(|&&id| tree[id].name() == name.as_str())
            .copied()
        {
            Some(existing) => fold(&mut tree, existing, split),
            None => {
                let leaf = tree.add_detached();
                tree[leaf].set_name(name.clone());
                tree[leaf].set_length(split.length);
                tree[leaf].set_support(split.support);
                leaf_sets.insert(leaf, side.clone());
                free.push(leaf);
            }
        }
    }

    // Group by increasing side size.
    let max_size = splits
        .iter()
        .map(|split| split.grouping_side().len())
        .max()
        .unwrap_or(0);
    for size in 2..=max_size {
        for split in splits {
            let side = split.grouping_side();
            if side.len() != size {
                continue;
            }
            let members: Vec<NodeId> = free
                .iter()
                .copied()
                .filter(|id| leaf_sets[id].is_subset(side))
                .collect();
            let covered: LeafSet = members
                .iter()
                .flat_map(|id| leaf_sets[id].iter().cloned())
                .collect();
            if covered != *side {
                continue;
            }

            if members.len() == 1 {
                fold(&mut tree, members[0], split);
                continue;
            }

            let parent = tree.add_detached();
            tree[parent].set_length(split.length);
            tree[parent].set_support(split.support);
            for &member in &members {
                tree.set_parent(member, Some(parent));
                tree.push_child_link(parent, member);
            }
            free.retain(|id| !members.contains(id));
            leaf_sets.insert(parent, side.clone());
            free.push(parent);
        }
    }

    // Anchor the remaining free nodes.
    if free.len() == 1 {
        tree.set_root(free[0]);
    } else {
        let root = tree.root_id();
        for &id in &free {
            tree.set_parent(id, Some(root));
            tree.push_child_link(root, id);
        }
    }

    // Age-typed input: convert stored ages into branch lengths.
    if splits.iter().all(|split| split.length_type == LengthType::Age) {
        let ages: Vec<f64> = (0..tree.len()).map(|id| tree[id].length()).collect();
        for id in tree.subtree_ids(tree.root_id()) {
            match tree[id].parent() {
                Some(parent) => tree[id].set_length(ages[id] - ages[parent]),
                None => tree[id].set_length(f64::NAN),
            }
        }
    }

    if !rooted && tree.root().children().len() < 3 {
        tree = tree.unrooted();
    }
    tree
}
