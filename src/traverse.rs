//! Read-only traversal and measurement over a tree.
//!
//! # Overview
//! Everything in this module walks a [`Tree`] without mutating it (the one
//! exception, [`Tree::sort_children`], reorders child lists in place but
//! changes no topology). Enumeration is always pre-order: a node first,
//! then each child subtree in order.
//!
//! Path-length queries treat a `NaN` branch length as "not specified",
//! never as zero: every sum skips unspecified lengths, so a partially
//! specified tree yields the total of the lengths it does carry.

use crate::error::TreeError;
use crate::tree::{NodeId, Tree};
use std::collections::HashSet;

/// Lazy pre-order iterator over a subtree.
///
/// Stack-based, single pass; the subtree root is yielded first. Obtained
/// from [`Tree::preorder`].
pub struct Preorder<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        // Push children in reverse so the first child is visited first.
        for &child in self.tree[id].children().iter().rev() {
            self.stack.push(child);
        }
        Some(id)
    }
}

/// Hint for [`Tree::path_length`] describing how the two query nodes are
/// related, when the caller already knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// Let the query figure the relationship out by membership tests.
    Unknown,
    /// The second node lies in the first node's subtree.
    SecondDescendsFromFirst,
    /// The first node lies in the second node's subtree.
    FirstDescendsFromSecond,
    /// Neither contains the other; the path runs through their last common
    /// ancestor.
    Disjoint,
}

/// Level counts used purely for deterministic aesthetic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Levels {
    /// Number of ancestors between this node and the root.
    pub above: usize,
    /// Longest chain of descendants below this node.
    pub below: usize,
    /// Depth, measured from the root, of the deepest node in this subtree.
    pub below_global: usize,
}

impl Tree {
    /// Lazy pre-order enumeration of the subtree rooted at `node`, `node`
    /// itself first.
    pub fn preorder(&self, node: NodeId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![node],
        }
    }

    /// Eager pre-order enumeration of the subtree rooted at `node`.
    pub fn subtree_ids(&self, node: NodeId) -> Vec<NodeId> {
        self.preorder(node).collect()
    }

    /// All leaves of the subtree rooted at `node`, in pre-order.
    pub fn leaves(&self, node: NodeId) -> Vec<NodeId> {
        self.preorder(node).filter(|&id| self[id].is_leaf()).collect()
    }

    /// Names of the named leaves of the subtree, in pre-order.
    pub fn leaf_names(&self, node: NodeId) -> Vec<&str> {
        self.leaves(node)
            .into_iter()
            .map(|id| self[id].name())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Names of every named node of the subtree (leaves and internals), in
    /// pre-order.
    pub fn node_names(&self, node: NodeId) -> Vec<&str> {
        self.preorder(node)
            .map(|id| self[id].name())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// First pre-order node in the subtree of `start` whose name matches.
    pub fn find_by_name(&self, start: NodeId, name: &str) -> Option<NodeId> {
        self.preorder(start).find(|&id| self[id].name() == name)
    }

    /// First pre-order node in the subtree of `start` with the given id,
    /// i.e. `Some(id)` iff `id` lies inside that subtree.
    pub fn find_by_id(&self, start: NodeId, id: NodeId) -> Option<NodeId> {
        self.preorder(start).find(|&candidate| candidate == id)
    }

    /// Sum of branch lengths from `node` up to, but excluding, the root's
    /// own length.
    pub fn upstream_length(&self, node: NodeId) -> f64 {
        let mut total = 0.0;
        let mut current = node;
        while let Some(parent) = self[current].parent() {
            let length = self[current].length();
            if length.is_finite() {
                total += length;
            }
            current = parent;
        }
        total
    }

    /// Longest root-to-tip path length through the subtree of `node`,
    /// measured from `node` (0 for a leaf).
    pub fn longest_downstream_length(&self, node: NodeId) -> f64 {
        self[node]
            .children()
            .iter()
            .map(|&child| {
                let edge = self[child].length();
                let edge = if edge.is_finite() { edge } else { 0.0 };
                edge + self.longest_downstream_length(child)
            })
            .fold(0.0, f64::max)
    }

    /// Shortest root-to-tip path length through the subtree of `node`
    /// (0 for a leaf).
    pub fn shortest_downstream_length(&self, node: NodeId) -> f64 {
        if self[node].is_leaf() {
            return 0.0;
        }
        self[node]
            .children()
            .iter()
            .map(|&child| {
                let edge = self[child].length();
                let edge = if edge.is_finite() { edge } else { 0.0 };
                edge + self.shortest_downstream_length(child)
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Sum of every specified edge length in the subtree, including the
    /// length of the edge above `node` itself.
    pub fn total_length(&self, node: NodeId) -> f64 {
        self.preorder(node)
            .map(|id| self[id].length())
            .filter(|length| length.is_finite())
            .sum()
    }

    /// Sum of specified branch lengths on the walk from `descendant` up
    /// to `ancestor` (the ancestor's own length is not included).
    ///
    /// # Errors
    /// [`TreeError::InvalidRelationship`] if the walk reaches a parentless
    /// node without passing through `ancestor`.
    fn length_to_ancestor(&self, descendant: NodeId, ancestor: NodeId) -> Result<f64, TreeError> {
        let mut total = 0.0;
        let mut current = descendant;
        while current != ancestor {
            let length = self[current].length();
            if length.is_finite() {
                total += length;
            }
            current = self[current]
                .parent()
                .ok_or(TreeError::InvalidRelationship(descendant, ancestor))?;
        }
        Ok(total)
    }

    /// Sum of branch lengths on the path between `a` and `b`.
    ///
    /// With [`Relationship::Unknown`] the relationship is resolved by
    /// membership tests; otherwise the hint is trusted and a wrong hint
    /// surfaces as an error. For disjoint nodes the path runs through
    /// their last common ancestor and is the sum of the two
    /// ancestor-directed walks.
    ///
    /// # Errors
    /// [`TreeError::InvalidRelationship`] when the nodes do not belong to
    /// the same connected tree, or when a claimed ancestor/descendant
    /// direction does not hold.
    pub fn path_length(&self, a: NodeId, b: NodeId, hint: Relationship) -> Result<f64, TreeError> {
        let relationship = match hint {
            Relationship::Unknown => {
                if self.find_by_id(a, b).is_some() {
                    Relationship::SecondDescendsFromFirst
                } else if self.find_by_id(b, a).is_some() {
                    Relationship::FirstDescendsFromSecond
                } else {
                    Relationship::Disjoint
                }
            }
            known => known,
        };

        match relationship {
            Relationship::SecondDescendsFromFirst => self.length_to_ancestor(b, a),
            Relationship::FirstDescendsFromSecond => self.length_to_ancestor(a, b),
            Relationship::Disjoint => {
                let ancestor = self
                    .last_common_ancestor(&[a, b])
                    .ok_or(TreeError::InvalidRelationship(a, b))?;
                Ok(self.length_to_ancestor(a, ancestor)? + self.length_to_ancestor(b, ancestor)?)
            }
            Relationship::Unknown => unreachable!("resolved above"),
        }
    }

    /// Heuristic clock-likeness test: `true` iff every leaf's upstream
    /// length is within *relative* `tolerance` of the first leaf's, i.e.
    /// `|len − first| / first ≤ tolerance`. Trees with at most one leaf
    /// are trivially clock-like. This is a tolerance test, not an exact
    /// equality: use it to decide whether a tree can be drawn against a
    /// shared time axis, not to compare topologies.
    pub fn is_clock_like(&self, tolerance: f64) -> bool {
        let leaves = self.leaves(self.root_id());
        let Some((&first, rest)) = leaves.split_first() else {
            return true;
        };
        let reference = self.upstream_length(first);
        for &leaf in rest {
            let length = self.upstream_length(leaf);
            if reference == 0.0 {
                if length != 0.0 {
                    return false;
                }
            } else if ((length - reference) / reference).abs() > tolerance {
                return false;
            }
        }
        true
    }

    /// Level counts for `node`: ancestors above, longest descendant chain
    /// below, and the global depth of the subtree's deepest node. Only used
    /// to produce a deterministic visual ordering.
    pub fn levels(&self, node: NodeId) -> Levels {
        let mut above = 0;
        let mut current = node;
        while let Some(parent) = self[current].parent() {
            above += 1;
            current = parent;
        }
        let below = self.depth_below(node);
        Levels {
            above,
            below,
            below_global: above + below,
        }
    }

    fn depth_below(&self, node: NodeId) -> usize {
        self[node]
            .children()
            .iter()
            .map(|&child| 1 + self.depth_below(child))
            .max()
            .unwrap_or(0)
    }

    /// Lexicographically smallest leaf name in the subtree, used as the
    /// sort tie-breaker. Empty when the subtree has no named leaf.
    fn first_sorted_leaf_name(&self, node: NodeId) -> &str {
        self.leaf_names(node).into_iter().min().unwrap_or("")
    }

    /// Recursively sorts every child list into a total, deterministic
    /// order independent of input order: by subtree depth first, then by
    /// the first leaf name in sorted order on ties. `descending` flips the
    /// whole order.
    pub fn sort_children(&mut self, descending: bool) {
        let order = self.subtree_ids(self.root_id());
        for id in order {
            let mut children = self[id].children().to_vec();
            children.sort_by(|&x, &y| {
                let key_x = (self.depth_below(x), self.first_sorted_leaf_name(x));
                let key_y = (self.depth_below(y), self.first_sorted_leaf_name(y));
                key_x.cmp(&key_y)
            });
            if descending {
                children.reverse();
            }
            self.set_children(id, children);
        }
    }

    /// Last common ancestor of a set of nodes: starting from the first
    /// node, walks upward until the visited subtree contains every target.
    /// `None` when the targets are not all in the subtree of any single
    /// ancestor (e.g. a target sits in a detached fragment).
    pub fn last_common_ancestor(&self, nodes: &[NodeId]) -> Option<NodeId> {
        let (&seed, _) = nodes.split_first()?;
        let targets: HashSet<NodeId> = nodes.iter().copied().collect();
        let mut current = seed;
        loop {
            let covered: HashSet<NodeId> = self.preorder(current).collect();
            if targets.is_subset(&covered) {
                return Some(current);
            }
            current = self[current].parent()?;
        }
    }

    /// Last common ancestor of a set of node names, resolved through the
    /// subtree's name set. `None` when the tree does not contain all
    /// targets.
    pub fn last_common_ancestor_of_names(&self, names: &[&str]) -> Option<NodeId> {
        let (&first, _) = names.split_first()?;
        let targets: HashSet<&str> = names.iter().copied().collect();
        let mut current = self.find_by_name(self.root_id(), first)?;
        loop {
            let covered: HashSet<&str> = self
                .preorder(current)
                .map(|id| self[id].name())
                .filter(|name| !name.is_empty())
                .collect();
            if targets.is_subset(&covered) {
                return Some(current);
            }
            current = self[current].parent()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::parse_newick;

    fn sample() -> Tree {
        // ((A:1,B:1):1,C:2);
        parse_newick("((A:1,B:1):1,C:2);").unwrap()
    }

    #[test]
    fn preorder_yields_node_first() {
        let tree = sample();
        let ids = tree.subtree_ids(tree.root_id());
        assert_eq!(ids[0], tree.root_id());
        assert_eq!(ids.len(), 5);

        let names: Vec<&str> = ids.iter().map(|&id| tree[id].name()).collect();
        assert_eq!(names, vec!["", "", "A", "B", "C"]);
    }

    #[test]
    fn lazy_and_eager_agree() {
        let tree = sample();
        let lazy: Vec<NodeId> = tree.preorder(tree.root_id()).collect();
        assert_eq!(lazy, tree.subtree_ids(tree.root_id()));
    }

    #[test]
    fn leaf_names_preorder() {
        let tree = sample();
        assert_eq!(tree.leaf_names(tree.root_id()), vec!["A", "B", "C"]);
    }

    #[test]
    fn find_by_name_first_match() {
        let tree = sample();
        let a = tree.find_by_name(tree.root_id(), "A").unwrap();
        assert_eq!(tree[a].name(), "A");
        assert!(tree.find_by_name(tree.root_id(), "Z").is_none());
    }

    #[test]
    fn upstream_and_downstream_lengths() {
        let tree = sample();
        let a = tree.find_by_name(tree.root_id(), "A").unwrap();
        let c = tree.find_by_name(tree.root_id(), "C").unwrap();

        assert_eq!(tree.upstream_length(a), 2.0);
        assert_eq!(tree.upstream_length(c), 2.0);
        assert_eq!(tree.longest_downstream_length(tree.root_id()), 2.0);
        assert_eq!(tree.shortest_downstream_length(tree.root_id()), 2.0);
        assert_eq!(tree.total_length(tree.root_id()), 5.0);
    }

    #[test]
    fn path_lengths() {
        let tree = sample();
        let a = tree.find_by_name(tree.root_id(), "A").unwrap();
        let b = tree.find_by_name(tree.root_id(), "B").unwrap();
        let c = tree.find_by_name(tree.root_id(), "C").unwrap();

        assert_eq!(tree.path_length(a, b, Relationship::Unknown).unwrap(), 2.0);
        assert_eq!(tree.path_length(a, c, Relationship::Unknown).unwrap(), 4.0);
        assert_eq!(
            tree.path_length(tree.root_id(), a, Relationship::Unknown)
                .unwrap(),
            2.0
        );
        // Hints give the same answer as resolution from scratch.
        assert_eq!(tree.path_length(a, c, Relationship::Disjoint).unwrap(), 4.0);
    }

    #[test]
    fn path_length_skips_unspecified_lengths() {
        // B's edge and the inner edge carry no length; only the specified
        // edges count, and the answer agrees with the distance matrix.
        let tree = parse_newick("((A:1,B),C:2);").unwrap();
        let a = tree.find_by_name(tree.root_id(), "A").unwrap();
        let b = tree.find_by_name(tree.root_id(), "B").unwrap();
        let c = tree.find_by_name(tree.root_id(), "C").unwrap();

        assert_eq!(tree.path_length(a, b, Relationship::Unknown).unwrap(), 1.0);
        assert_eq!(tree.path_length(b, c, Relationship::Unknown).unwrap(), 2.0);

        let matrix = crate::distance::distance_matrix(&tree, 1, None);
        assert_eq!(matrix.get(1, 0), 1.0);
        assert_eq!(matrix.get(2, 1), 2.0);
    }

    #[test]
    fn path_length_across_fragments_fails() {
        let mut tree = sample();
        let a = tree.find_by_name(tree.root_id(), "A").unwrap();
        let c = tree.find_by_name(tree.root_id(), "C").unwrap();
        tree.prune(c, false);

        assert_eq!(
            tree.path_length(a, c, Relationship::Unknown),
            Err(crate::TreeError::InvalidRelationship(a, c))
        );
    }

    #[test]
    fn path_containment() {
        // Upstream of any node plus its own longest downstream never
        // exceeds the tree's longest root-to-tip path.
        let tree = parse_newick("(((A:1,B:4):2,C:1):1,(D:3,E:1):2);").unwrap();
        let longest = tree.longest_downstream_length(tree.root_id());
        for id in tree.subtree_ids(tree.root_id()) {
            let through = tree.upstream_length(id) + tree.longest_downstream_length(id);
            assert!(through <= longest + 1e-12);
        }
    }

    #[test]
    fn clock_like_tolerance_is_relative() {
        let clock = parse_newick("((A:1,B:1):1,C:2);").unwrap();
        assert!(clock.is_clock_like(1e-9));

        let skewed = parse_newick("((A:1,B:2):1,C:2);").unwrap();
        assert!(!skewed.is_clock_like(0.1));
        // B's path is 3 against a reference of 2: 50% off.
        assert!(skewed.is_clock_like(0.5));
    }

    #[test]
    fn levels_triple() {
        let tree = sample();
        let a = tree.find_by_name(tree.root_id(), "A").unwrap();
        let levels = tree.levels(a);
        assert_eq!(levels, Levels { above: 2, below: 0, below_global: 2 });
        assert_eq!(tree.levels(tree.root_id()).below, 2);
    }

    #[test]
    fn sort_children_is_deterministic() {
        let mut left = parse_newick("(C:2,(B:1,A:1):1);").unwrap();
        let mut right = parse_newick("((A:1,B:1):1,C:2);").unwrap();
        left.sort_children(false);
        right.sort_children(false);
        assert_eq!(left.to_newick(), right.to_newick());

        left.sort_children(true);
        assert_eq!(left.to_newick(), "((B:1,A:1):1,C:2);");
    }

    #[test]
    fn last_common_ancestor_by_name() {
        let tree = parse_newick("(((A,B)ab,C)abc,D);").unwrap();
        let ab = tree.last_common_ancestor_of_names(&["A", "B"]).unwrap();
        assert_eq!(tree[ab].name(), "ab");
        let abd = tree.last_common_ancestor_of_names(&["A", "D"]).unwrap();
        assert_eq!(abd, tree.root_id());
        assert!(tree.last_common_ancestor_of_names(&["A", "Z"]).is_none());
    }
}
