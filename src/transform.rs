//! Structural surgery on trees: cloning, unrooting, rerooting, pruning.
//!
//! # Overview
//! All transforms here work on the arena: re-parenting a subtree is an
//! index edit, and nodes cut away by an operation stay behind in the arena
//! as internally consistent detached fragments. Operations that return a
//! new tree (`unrooted`, `rerooted`) work on a whole-arena clone, so node
//! ids carry over from the input and can be used to address nodes in the
//! result.
//!
//! # Rerooting in one picture
//! ```text
//!   before                     after rerooted(C, 0.5)
//!        r                            R'
//!       / \                          /  \
//!      x   D          C:0.5 ────────┘    └──────── x:0.5
//!     / \                                         / | \
//!    C   AB                    (inverted)       AB  r   (D kept under r)
//! ```
//! The edge above the outgroup is cut at the fractional position; the
//! ancestor chain above it is inverted in place, each edge keeping its
//! length while swapping which endpoint stores it.

use crate::tree::{NodeId, Tree};

/// NaN-aware edge-length sum: both specified → their sum, one specified →
/// that one, neither → NaN.
pub(crate) fn combined_length(a: f64, b: f64) -> f64 {
    match (a.is_finite(), b.is_finite()) {
        (true, true) => a + b,
        (true, false) => a,
        (false, true) => b,
        (false, false) => f64::NAN,
    }
}

impl Tree {
    /// Deep copy of the subtree rooted at `node` into a fresh tree with
    /// regenerated ids. Attributes are copied wholesale; the copy's root
    /// keeps the original node's `Length`, so callers grafting it
    /// elsewhere must correct it themselves.
    ///
    /// A whole-tree [`Clone`] preserves ids; this does not.
    pub fn extract_subtree(&self, node: NodeId) -> Tree {
        let mut out = Tree::new();
        let root = out.root_id();
        *out[root].attributes_mut() = self[node].attributes().clone();
        self.copy_children_into(node, &mut out, root);
        out
    }

    fn copy_children_into(&self, source: NodeId, out: &mut Tree, target: NodeId) {
        for &child in self[source].children() {
            let copy = out.add_child(target);
            *out[copy].attributes_mut() = self[child].attributes().clone();
            self.copy_children_into(child, out, copy);
        }
    }

    /// Returns an unrooted-by-convention copy of this tree.
    ///
    /// A root with three or more children is already unrooted and comes
    /// back as a plain clone. A binary root is dissolved by grafting one
    /// child subtree onto the other: the survivor becomes the new root
    /// (inheriting the old root's name and losing its own length) and its
    /// sibling is attached below it with the sum of the two original edge
    /// lengths. By default child 0 is grafted onto child 1; roles swap
    /// when child 1 is a leaf and child 0 is not, so the new root never
    /// sits at a leaf while an internal anchor is available.
    pub fn unrooted(&self) -> Tree {
        let mut tree = self.clone();
        let root = tree.root_id();
        let children = tree[root].children().to_vec();
        if children.len() != 2 {
            return tree;
        }

        let (grafted, survivor) = if tree[children[1]].is_leaf() && !tree[children[0]].is_leaf() {
            (children[1], children[0])
        } else {
            (children[0], children[1])
        };
        let merged = combined_length(tree[grafted].length(), tree[survivor].length());
        let root_name = tree[root].name().to_string();

        tree.set_children(root, Vec::new());
        tree.set_parent(survivor, None);
        tree.set_parent(grafted, Some(survivor));
        tree.push_child_link(survivor, grafted);
        tree[grafted].set_length(merged);
        tree[survivor].set_name(root_name);
        tree[survivor].set_length(f64::NAN);
        tree.set_root(survivor);
        tree
    }

    /// Inverts the ancestor chain of `node` after detaching `excluded`
    /// from it: every ancestor up to the root becomes a descendant of
    /// `node`, each inverted edge keeping its length while swapping which
    /// endpoint stores it. All other attributes stay with their nodes.
    /// Afterwards `node` is parentless and ready to be re-attached.
    fn invert_above(&mut self, node: NodeId, excluded: NodeId) {
        self.remove_child_link(node, excluded);

        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = self[current].parent() {
            chain.push(parent);
            current = parent;
        }
        let lengths: Vec<f64> = chain.iter().map(|&id| self[id].length()).collect();

        for pair in chain.windows(2) {
            let (child, parent) = (pair[0], pair[1]);
            self.remove_child_link(parent, child);
            self.push_child_link(child, parent);
            self.set_parent(parent, Some(child));
        }
        for (i, &id) in chain.iter().enumerate().skip(1) {
            self[id].set_length(lengths[i - 1]);
        }
        self.set_parent(node, None);
    }

    /// Reroots the tree on the edge above `outgroup`, placing the new root
    /// at fractional `position` (clamped to [0,1]) from the outgroup
    /// toward its old parent.
    ///
    /// The tree is unrooted first if needed. The result's root is a fresh
    /// node with two children: the outgroup subtree, with length
    /// `position × edge`, and the inverted remainder of the tree, with
    /// length `edge − position × edge`.
    ///
    /// Requesting an outgroup that is absent from the working copy, or
    /// that already is its root, is not an error: the result degrades to
    /// an unmodified clone.
    pub fn rerooted(&self, outgroup: NodeId, position: f64) -> Tree {
        let mut tree = self.unrooted();
        let root = tree.root_id();
        if outgroup >= tree.len() || outgroup == root || tree.find_by_id(root, outgroup).is_none() {
            return self.clone();
        }

        let position = position.clamp(0.0, 1.0);
        let edge = tree[outgroup].length();
        let split = position * edge;
        // Reachable and not the root, so a parent exists.
        let parent = tree[outgroup].parent().expect("non-root node has a parent");

        tree.invert_above(parent, outgroup);

        let new_root = tree.add_detached();
        tree.set_parent(outgroup, Some(new_root));
        tree.push_child_link(new_root, outgroup);
        tree[outgroup].set_length(split);
        tree.set_parent(parent, Some(new_root));
        tree.push_child_link(new_root, parent);
        tree[parent].set_length(edge - split);
        tree.set_root(new_root);
        tree
    }

    /// Detaches `node` from its parent, leaving it behind as a consistent
    /// fragment, and returns the (possibly new) root of the remaining
    /// tree. Callers must always use the return value: collapsing can move
    /// the root.
    ///
    /// When the parent is left with a single child and
    /// `leave_parent_if_degree_two` is `false`, the parent is collapsed:
    /// its remaining child is spliced into the grandparent's child list
    /// with the sum of the two collapsed edge lengths. A collapsed root
    /// instead makes its remaining child the new parentless root,
    /// inheriting the old root's length when that is positive.
    pub fn prune(&mut self, node: NodeId, leave_parent_if_degree_two: bool) -> NodeId {
        let Some(parent) = self[node].parent() else {
            return self.root_id();
        };
        self.remove_child_link(parent, node);
        self.set_parent(node, None);

        if !leave_parent_if_degree_two && self[parent].children().len() == 1 {
            let child = self[parent].children()[0];
            match self[parent].parent() {
                Some(grand) => {
                    let merged = combined_length(self[child].length(), self[parent].length());
                    self.replace_child_link(grand, parent, child);
                    self.set_parent(child, Some(grand));
                    self[child].set_length(merged);
                }
                None => {
                    // The root itself dropped to degree 1.
                    self.set_parent(child, None);
                    let root_length = self[parent].length();
                    if root_length.is_finite() && root_length > 0.0 {
                        let merged = combined_length(self[child].length(), root_length);
                        self[child].set_length(merged);
                    }
                    self.set_root(child);
                }
            }
            self.set_children(parent, Vec::new());
            self.set_parent(parent, None);
        }

        self.root_id()
    }
}
