//! Arena-based phylogenetic tree model.
//!
//! # Overview
//! A [`Tree`] stores all of its [`Node`]s in a contiguous arena and refers
//! to them by [`NodeId`] index. Parent and child links are indices into the
//! same arena, which sidesteps ownership cycles entirely: re-parenting a
//! subtree is an index edit, never a dangling reference.
//!
//! # Identity
//! A node's id is its arena slot, assigned monotonically at construction
//! and never reused. Cloning a whole `Tree` preserves every id, which is
//! what lets topology transforms locate a node "by identifier in the
//! working copy". Extracting a subtree into a fresh tree regenerates ids.
//!
//! # Detached nodes
//! Transform operations (unrooting, pruning) can leave nodes in the arena
//! that are no longer reachable from the root. Each such fragment stays
//! internally consistent: its parent/child links still agree, and it is
//! simply a second tree sharing the arena.

use crate::attributes::Attributes;
use std::fmt;

/// Index of a node in a tree arena.
pub type NodeId = usize;

/// A single tree node: ordered child indices, an optional parent index, and
/// an owned attribute store.
///
/// A node with no children is a leaf; the one reachable node with no parent
/// is the root. `Length` and `Support` describe the edge from this node up
/// to its parent and are conventionally `NaN` on the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Attributes,
}

impl Node {
    fn new(id: NodeId) -> Self {
        Node {
            id,
            parent: None,
            children: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Node label (reserved `Name` attribute, default `""`).
    pub fn name(&self) -> &str {
        self.attributes.name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.attributes.set_name(name);
    }

    /// Length of the edge to the parent (reserved `Length` attribute,
    /// default `NaN`, undefined for the root).
    pub fn length(&self) -> f64 {
        self.attributes.length()
    }

    pub fn set_length(&mut self, length: f64) {
        self.attributes.set_length(length);
    }

    /// Support of the edge to the parent (reserved `Support` attribute,
    /// default `NaN`).
    pub fn support(&self) -> f64 {
        self.attributes.support()
    }

    pub fn set_support(&mut self, support: f64) {
        self.attributes.set_support(support);
    }
}

/// A rooted (or unrooted-by-convention) leaf-labelled, edge-weighted tree.
///
/// Created with a single root node; grown by [`Tree::add_child`]. An
/// "unrooted" tree is represented as usual by a root with three or more
/// children, treated as a multifurcation with no temporal meaning.
///
/// # Example
/// ```
/// use phylotopo::Tree;
///
/// // ((A:1,B:1):1,C:2);
/// let mut tree = Tree::new();
/// let inner = tree.add_child(tree.root_id());
/// tree[inner].set_length(1.0);
/// let a = tree.add_child(inner);
/// tree[a].set_name("A");
/// tree[a].set_length(1.0);
/// let b = tree.add_child(inner);
/// tree[b].set_name("B");
/// tree[b].set_length(1.0);
/// let c = tree.add_child(tree.root_id());
/// tree[c].set_name("C");
/// tree[c].set_length(2.0);
///
/// assert!(tree.is_valid());
/// assert_eq!(tree.to_newick(), "((A:1,B:1):1,C:2);");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// Creates a tree consisting of a single root node with default
    /// attributes.
    pub fn new() -> Self {
        Tree {
            nodes: vec![Node::new(0)],
            root: 0,
        }
    }

    /// Appends a fresh node to the arena as the last child of `parent` and
    /// returns its id.
    pub fn add_child(&mut self, parent: NodeId) -> NodeId {
        let id = self.nodes.len();
        let mut node = Node::new(id);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    /// Appends a fresh detached node (no parent, no children) and returns
    /// its id. Used by transforms that build new roots.
    pub(crate) fn add_detached(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id));
        id
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &Node {
        &self.nodes[self.root]
    }

    /// Number of nodes in the arena, detached fragments included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node with the given id, or `None` if the id was never
    /// allocated in this arena.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.nodes[id].parent = parent;
    }

    /// Removes `child` from `parent`'s child list without touching the
    /// child's own parent link.
    pub(crate) fn remove_child_link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.retain(|&c| c != child);
    }

    pub(crate) fn push_child_link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.push(child);
    }

    /// Replaces `old` with `new` in `parent`'s child list, preserving the
    /// child position.
    pub(crate) fn replace_child_link(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        for child in &mut self.nodes[parent].children {
            if *child == old {
                *child = new;
            }
        }
    }

    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        self.nodes[id].children = children;
    }

    /// Validates the structural invariants of the arena:
    ///
    /// - the root has no parent,
    /// - every child points back to its parent and vice versa,
    /// - the subtree reachable from the root is acyclic (no node visited
    ///   twice).
    ///
    /// Detached fragments left behind by transforms are checked for link
    /// consistency but are allowed to exist.
    pub fn is_valid(&self) -> bool {
        if self.root >= self.nodes.len() || self.nodes[self.root].parent.is_some() {
            return false;
        }

        for (id, node) in self.nodes.iter().enumerate() {
            if node.id != id {
                return false;
            }
            for &child in &node.children {
                if child >= self.nodes.len() || self.nodes[child].parent != Some(id) {
                    return false;
                }
            }
            if let Some(parent) = node.parent {
                if parent >= self.nodes.len() || !self.nodes[parent].children.contains(&id) {
                    return false;
                }
            }
        }

        // Cycle check on the reachable component.
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if seen[id] {
                return false;
            }
            seen[id] = true;
            stack.extend_from_slice(&self.nodes[id].children);
        }

        true
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

impl std::ops::Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

impl std::ops::IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }
}

/// Default textual rendering: the Newick form of the tree.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_newick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_root_is_valid() {
        let tree = Tree::new();
        assert!(tree.is_valid());
        assert_eq!(tree.len(), 1);
        assert!(tree.root().is_leaf());
        assert!(tree.root().parent().is_none());
    }

    #[test]
    fn add_child_links_both_ways() {
        let mut tree = Tree::new();
        let a = tree.add_child(tree.root_id());
        let b = tree.add_child(tree.root_id());
        let c = tree.add_child(a);

        assert_eq!(tree.root().children(), &[a, b]);
        assert_eq!(tree[a].parent(), Some(tree.root_id()));
        assert_eq!(tree[c].parent(), Some(a));
        assert!(tree.is_valid());
    }

    #[test]
    fn clone_preserves_ids() {
        let mut tree = Tree::new();
        let a = tree.add_child(tree.root_id());
        tree[a].set_name("A");

        let copy = tree.clone();
        assert_eq!(copy[a].name(), "A");
        assert_eq!(copy[a].id(), a);
    }

    #[test]
    fn invalid_when_links_disagree() {
        let mut tree = Tree::new();
        let a = tree.add_child(tree.root_id());
        // Break the back-link on purpose.
        tree.set_parent(a, None);
        assert!(!tree.is_valid());
    }
}
