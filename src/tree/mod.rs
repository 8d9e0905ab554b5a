//! Arena-based tree model.
//!
//! A [`Tree`] owns a flat table of node records; [`NodeId`] is an index into
//! that table, and parent/child links are ids rather than owning pointers.
//! This keeps navigation O(1) in both directions without reference cycles.
//!
//! Weights and signatures are memoized per node in an explicit table and
//! invalidated whenever children, attributes, or values change: weights are
//! cleared on the node and every ancestor, signatures on the node and every
//! descendant (a signature encodes the path from the root, so it goes stale
//! downward, not upward).

mod memo;
mod node;

pub use node::{NodeData, NodeKind};

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::options::MatchOptions;
use crate::signature::{self, Signature};

use memo::MemoTable;

/// Index of a node in a [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    /// Returns the arena index of this id.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct NodeRecord {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An arena of nodes forming one document tree.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<NodeRecord>,
    root: NodeId,
    memo: MemoTable,
}

impl Tree {
    /// Creates a tree whose root holds the given data.
    pub fn new(root: NodeData) -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            root: NodeId(0),
            memo: MemoTable::new(),
        };
        tree.root = tree.new_node(root);
        tree
    }

    /// Returns the root id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the number of nodes in the arena, detached nodes included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Allocates a detached node and returns its id.
    pub fn new_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeRecord {
            data,
            parent: None,
            children: Vec::new(),
        });
        self.memo.ensure_len(self.nodes.len());
        id
    }

    /// Allocates a node and appends it to `parent`'s children.
    pub fn add_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let child = self.new_node(data);
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
        self.touch(parent);
        self.touch(child);
        child
    }

    /// Attaches a detached node to the end of `parent`'s children.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let position = self.children(parent).len();
        self.insert_child(parent, position, child)
    }

    /// Attaches a detached node at the given child position.
    pub fn insert_child(&mut self, parent: NodeId, position: usize, child: NodeId) -> Result<()> {
        if self.nodes[child.index()].parent.is_some() {
            return Err(Error::AlreadyAttached(child));
        }
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(Error::WouldCycle(child));
        }
        let len = self.nodes[parent.index()].children.len();
        if position > len {
            return Err(Error::InvalidPosition { position, len });
        }
        self.nodes[parent.index()].children.insert(position, child);
        self.nodes[child.index()].parent = Some(parent);
        self.touch(parent);
        self.touch(child);
        Ok(())
    }

    /// Detaches and returns the child at the given position.
    ///
    /// The detached subtree stays in the arena and can be re-attached.
    pub fn remove_child(&mut self, parent: NodeId, position: usize) -> Result<NodeId> {
        let len = self.nodes[parent.index()].children.len();
        if position >= len {
            return Err(Error::InvalidPosition { position, len });
        }
        let child = self.nodes[parent.index()].children.remove(position);
        self.nodes[child.index()].parent = None;
        self.touch(parent);
        self.touch(child);
        Ok(child)
    }

    /// Replaces the child at the given position with a detached node,
    /// returning the displaced (now detached) child.
    pub fn replace_child(&mut self, parent: NodeId, position: usize, child: NodeId) -> Result<NodeId> {
        if self.nodes[child.index()].parent.is_some() {
            return Err(Error::AlreadyAttached(child));
        }
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(Error::WouldCycle(child));
        }
        let len = self.nodes[parent.index()].children.len();
        if position >= len {
            return Err(Error::InvalidPosition { position, len });
        }
        let old = self.nodes[parent.index()].children[position];
        self.nodes[parent.index()].children[position] = child;
        self.nodes[old.index()].parent = None;
        self.nodes[child.index()].parent = Some(parent);
        self.touch(parent);
        self.touch(old);
        self.touch(child);
        Ok(old)
    }

    /// Sets the scalar value of a node.
    pub fn set_value(&mut self, id: NodeId, value: Option<String>) {
        self.nodes[id.index()].data.set_value(value);
        self.touch(id);
    }

    /// Replaces the attribute list of a node.
    pub fn set_attributes(&mut self, id: NodeId, attributes: Vec<(String, String)>) {
        self.nodes[id.index()].data.set_attributes(attributes);
        self.touch(id);
    }

    /// Returns the payload of a node.
    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()].data
    }

    /// Returns the label of a node.
    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.data(id).label()
    }

    /// Returns the scalar value of a node.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.data(id).value()
    }

    /// Returns the attributes of a node in insertion order.
    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.data(id).attributes()
    }

    /// Returns the external stable identifier of a node.
    pub fn xid(&self, id: NodeId) -> Option<&str> {
        self.data(id).xid()
    }

    /// Returns the kind of a node.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.data(id).kind()
    }

    /// Returns the parent of a node, `None` for the root and detached nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Returns the children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Returns the position of a node among its parent's children.
    pub fn child_position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Returns the siblings of a node, excluding the node itself.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(parent) => self
                .children(parent)
                .iter()
                .copied()
                .filter(|&c| c != id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children(id).is_empty()
    }

    /// Returns true if the node is a text node: a leaf with a value and no
    /// attributes.
    pub fn is_text(&self, id: NodeId) -> bool {
        self.is_leaf(id) && self.value(id).is_some() && self.attributes(id).is_empty()
    }

    /// Returns the depth of a node; the root is at depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Returns the height of a node's subtree; leaves have height 0.
    pub fn height(&self, id: NodeId) -> usize {
        // Post-order over an explicit stack; child heights land in `done`
        // before their parent is finalized.
        let mut done: rustc_hash::FxHashMap<NodeId, usize> = rustc_hash::FxHashMap::default();
        let mut stack = vec![(id, false)];
        while let Some((n, expanded)) = stack.pop() {
            if expanded {
                let h = self
                    .children(n)
                    .iter()
                    .map(|c| done.get(c).copied().unwrap_or(0) + 1)
                    .max()
                    .unwrap_or(0);
                done.insert(n, h);
            } else {
                stack.push((n, true));
                for &c in self.children(n) {
                    stack.push((c, false));
                }
            }
        }
        done.get(&id).copied().unwrap_or(0)
    }

    /// Returns the number of nodes in a subtree, the subtree root included.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.descendants(id).count()
    }

    /// Iterates the ancestor chain, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: self.parent(id),
        }
    }

    /// Iterates the subtree rooted at `id` in preorder, `id` included.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Iterates the whole tree in preorder from the root.
    pub fn preorder(&self) -> Descendants<'_> {
        self.descendants(self.root)
    }

    /// Returns the ancestor of `id` sitting at the given depth, or `id`
    /// itself when `depth` equals its own depth.
    pub(crate) fn ancestor_at_depth(&self, id: NodeId, depth: usize) -> Option<NodeId> {
        let own = self.depth(id);
        if depth > own {
            return None;
        }
        let mut current = id;
        for _ in 0..(own - depth) {
            current = self.parent(current)?;
        }
        Some(current)
    }

    /// Returns a human-readable path for a node, `/article/section[2]/p`
    /// style. Positions appear only where same-labeled siblings make them
    /// necessary.
    pub fn node_path(&self, id: NodeId) -> String {
        let mut ids: Vec<NodeId> = self.ancestors(id).collect();
        ids.reverse();
        ids.push(id);

        let mut path = String::new();
        for n in ids {
            let component = self.label(n).unwrap_or(crate::constants::TEXT_COMPONENT);
            path.push('/');
            path.push_str(component);
            if let Some(parent) = self.parent(n) {
                let peers: Vec<NodeId> = self
                    .children(parent)
                    .iter()
                    .copied()
                    .filter(|&c| self.label(c).unwrap_or(crate::constants::TEXT_COMPONENT) == component)
                    .collect();
                if peers.len() > 1 {
                    if let Some(pos) = peers.iter().position(|&c| c == n) {
                        path.push('[');
                        path.push_str(&(pos + 1).to_string());
                        path.push(']');
                    }
                }
            }
        }
        path
    }

    /// Concatenates the values in a subtree in document order, separated by
    /// single spaces.
    pub fn subtree_text(&self, id: NodeId) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for n in self.descendants(id) {
            if let Some(v) = self.value(n) {
                if !v.is_empty() {
                    parts.push(v);
                }
            }
        }
        parts.join(" ")
    }

    /// Returns the weight of a node's subtree.
    ///
    /// A leaf with text weighs `1 + ln(len + 1)`, an empty leaf exactly 1;
    /// a node with children weighs one plus the sum of their weights.
    /// Results are memoized and invalidated by [`Tree::touch`].
    pub fn weight(&self, id: NodeId) -> f64 {
        if let Some(w) = self.memo.weight(id) {
            return w;
        }
        let mut stack = vec![(id, false)];
        while let Some((n, expanded)) = stack.pop() {
            if self.memo.weight(n).is_some() {
                continue;
            }
            if expanded {
                let children = self.children(n);
                let w = if children.is_empty() {
                    // A leaf with text weighs by its length; an empty leaf
                    // weighs exactly 1 (ln 1 = 0).
                    let len = self.value(n).map(|v| v.chars().count()).unwrap_or(0);
                    1.0 + ((len + 1) as f64).ln()
                } else {
                    1.0 + children
                        .iter()
                        .map(|c| self.memo.weight(*c).unwrap_or(1.0))
                        .sum::<f64>()
                };
                self.memo.store_weight(n, w);
            } else {
                stack.push((n, true));
                for &c in self.children(n) {
                    stack.push((c, false));
                }
            }
        }
        self.memo.weight(id).unwrap_or(1.0)
    }

    /// Returns the attribute-aware signature of a node, memoized under the
    /// given options.
    pub fn signature(&self, id: NodeId, options: &MatchOptions) -> Rc<Signature> {
        let stamp = options.signature_stamp();
        if let Some(sig) = self.memo.signature(id, stamp) {
            return sig;
        }
        let sig = Rc::new(signature::compute(self, id, true, options));
        self.memo.store_signature(id, stamp, sig.clone());
        sig
    }

    /// Computes the attribute-insensitive signature of a node on demand.
    ///
    /// Never cached: approximate-matching phases that only need structural
    /// shape must not displace the attribute-aware entries.
    pub fn structural_signature(&self, id: NodeId, options: &MatchOptions) -> Signature {
        signature::compute(self, id, false, options)
    }

    /// Invalidates cached metrics after a mutation at `id`: weights on the
    /// node and every ancestor, signatures on the node and every descendant.
    pub(crate) fn touch(&self, id: NodeId) {
        let mut current = Some(id);
        while let Some(n) = current {
            self.memo.clear_weight(n);
            current = self.parent(n);
        }
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            self.memo.clear_signature(n);
            stack.extend(self.children(n).iter().copied());
        }
    }
}

/// Iterator over a node's ancestor chain, nearest first.
pub struct Ancestors<'a> {
    tree: &'a Tree,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

/// Preorder iterator over a subtree.
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        for &c in self.tree.children(id).iter().rev() {
            self.stack.push(c);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        // root -> (a -> leaf, b)
        let mut tree = Tree::new(NodeData::element("root"));
        let a = tree.add_child(tree.root(), NodeData::element("a"));
        let b = tree.add_child(tree.root(), NodeData::element("b"));
        let leaf = tree.add_child(a, NodeData::text("hi"));
        (tree, a, b, leaf)
    }

    #[test]
    fn test_navigation() {
        let (tree, a, b, leaf) = sample();
        assert_eq!(tree.parent(tree.root()), None);
        assert_eq!(tree.parent(leaf), Some(a));
        assert_eq!(tree.children(tree.root()), &[a, b]);
        assert_eq!(tree.child_position(b), Some(1));
        assert_eq!(tree.siblings(a), vec![b]);
        assert_eq!(tree.depth(leaf), 2);
        assert_eq!(tree.height(tree.root()), 2);
        assert_eq!(tree.height(leaf), 0);
        assert_eq!(tree.subtree_size(tree.root()), 4);
        assert_eq!(tree.subtree_size(b), 1);
    }

    #[test]
    fn test_preorder_order() {
        let (tree, a, b, leaf) = sample();
        let order: Vec<NodeId> = tree.preorder().collect();
        assert_eq!(order, vec![tree.root(), a, leaf, b]);
    }

    #[test]
    fn test_is_text() {
        let (tree, a, _, leaf) = sample();
        assert!(tree.is_text(leaf));
        assert!(!tree.is_text(a));

        let mut attrs = Tree::new(NodeData::element("r"));
        let n = attrs.add_child(
            attrs.root(),
            NodeData::text("v").with_attribute("k", "v"),
        );
        assert!(!attrs.is_text(n));
    }

    #[test]
    fn test_attach_rejects_attached_node() {
        let (mut tree, a, b, _) = sample();
        assert_eq!(tree.attach(b, a), Err(Error::AlreadyAttached(a)));
    }

    #[test]
    fn test_attach_rejects_cycle() {
        let (mut tree, a, _, _) = sample();
        let root = tree.root();
        let detached = tree.remove_child(root, 0).unwrap();
        assert_eq!(detached, a);
        // Attaching the old root beneath its former child would cycle only
        // if root were detached under a; here attach a under a's own leaf.
        let leaf = tree.children(a)[0];
        assert_eq!(tree.attach(leaf, a), Err(Error::WouldCycle(a)));
        assert_eq!(tree.attach(a, a), Err(Error::WouldCycle(a)));
    }

    #[test]
    fn test_insert_and_remove_child() {
        let (mut tree, _, b, _) = sample();
        let root = tree.root();
        let c = tree.new_node(NodeData::element("c"));
        tree.insert_child(root, 1, c).unwrap();
        assert_eq!(tree.child_position(c), Some(1));
        assert_eq!(tree.child_position(b), Some(2));

        let removed = tree.remove_child(root, 1).unwrap();
        assert_eq!(removed, c);
        assert_eq!(tree.parent(c), None);
        assert_eq!(tree.child_position(b), Some(1));

        assert!(matches!(
            tree.remove_child(root, 9),
            Err(Error::InvalidPosition { position: 9, .. })
        ));
    }

    #[test]
    fn test_replace_child() {
        let (mut tree, a, _, _) = sample();
        let root = tree.root();
        let c = tree.new_node(NodeData::element("c"));
        let old = tree.replace_child(root, 0, c).unwrap();
        assert_eq!(old, a);
        assert_eq!(tree.parent(a), None);
        assert_eq!(tree.children(root)[0], c);
    }

    #[test]
    fn test_weight_formula() {
        let (tree, a, b, leaf) = sample();
        // Childless element weighs exactly 1.
        assert_eq!(tree.weight(b), 1.0);
        // Text leaf: 1 + ln(2 + 1).
        let expected_leaf = 1.0 + 3.0_f64.ln();
        assert!((tree.weight(leaf) - expected_leaf).abs() < 1e-9);
        // Element: 1 + sum of children.
        assert!((tree.weight(a) - (1.0 + expected_leaf)).abs() < 1e-9);
        assert!(
            (tree.weight(tree.root()) - (1.0 + tree.weight(a) + tree.weight(b))).abs() < 1e-9
        );
    }

    #[test]
    fn test_weight_invalidated_on_value_change() {
        let (mut tree, _, _, leaf) = sample();
        let before = tree.weight(tree.root());
        tree.set_value(leaf, Some("a much longer text value".to_string()));
        let after = tree.weight(tree.root());
        assert!(after > before);
    }

    #[test]
    fn test_empty_text_leaf_weight() {
        let mut tree = Tree::new(NodeData::element("r"));
        let empty = tree.add_child(tree.root(), NodeData::text(""));
        assert_eq!(tree.weight(empty), 1.0);
    }

    #[test]
    fn test_node_path() {
        let mut tree = Tree::new(NodeData::element("doc"));
        let s1 = tree.add_child(tree.root(), NodeData::element("sec"));
        let s2 = tree.add_child(tree.root(), NodeData::element("sec"));
        let p = tree.add_child(s2, NodeData::element("p"));
        let t = tree.add_child(p, NodeData::text("x"));

        assert_eq!(tree.node_path(s1), "/doc/sec[1]");
        assert_eq!(tree.node_path(s2), "/doc/sec[2]");
        assert_eq!(tree.node_path(p), "/doc/sec[2]/p");
        assert_eq!(tree.node_path(t), "/doc/sec[2]/p/#text");
    }

    #[test]
    fn test_subtree_text() {
        let mut tree = Tree::new(NodeData::element("a"));
        let b = tree.add_child(tree.root(), NodeData::element("b"));
        tree.add_child(b, NodeData::text("hello"));
        tree.add_child(tree.root(), NodeData::text("world"));
        assert_eq!(tree.subtree_text(tree.root()), "hello world");
        assert_eq!(tree.subtree_text(b), "hello");
    }

    #[test]
    fn test_ancestor_at_depth() {
        let (tree, a, _, leaf) = sample();
        assert_eq!(tree.ancestor_at_depth(leaf, 0), Some(tree.root()));
        assert_eq!(tree.ancestor_at_depth(leaf, 1), Some(a));
        assert_eq!(tree.ancestor_at_depth(leaf, 2), Some(leaf));
        assert_eq!(tree.ancestor_at_depth(a, 2), None);
    }
}
