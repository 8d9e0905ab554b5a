//! Edit operation model.
//!
//! Operations carry only node ids, positions, depths, and change maps; they
//! never own tree data. A downstream presenter resolves the ids against the
//! two caller-owned trees.

mod detector;

pub use detector::OperationDetector;

use bitflags::bitflags;

use crate::tree::{NodeId, Tree};

bitflags! {
    /// The kinds of difference an update can carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeKind: u8 {
        /// The label differs.
        const LABEL = 1;
        /// The scalar value differs.
        const VALUE = 2;
        /// Attribute values differ, ignoring order.
        const ATTRIBUTES = 4;
        /// The same attribute keys appear in a different order
        /// (order-sensitive comparison only).
        const ATTRIBUTE_ORDER = 8;
    }
}

/// One detected difference between a matched pair, with old and new
/// renderings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// What kind of difference this is.
    pub kind: ChangeKind,
    /// The tree-1 side, if present.
    pub old: Option<String>,
    /// The tree-2 side, if present.
    pub new: Option<String>,
}

/// One edit action turning tree 1 into tree 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// A tree-2 node with no counterpart appears under `parent`.
    Insert {
        /// The inserted tree-2 node; its descendants are implied.
        node: NodeId,
        /// The tree-2 parent, `None` when the root itself is new.
        parent: Option<NodeId>,
        /// Child position under the parent.
        position: usize,
    },
    /// A tree-1 node with no counterpart disappears from `parent`.
    Delete {
        /// The deleted tree-1 node; its descendants are implied.
        node: NodeId,
        /// The tree-1 parent, `None` when the root itself is deleted.
        parent: Option<NodeId>,
        /// Child position under the parent.
        position: usize,
    },
    /// A matched pair whose content differs.
    Update {
        /// The tree-1 node.
        node1: NodeId,
        /// The tree-2 node.
        node2: NodeId,
        /// The differing kinds, each with old/new renderings.
        changes: Vec<Change>,
    },
    /// A matched pair that changed parents.
    Move {
        /// The tree-1 node.
        node1: NodeId,
        /// The tree-2 node.
        node2: NodeId,
        /// The tree-1 parent.
        old_parent: Option<NodeId>,
        /// The tree-2 parent.
        new_parent: Option<NodeId>,
        /// Child position in tree 1.
        old_position: usize,
        /// Child position in tree 2.
        new_position: usize,
    },
    /// Several tree-1 nodes collapsed into one tree-2 node.
    Merge {
        /// The tree-1 nodes whose content flowed into the target.
        source_nodes: Vec<NodeId>,
        /// The surviving tree-2 node.
        target_node: NodeId,
    },
    /// One tree-1 node fanned out into several tree-2 nodes.
    Split {
        /// The tree-1 node that was taken apart.
        source_node: NodeId,
        /// The tree-2 nodes carrying its content.
        target_nodes: Vec<NodeId>,
    },
    /// A node promoted toward the root.
    Upgrade {
        /// The tree-1 node.
        node1: NodeId,
        /// The tree-2 node.
        node2: NodeId,
        /// Depth in tree 1.
        from_depth: usize,
        /// Depth in tree 2, strictly smaller.
        to_depth: usize,
    },
    /// A node demoted away from the root.
    Downgrade {
        /// The tree-1 node.
        node1: NodeId,
        /// The tree-2 node.
        node2: NodeId,
        /// Depth in tree 1.
        from_depth: usize,
        /// Depth in tree 2, strictly greater.
        to_depth: usize,
    },
}

impl Operation {
    /// Returns the operation kind as a lowercase name.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Delete { .. } => "delete",
            Operation::Update { .. } => "update",
            Operation::Move { .. } => "move",
            Operation::Merge { .. } => "merge",
            Operation::Split { .. } => "split",
            Operation::Upgrade { .. } => "upgrade",
            Operation::Downgrade { .. } => "downgrade",
        }
    }

    /// Renders a one-line human-readable description, resolving node ids to
    /// paths in the given trees.
    pub fn describe(&self, tree1: &Tree, tree2: &Tree) -> String {
        match self {
            Operation::Insert { node, .. } => {
                format!("insert {}", tree2.node_path(*node))
            }
            Operation::Delete { node, .. } => {
                format!("delete {}", tree1.node_path(*node))
            }
            Operation::Update { node1, changes, .. } => {
                let kinds: Vec<String> = changes
                    .iter()
                    .flat_map(|c| c.kind.iter_names().map(|(name, _)| name.to_lowercase()))
                    .collect();
                format!("update {} ({})", tree1.node_path(*node1), kinds.join(","))
            }
            Operation::Move { node1, node2, .. } => {
                format!(
                    "move {} -> {}",
                    tree1.node_path(*node1),
                    tree2.node_path(*node2)
                )
            }
            Operation::Merge {
                source_nodes,
                target_node,
            } => {
                format!(
                    "merge {} nodes into {}",
                    source_nodes.len(),
                    tree2.node_path(*target_node)
                )
            }
            Operation::Split {
                source_node,
                target_nodes,
            } => {
                format!(
                    "split {} into {} nodes",
                    tree1.node_path(*source_node),
                    target_nodes.len()
                )
            }
            Operation::Upgrade {
                node1,
                from_depth,
                to_depth,
                ..
            } => {
                format!(
                    "upgrade {} (depth {} -> {})",
                    tree1.node_path(*node1),
                    from_depth,
                    to_depth
                )
            }
            Operation::Downgrade {
                node1,
                from_depth,
                to_depth,
                ..
            } => {
                format!(
                    "downgrade {} (depth {} -> {})",
                    tree1.node_path(*node1),
                    from_depth,
                    to_depth
                )
            }
        }
    }
}
