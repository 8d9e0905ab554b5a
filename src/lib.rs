//! Semantic tree differencing for markup and key/value documents.
//!
//! This library decides whether two structured documents are semantically
//! equivalent and, when they are not, produces a precise, classified list of
//! edit operations — insert, delete, update, move, merge, split, and
//! hierarchy upgrade/downgrade — instead of a raw textual diff.
//!
//! # Overview
//!
//! Callers build two [`Tree`] values (an arena-backed node model with
//! labels, scalar values, and attributes), pick their [`MatchOptions`], and
//! run [`diff`]. Internally the comparison proceeds in two stages:
//!
//! 1. [`TreeMatcher`] pairs up corresponding nodes. Exact pairing buckets
//!    nodes by path signature, following the XDiff approach; the remaining
//!    nodes are paired greedily in descending subtree-weight order,
//!    following the XyDiff approach. All pairs live in a [`Matching`] that
//!    enforces one-to-one membership and prefix closure at insertion time.
//! 2. [`OperationDetector`] classifies every node of both trees against the
//!    completed matching and collapses related basic operations into
//!    higher-level semantic ones.
//!
//! Each comparison is a pure function of the two input trees and the
//! options; nothing is shared or persisted between runs.
//!
//! # Example
//!
//! ```
//! use semdiff::{diff, MatchOptions, NodeData, Tree};
//!
//! let mut old = Tree::new(NodeData::element("a"));
//! old.add_child(old.root(), NodeData::element("b").with_value("1"));
//!
//! let mut new = Tree::new(NodeData::element("a"));
//! new.add_child(new.root(), NodeData::element("b").with_value("2"));
//!
//! let ops = diff(&old, &new, &MatchOptions::default());
//! assert_eq!(ops.len(), 1);
//! assert_eq!(ops[0].kind_name(), "update");
//! ```

pub mod attrs;
pub mod constants;
pub mod error;
pub mod matching;
pub mod measure;
pub mod ops;
pub mod options;
pub mod signature;
pub mod tree;

// Re-export commonly used types
pub use attrs::AttributeComparator;
pub use error::{Error, Result};
pub use matching::{Matching, TreeMatcher};
pub use ops::{Change, ChangeKind, Operation, OperationDetector};
pub use options::{AttributeOrder, MatchOptions, TextContent};
pub use signature::Signature;
pub use tree::{NodeData, NodeId, NodeKind, Tree};

/// Compares two trees and returns the ordered operation list.
///
/// Operations reference nodes of the input trees by id and carry no
/// ownership; both trees must outlive any use of the result.
pub fn diff(tree1: &Tree, tree2: &Tree, options: &MatchOptions) -> Vec<Operation> {
    let (ops, _matching) = diff_with_matching(tree1, tree2, options);
    ops
}

/// Like [`diff`], but also returns the node matching.
///
/// Useful for presenters that need to resolve which tree-2 node a tree-1
/// node corresponds to without re-deriving structure.
pub fn diff_with_matching(
    tree1: &Tree,
    tree2: &Tree,
    options: &MatchOptions,
) -> (Vec<Operation>, Matching) {
    let matching = TreeMatcher::new(tree1, tree2, options).build_matching();
    let ops = OperationDetector::new(tree1, tree2, &matching, options).detect();
    (ops, matching)
}
