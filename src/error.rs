//! Error types for tree construction.
//!
//! The comparison path itself is total: lookups return `Option`, constraint
//! violations in [`Matching::add`](crate::Matching::add) are reported as a
//! rejected `false` result, and the detector never fails. The only fallible
//! surface is structural mutation of a [`Tree`](crate::Tree), where attaching
//! a node in a way that would corrupt the arena is refused with a typed error.

use thiserror::Error;

use crate::tree::NodeId;

/// Result type alias for tree mutation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or mutating a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The node is already attached to a parent.
    #[error("node {0:?} is already attached to a parent")]
    AlreadyAttached(NodeId),

    /// Attaching the node would create a cycle.
    #[error("attaching node {0:?} would create a cycle")]
    WouldCycle(NodeId),

    /// A child index was out of range.
    #[error("child position {position} out of range (len {len})")]
    InvalidPosition {
        /// The requested child index.
        position: usize,
        /// The number of children present.
        len: usize,
    },
}
