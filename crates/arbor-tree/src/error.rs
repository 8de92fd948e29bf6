//! Error types for tree operations.

use arbor_types::{Condition, NodeKey, TypeError};

/// Validation failures of tree and reference-set operations.
///
/// Every variant is produced by a side-effect-free `can_*` check before any
/// mutation happens, so an `Err` always means the tree was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The key does not name a live node in this tree.
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeKey),

    /// A node cannot be its own child.
    #[error("cannot add {0:?} to itself")]
    SelfParenting(NodeKey),

    /// The parent already has a child with this id.
    #[error("{parent:?} already has a child with id {id:?}")]
    DuplicateId {
        /// The prospective parent.
        parent: NodeKey,
        /// The colliding id.
        id: String,
    },

    /// Children can only be added while the parent is `Available`.
    #[error("{parent:?} is {condition} and cannot accept children")]
    ParentNotAvailable {
        /// The prospective parent.
        parent: NodeKey,
        /// Its current condition.
        condition: Condition,
    },

    /// The child is an ancestor of the prospective parent.
    #[error("cannot add {child:?} under {parent:?}: it is an ancestor of the parent")]
    CycleDetected {
        /// The prospective parent.
        parent: NodeKey,
        /// The would-be child.
        child: NodeKey,
    },

    /// No child with this id exists under the parent.
    #[error("no child with id {id:?} under {parent:?}")]
    NotAChild {
        /// The parent that was searched.
        parent: NodeKey,
        /// The missing id.
        id: String,
    },

    /// A child index outside `0..len`.
    #[error("child index {index} out of range for {len} children")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of children.
        len: usize,
    },

    /// The node is already a member of the reference set.
    #[error("{0:?} is already referenced")]
    AlreadyReferenced(NodeKey),

    /// The node is not a member of the reference set.
    #[error("{0:?} is not referenced")]
    NotReferenced(NodeKey),

    /// The node does not expose the requested capability.
    #[error("{node:?} is not a {expected}")]
    KindMismatch {
        /// The offending node.
        node: NodeKey,
        /// Name of the expected kind.
        expected: &'static str,
    },

    /// A foundation type check failed (e.g. an illegal condition transition).
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
