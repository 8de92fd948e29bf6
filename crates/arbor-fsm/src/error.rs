//! Error types for state machine operations.

use arbor_tree::{NodeKey, TreeError};

/// Errors that can occur while driving a state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FsmError {
    /// The key does not name a live state machine of the requested kind.
    #[error("not a state machine: {0:?}")]
    NotAMachine(NodeKey),

    /// The machine has lost its states holder.
    #[error("state machine {0:?} has no states holder")]
    MissingHolder(NodeKey),

    /// The node could not be made one of the machine's states.
    #[error("{state:?} is not a state of machine {machine:?}")]
    NotAState {
        /// The machine node.
        machine: NodeKey,
        /// The rejected node.
        state: NodeKey,
    },

    /// An underlying tree operation was rejected.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Convenience alias for state machine results.
pub type FsmResult<T> = Result<T, FsmError>;
