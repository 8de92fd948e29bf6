use thiserror::Error;

use crate::condition::Condition;

/// Errors produced by foundation type checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid node id {id:?}: {reason}")]
    InvalidNodeId { id: String, reason: String },

    #[error("illegal condition transition: {from} -> {to}")]
    IllegalTransition { from: Condition, to: Condition },
}
