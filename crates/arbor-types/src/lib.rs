//! Foundation types for the Arbor node tree.
//!
//! Every other Arbor crate depends on `arbor-types`. The types here carry no
//! behavior beyond validation: the tree itself lives in `arbor-tree`.
//!
//! # Key Types
//!
//! - [`NodeKey`]: Arena handle for a node, never reused
//! - [`Condition`]: Lifecycle state of a node and its transition table
//! - [`validate_node_id`]: Rules a sibling-unique node id must follow

pub mod condition;
pub mod error;
pub mod key;
pub mod names;

pub use condition::Condition;
pub use error::TypeError;
pub use key::NodeKey;
pub use names::{generate_node_id, is_valid_node_id, validate_node_id};
