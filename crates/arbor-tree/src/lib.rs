//! Arena-backed node tree for Arbor.
//!
//! A [`Tree`] owns every node. Nodes are addressed by [`NodeKey`] handles;
//! parent edges, reference targets and set members are all handles that are
//! liveness-checked on use, so nothing outside the arena ever owns a node.
//!
//! Every structural or lifecycle change is announced synchronously through
//! the tree's event bus before the mutating call returns. Dependents (the
//! reference kernel, reference sets, state machines) keep themselves
//! consistent purely by subscribing to those notifications.
//!
//! # Modules
//!
//! - [`tree`]: The arena, structural mutation, conditions and disposal
//! - [`path`]: Path resolution and relative path computation
//! - [`event`]: [`NodeEvent`], [`EventKind`] and [`Subscription`]
//! - [`signal`]: [`Signal`], the listener registry behind every notification
//! - [`kind`]: Capability queries ([`NodeKind`]) and node payloads
//! - [`value`]: [`ValueNode`], a node holding a comparable value
//! - [`refset`]: [`ReferenceSet`], an availability-partitioned node set

pub mod error;
pub mod event;
pub mod kind;
pub mod path;
pub mod refset;
pub mod signal;
pub mod tree;
pub mod value;

pub use arbor_types::{Condition, NodeKey};
pub use error::{TreeError, TreeResult};
pub use event::{EventKind, NodeEvent, Subscription};
pub use kind::{AnyNode, DebugInfo, NodeKind, Payload};
pub use path::PathBuilder;
pub use refset::{Availability, ReferenceSet, ReferencesNode};
pub use signal::{emit_shared, Listener, ListenerId, Signal};
pub use tree::Tree;
pub use value::{ValueChanged, ValueNode, ValueSet, ValueType, ValueWillChange};
