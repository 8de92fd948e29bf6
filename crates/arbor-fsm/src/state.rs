//! State nodes.

use arbor_tree::{DebugInfo, NodeKey, NodeKind, Payload, Subscription, Tree};
use tracing::debug;

/// Payload of a state node.
#[derive(Debug, Default)]
pub struct StateCell {
    active: bool,
}

impl Payload for StateCell {
    fn debug_info(&self, _tree: &Tree) -> DebugInfo {
        DebugInfo::new(if self.active { "active" } else { "inactive" }, "")
    }
}

/// Emitted on a state when it becomes the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEntered {
    pub state: NodeKey,
}

/// Emitted on a state when it stops being the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateExited {
    pub state: NodeKey,
}

/// Emitted on a state that asks its machine to make it current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationRequested {
    pub state: NodeKey,
}

/// The kind of plain state nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateNode;

impl NodeKind for StateNode {
    fn matches(tree: &Tree, node: NodeKey) -> bool {
        tree.payload::<StateCell>(node).is_some()
    }
}

impl StateNode {
    /// Create a detached, inactive state node.
    pub fn create(tree: &mut Tree, id: impl Into<String>) -> NodeKey {
        tree.create_node_with(id, StateCell::default())
    }

    /// Returns `true` while `state` is its machine's current state.
    pub fn is_active(tree: &Tree, state: NodeKey) -> bool {
        tree.payload::<StateCell>(state).is_some_and(|cell| cell.active)
    }

    /// Ask the owning machine to make `state` current.
    pub fn request_activation(tree: &mut Tree, state: NodeKey) {
        tree.emit_custom(state, ActivationRequested { state });
    }

    pub fn on_entered(
        tree: &mut Tree,
        state: NodeKey,
        listener: impl Fn(&mut Tree, &StateEntered) + 'static,
    ) -> Subscription {
        tree.subscribe_custom(state, listener)
    }

    pub fn on_exited(
        tree: &mut Tree,
        state: NodeKey,
        listener: impl Fn(&mut Tree, &StateExited) + 'static,
    ) -> Subscription {
        tree.subscribe_custom(state, listener)
    }
}

/// Flip the active flag (when the state carries one) and announce it.
pub(crate) fn enter(tree: &mut Tree, state: NodeKey) {
    if let Some(cell) = tree.payload_mut::<StateCell>(state) {
        cell.active = true;
    }
    debug!(state = ?state, "state entered");
    tree.emit_custom(state, StateEntered { state });
}

pub(crate) fn exit(tree: &mut Tree, state: NodeKey) {
    if let Some(cell) = tree.payload_mut::<StateCell>(state) {
        cell.active = false;
    }
    debug!(state = ?state, "state exited");
    tree.emit_custom(state, StateExited { state });
}
