//! The [`NodeRef`] trait shared by every reference strategy.

use arbor_tree::{Listener, ListenerId, NodeKey, NodeKind, Tree};

/// Transition of a reference's resolved instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceChange {
    pub new: Option<NodeKey>,
    pub old: Option<NodeKey>,
}

/// A non-owning handle that keeps itself pointed at the right node.
///
/// The trait is object safe so collaborators can hold references of mixed
/// strategies behind `Box<dyn NodeRef>`.
pub trait NodeRef {
    /// The currently resolved node.
    fn instance(&self) -> Option<NodeKey>;

    fn has_instance(&self) -> bool {
        self.instance().is_some()
    }

    /// The resolved node, only if it is still live and not disposing.
    fn try_instance(&self, tree: &Tree) -> Option<NodeKey> {
        self.instance()
            .filter(|node| tree.contains(*node) && !tree.condition(*node).is_disposed())
    }

    fn is_disposed(&self) -> bool;

    /// Listen for identity changes of the resolved instance.
    fn on_instance_changed(&self, listener: Listener<InstanceChange>) -> ListenerId;

    /// Listen for disposal of the reference itself. Fires once.
    fn on_disposed(&self, listener: Listener<()>) -> ListenerId;

    /// Disconnect an `on_instance_changed` or `on_disposed` listener.
    fn disconnect(&self, id: ListenerId) -> bool;

    /// Dispose the reference. Idempotent.
    ///
    /// Fires the disposed notification, clears the instance, then releases
    /// every tree subscription and every listener.
    fn dispose(&self, tree: &mut Tree);
}

/// Returns `true` if `node` is live and exposes `K`.
pub(crate) fn resolves_as<K: NodeKind>(tree: &Tree, node: NodeKey) -> bool {
    K::matches(tree, node) && !tree.condition(node).is_disposed()
}
