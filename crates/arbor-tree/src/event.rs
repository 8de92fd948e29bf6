//! Node notifications and the per-node event bus.
//!
//! [`NodeEvent`] enumerates everything the tree announces. Besides the fixed
//! lifecycle and structural notifications, any `'static` type can travel as
//! a [`NodeEvent::Custom`] payload; custom events are keyed by their
//! [`TypeId`], so each event struct gets its own subscriber list.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use arbor_types::{Condition, NodeKey};

use crate::signal::{Listener, ListenerId, Signal};

/// A notification emitted on a node.
#[derive(Clone, Debug)]
pub enum NodeEvent {
    /// Disposal of `node` has begun (condition is `Destroying`).
    StartedDispose { node: NodeKey },
    /// Disposal of `node` finished (condition is `Destroyed`).
    Disposed { node: NodeKey },
    /// `child` moved from `old_parent` to `new_parent`.
    NewParentSet {
        child: NodeKey,
        new_parent: Option<NodeKey>,
        old_parent: Option<NodeKey>,
    },
    /// The ancestry or the subtree of `affected` changed because `source`
    /// moved from `old_parent` to `new_parent`.
    TreeStructureChanged {
        affected: NodeKey,
        source: NodeKey,
        new_parent: Option<NodeKey>,
        old_parent: Option<NodeKey>,
    },
    /// `child` was appended to `parent` at `index`.
    ChildAdded {
        parent: NodeKey,
        child: NodeKey,
        index: usize,
    },
    /// `child` was removed from `parent`; it used to sit at `index`.
    ChildRemoved {
        parent: NodeKey,
        child: NodeKey,
        index: usize,
    },
    /// The condition of `node` changed.
    ConditionChanged {
        node: NodeKey,
        new: Condition,
        previous: Condition,
    },
    /// A typed event defined outside this crate.
    Custom {
        node: NodeKey,
        type_id: TypeId,
        payload: Rc<dyn Any>,
    },
}

impl NodeEvent {
    /// The subscription kind this event is delivered to.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StartedDispose { .. } => EventKind::StartedDispose,
            Self::Disposed { .. } => EventKind::Disposed,
            Self::NewParentSet { .. } => EventKind::NewParentSet,
            Self::TreeStructureChanged { .. } => EventKind::TreeStructureChanged,
            Self::ChildAdded { .. } => EventKind::ChildAdded,
            Self::ChildRemoved { .. } => EventKind::ChildRemoved,
            Self::ConditionChanged { .. } => EventKind::ConditionChanged,
            Self::Custom { type_id, .. } => EventKind::Custom(*type_id),
        }
    }

    /// Wrap a typed payload as a custom event on `node`.
    pub fn custom<E: 'static>(node: NodeKey, event: E) -> Self {
        Self::Custom {
            node,
            type_id: TypeId::of::<E>(),
            payload: Rc::new(event),
        }
    }

    /// Downcast a custom payload.
    pub fn downcast<E: 'static>(&self) -> Option<&E> {
        match self {
            Self::Custom { payload, .. } => payload.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// What a subscription listens for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    StartedDispose,
    Disposed,
    NewParentSet,
    TreeStructureChanged,
    ChildAdded,
    ChildRemoved,
    ConditionChanged,
    /// Custom events carrying a payload of the given type.
    Custom(TypeId),
}

impl EventKind {
    /// The kind for custom events of type `E`.
    pub fn custom<E: 'static>() -> Self {
        Self::Custom(TypeId::of::<E>())
    }
}

/// Token for one registration on the bus.
///
/// The subscriber keeps it and hands it back to
/// [`Tree::unsubscribe`](crate::Tree::unsubscribe) when it is disposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub id: ListenerId,
    pub node: NodeKey,
    pub kind: EventKind,
}

/// Per-node, per-kind listener registry.
#[derive(Default)]
pub(crate) struct EventBus {
    signals: HashMap<NodeKey, HashMap<EventKind, Signal<NodeEvent>>>,
}

impl EventBus {
    pub(crate) fn subscribe(
        &mut self,
        node: NodeKey,
        kind: EventKind,
        listener: Listener<NodeEvent>,
    ) -> Subscription {
        let id = self
            .signals
            .entry(node)
            .or_default()
            .entry(kind)
            .or_default()
            .connect_rc(listener);
        Subscription { id, node, kind }
    }

    pub(crate) fn unsubscribe(&mut self, sub: Subscription) -> bool {
        let Some(kinds) = self.signals.get_mut(&sub.node) else {
            return false;
        };
        let removed = kinds
            .get_mut(&sub.kind)
            .map(|signal| signal.disconnect(sub.id))
            .unwrap_or(false);
        if kinds.get(&sub.kind).is_some_and(Signal::is_empty) {
            kinds.remove(&sub.kind);
        }
        if kinds.is_empty() {
            self.signals.remove(&sub.node);
        }
        removed
    }

    pub(crate) fn snapshot(
        &self,
        node: NodeKey,
        kind: EventKind,
    ) -> Vec<(ListenerId, Listener<NodeEvent>)> {
        self.signals
            .get(&node)
            .and_then(|kinds| kinds.get(&kind))
            .map(Signal::snapshot)
            .unwrap_or_default()
    }

    pub(crate) fn is_connected(&self, node: NodeKey, kind: EventKind, id: ListenerId) -> bool {
        self.signals
            .get(&node)
            .and_then(|kinds| kinds.get(&kind))
            .is_some_and(|signal| signal.is_connected(id))
    }

    /// Drop every registration on `node`, returning how many there were.
    pub(crate) fn clear_node(&mut self, node: NodeKey) -> usize {
        self.signals
            .remove(&node)
            .map(|kinds| kinds.values().map(Signal::len).sum())
            .unwrap_or(0)
    }

    pub(crate) fn listener_count(&self, node: NodeKey) -> usize {
        self.signals
            .get(&node)
            .map(|kinds| kinds.values().map(Signal::len).sum())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[derive(Debug, PartialEq)]
    struct Ping(u8);

    #[test]
    fn custom_event_kind_is_per_type() {
        let node = NodeKey::next();
        let event = NodeEvent::custom(node, Ping(3));
        assert_eq!(event.kind(), EventKind::custom::<Ping>());
        assert_ne!(event.kind(), EventKind::custom::<u8>());
        assert_eq!(event.downcast::<Ping>(), Some(&Ping(3)));
        assert_eq!(event.downcast::<u8>(), None);
    }

    #[test]
    fn builtin_kinds() {
        let node = NodeKey::next();
        assert_eq!(
            NodeEvent::Disposed { node }.kind(),
            EventKind::Disposed
        );
        assert_eq!(
            NodeEvent::ChildAdded {
                parent: node,
                child: node,
                index: 0
            }
            .kind(),
            EventKind::ChildAdded
        );
    }

    #[test]
    fn unsubscribe_prunes_empty_entries() {
        let mut bus = EventBus::default();
        let node = NodeKey::next();
        let sub = bus.subscribe(node, EventKind::Disposed, Rc::new(|_: &mut Tree, _: &NodeEvent| {}));
        assert_eq!(bus.listener_count(node), 1);
        assert!(bus.is_connected(node, EventKind::Disposed, sub.id));
        assert!(bus.unsubscribe(sub));
        assert!(!bus.unsubscribe(sub));
        assert_eq!(bus.listener_count(node), 0);
        assert!(bus.signals.is_empty());
    }

    #[test]
    fn clear_node_reports_dropped_listeners() {
        let mut bus = EventBus::default();
        let node = NodeKey::next();
        bus.subscribe(node, EventKind::Disposed, Rc::new(|_: &mut Tree, _: &NodeEvent| {}));
        bus.subscribe(node, EventKind::ChildAdded, Rc::new(|_: &mut Tree, _: &NodeEvent| {}));
        assert_eq!(bus.clear_node(node), 2);
        assert!(bus.snapshot(node, EventKind::Disposed).is_empty());
    }
}
