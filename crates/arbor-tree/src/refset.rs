//! Availability-partitioned sets of node references.
//!
//! A [`ReferenceSet`] never owns its members. It observes each member's
//! condition to keep the `available`/`unavailable` partitions current and
//! drops a member as soon as it starts disposal. Optionally it mirrors the
//! children of one or more listened targets.

use std::any::type_name;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::debug;

use arbor_types::{Condition, NodeKey};

use crate::error::{TreeError, TreeResult};
use crate::event::{EventKind, NodeEvent, Subscription};
use crate::kind::{AnyNode, DebugInfo, NodeKind, Payload};
use crate::signal::{emit_shared, ListenerId, Signal};
use crate::tree::Tree;

/// Which partition of a set to read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Availability {
    /// Members whose condition is `Available`.
    #[default]
    Available,
    /// Members whose condition is `Unavailable`.
    Unavailable,
    /// Every member.
    All,
}

struct ListenedTarget {
    node: NodeKey,
    subs: Vec<Subscription>,
}

#[derive(Default)]
struct SetState {
    all: Vec<NodeKey>,
    available: Vec<NodeKey>,
    unavailable: Vec<NodeKey>,
    member_subs: HashMap<NodeKey, Subscription>,
    targets: Vec<ListenedTarget>,
    added: Signal<NodeKey>,
    removed: Signal<NodeKey>,
}

impl SetState {
    fn partition(&self, availability: Availability) -> &[NodeKey] {
        match availability {
            Availability::Available => &self.available,
            Availability::Unavailable => &self.unavailable,
            Availability::All => &self.all,
        }
    }

    fn place(&mut self, node: NodeKey, condition: Condition) {
        self.available.retain(|n| *n != node);
        self.unavailable.retain(|n| *n != node);
        match condition {
            Condition::Available => self.available.push(node),
            _ => self.unavailable.push(node),
        }
    }
}

/// A set of references to nodes of kind `K`.
///
/// Cloning yields another handle to the same set.
pub struct ReferenceSet<K: NodeKind = AnyNode> {
    state: Rc<RefCell<SetState>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: NodeKind> Clone for ReferenceSet<K> {
    fn clone(&self) -> Self {
        Self::from_state(self.state.clone())
    }
}

impl<K: NodeKind> Default for ReferenceSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: NodeKind> fmt::Debug for ReferenceSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ReferenceSet")
            .field("available", &state.available.len())
            .field("unavailable", &state.unavailable.len())
            .field("targets", &state.targets.len())
            .finish()
    }
}

impl<K: NodeKind> ReferenceSet<K> {
    pub fn new() -> Self {
        Self::from_state(Rc::default())
    }

    fn from_state(state: Rc<RefCell<SetState>>) -> Self {
        Self {
            state,
            _kind: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.state.borrow().all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().all.is_empty()
    }

    pub fn contains(&self, node: NodeKey) -> bool {
        self.state.borrow().all.contains(&node)
    }

    /// Check whether `node` may join the set.
    pub fn can_add(&self, tree: &Tree, node: NodeKey) -> TreeResult<()> {
        if self.contains(node) {
            return Err(TreeError::AlreadyReferenced(node));
        }
        if !tree.contains(node) || tree.condition(node).is_disposed() {
            return Err(TreeError::NodeNotFound(node));
        }
        if !K::matches(tree, node) {
            return Err(TreeError::KindMismatch {
                node,
                expected: type_name::<K>(),
            });
        }
        Ok(())
    }

    /// Add `node`, placing it by its current condition.
    pub fn add(&self, tree: &mut Tree, node: NodeKey) -> TreeResult<()> {
        if let Err(err) = self.can_add(tree, node) {
            return tree.reject(err);
        }

        let weak = Rc::downgrade(&self.state);
        let sub = tree.subscribe(node, EventKind::ConditionChanged, move |tree, event| {
            let (Some(state), NodeEvent::ConditionChanged { node, new, .. }) = (weak.upgrade(), event)
            else {
                return;
            };
            Self::from_state(state).member_condition_changed(tree, *node, *new);
        });

        {
            let mut state = self.state.borrow_mut();
            state.all.push(node);
            state.place(node, tree.condition(node));
            state.member_subs.insert(node, sub);
        }
        debug!(node = ?node, "reference added");
        emit_shared(&self.state, |s| &s.added, tree, &node);
        Ok(())
    }

    /// Check whether `node` is a member that can be removed.
    pub fn can_remove(&self, node: NodeKey) -> TreeResult<()> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(TreeError::NotReferenced(node))
        }
    }

    /// Remove `node` from every partition.
    pub fn remove(&self, tree: &mut Tree, node: NodeKey) -> TreeResult<()> {
        if let Err(err) = self.can_remove(node) {
            return tree.reject(err);
        }

        let sub = {
            let mut state = self.state.borrow_mut();
            state.all.retain(|n| *n != node);
            state.available.retain(|n| *n != node);
            state.unavailable.retain(|n| *n != node);
            state.member_subs.remove(&node)
        };
        if let Some(sub) = sub {
            tree.unsubscribe(sub);
        }
        debug!(node = ?node, "reference removed");
        emit_shared(&self.state, |s| &s.removed, tree, &node);
        Ok(())
    }

    fn member_condition_changed(&self, tree: &mut Tree, node: NodeKey, condition: Condition) {
        if !self.contains(node) {
            return;
        }
        if condition == Condition::Destroying {
            // Cannot fail: membership was just checked.
            let _ = self.remove(tree, node);
        } else {
            self.state.borrow_mut().place(node, condition);
        }
    }

    /// Mirror the children of `target` that expose `K` into this set.
    ///
    /// Existing matching children are added at once; later additions and
    /// removals follow automatically until [`stop_listening`] is called or
    /// the target is disposed. Listening twice, or to a disposed node, does
    /// nothing.
    ///
    /// [`stop_listening`]: ReferenceSet::stop_listening
    pub fn listen_to_children(&self, tree: &mut Tree, target: NodeKey) {
        if self.is_listening(target) {
            return;
        }
        if tree.condition(target).is_disposed() {
            debug!(target = ?target, "not listening to disposed target");
            return;
        }

        let weak = Rc::downgrade(&self.state);
        let on_added = tree.subscribe(target, EventKind::ChildAdded, move |tree, event| {
            let (Some(state), NodeEvent::ChildAdded { child, .. }) = (weak.upgrade(), event) else {
                return;
            };
            let set = Self::from_state(state);
            if K::matches(tree, *child) && !set.contains(*child) {
                let _ = set.add(tree, *child);
            }
        });

        let weak = Rc::downgrade(&self.state);
        let on_removed = tree.subscribe(target, EventKind::ChildRemoved, move |tree, event| {
            let (Some(state), NodeEvent::ChildRemoved { child, .. }) = (weak.upgrade(), event)
            else {
                return;
            };
            let set = Self::from_state(state);
            if set.contains(*child) {
                let _ = set.remove(tree, *child);
            }
        });

        let weak = Rc::downgrade(&self.state);
        let on_disposed = tree.subscribe(target, EventKind::Disposed, move |tree, event| {
            let (Some(state), NodeEvent::Disposed { node }) = (weak.upgrade(), event) else {
                return;
            };
            Self::from_state(state).stop_listening(tree, *node);
        });

        self.state.borrow_mut().targets.push(ListenedTarget {
            node: target,
            subs: vec![on_added, on_removed, on_disposed],
        });
        debug!(target = ?target, "listening to children");

        for child in tree.children_of::<K>(target) {
            if !self.contains(child) {
                let _ = self.add(tree, child);
            }
        }
    }

    /// Stop mirroring `target` and drop its mirrored children. Returns
    /// `false` if `target` was not listened to.
    pub fn stop_listening(&self, tree: &mut Tree, target: NodeKey) -> bool {
        let entry = {
            let mut state = self.state.borrow_mut();
            let index = state.targets.iter().position(|t| t.node == target);
            index.map(|index| state.targets.remove(index))
        };
        let Some(entry) = entry else {
            return false;
        };
        for sub in entry.subs {
            tree.unsubscribe(sub);
        }
        for child in tree.children(target).to_vec() {
            if self.contains(child) {
                let _ = self.remove(tree, child);
            }
        }
        debug!(target = ?target, "stopped listening to children");
        true
    }

    pub fn is_listening(&self, target: NodeKey) -> bool {
        self.state.borrow().targets.iter().any(|t| t.node == target)
    }

    /// Snapshot of the requested partition, in insertion order.
    pub fn references(&self, availability: Availability) -> Vec<NodeKey> {
        self.state.borrow().partition(availability).to_vec()
    }

    /// Snapshot of the requested partition filtered by `predicate`.
    pub fn references_where(
        &self,
        tree: &Tree,
        availability: Availability,
        predicate: impl Fn(&Tree, NodeKey) -> bool,
    ) -> Vec<NodeKey> {
        self.references(availability)
            .into_iter()
            .filter(|node| predicate(tree, *node))
            .collect()
    }

    /// Visit a snapshot of the requested partition. `visit` may mutate the
    /// tree and the set.
    pub fn for_each(
        &self,
        tree: &mut Tree,
        availability: Availability,
        mut visit: impl FnMut(&mut Tree, NodeKey),
    ) {
        for node in self.references(availability) {
            visit(tree, node);
        }
    }

    /// Like [`for_each`](ReferenceSet::for_each), skipping nodes that fail
    /// `predicate` at visit time.
    pub fn for_each_where(
        &self,
        tree: &mut Tree,
        availability: Availability,
        predicate: impl Fn(&Tree, NodeKey) -> bool,
        mut visit: impl FnMut(&mut Tree, NodeKey),
    ) {
        for node in self.references(availability) {
            if predicate(tree, node) {
                visit(tree, node);
            }
        }
    }

    pub fn on_added(&self, listener: impl Fn(&mut Tree, &NodeKey) + 'static) -> ListenerId {
        self.state.borrow_mut().added.connect(listener)
    }

    pub fn on_removed(&self, listener: impl Fn(&mut Tree, &NodeKey) + 'static) -> ListenerId {
        self.state.borrow_mut().removed.connect(listener)
    }

    /// Disconnect an `on_added` or `on_removed` listener.
    pub fn disconnect(&self, id: ListenerId) -> bool {
        let mut state = self.state.borrow_mut();
        state.added.disconnect(id) || state.removed.disconnect(id)
    }

    /// Stop listening to every target, remove every member, then drop all
    /// listeners.
    pub fn dispose(&self, tree: &mut Tree) {
        let targets: Vec<NodeKey> = self.state.borrow().targets.iter().map(|t| t.node).collect();
        for target in targets {
            self.stop_listening(tree, target);
        }
        for node in self.references(Availability::All) {
            let _ = self.remove(tree, node);
        }
        let mut state = self.state.borrow_mut();
        state.added.clear();
        state.removed.clear();
    }
}

/// Payload of a [`ReferencesNode`].
pub struct ReferenceSetCell<K: NodeKind> {
    set: ReferenceSet<K>,
}

impl<K: NodeKind> Payload for ReferenceSetCell<K> {
    fn debug_info(&self, tree: &Tree) -> DebugInfo {
        let members = self.set.references(Availability::All);
        let details = members
            .iter()
            .enumerate()
            .map(|(index, node)| format!("{index}: {}", tree.id(*node).unwrap_or("?")))
            .collect::<Vec<_>>()
            .join("\n");
        DebugInfo::new(format!("({})", members.len()), details)
    }
}

/// A node that carries a [`ReferenceSet`]. The set is disposed as soon as
/// the node starts disposal.
pub struct ReferencesNode<K: NodeKind = AnyNode> {
    key: NodeKey,
    _kind: PhantomData<fn() -> K>,
}

impl<K: NodeKind> Clone for ReferencesNode<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: NodeKind> Copy for ReferencesNode<K> {}

impl<K: NodeKind> fmt::Debug for ReferencesNode<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReferencesNode").field(&self.key).finish()
    }
}

impl<K: NodeKind> NodeKind for ReferencesNode<K> {
    fn matches(tree: &Tree, node: NodeKey) -> bool {
        tree.payload::<ReferenceSetCell<K>>(node).is_some()
    }
}

impl<K: NodeKind> ReferencesNode<K> {
    pub fn create(tree: &mut Tree, id: impl Into<String>) -> Self {
        let set = ReferenceSet::<K>::new();
        let key = tree.create_node_with(id, ReferenceSetCell { set: set.clone() });
        tree.subscribe(key, EventKind::StartedDispose, move |tree, _| set.dispose(tree));
        Self {
            key,
            _kind: PhantomData,
        }
    }

    pub fn from_key(tree: &Tree, key: NodeKey) -> Option<Self> {
        Self::matches(tree, key).then_some(Self {
            key,
            _kind: PhantomData,
        })
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Handle to the node's set, while the node is live.
    pub fn set(&self, tree: &Tree) -> Option<ReferenceSet<K>> {
        tree.payload::<ReferenceSetCell<K>>(self.key)
            .map(|cell| cell.set.clone())
    }
}
