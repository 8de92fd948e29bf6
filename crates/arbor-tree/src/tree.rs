//! The node arena.
//!
//! [`Tree`] stores every node and is the only owner of node data. A parent
//! owns its children through the ordered child list; every other edge is a
//! [`NodeKey`] that stops resolving once the node is gone.
//!
//! # Invariants
//!
//! - `children` and `children_by_id` of a node are always in bijection.
//! - A node id is unique among its siblings.
//! - A node is never its own ancestor.
//! - Children are only added while the parent is `Available`.
//! - Condition changes follow [`Condition::can_transition_to`].
//!
//! # Notification order
//!
//! Attaching or detaching a child announces, in order: `ChildAdded` /
//! `ChildRemoved` on the parent; `TreeStructureChanged` on the moved node and
//! each of its descendants (depth-first, pre-order); `TreeStructureChanged` on
//! the parent and each of its ancestors (bottom-up); `NewParentSet` on the
//! moved node.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use arbor_types::{generate_node_id, validate_node_id, Condition, NodeKey};

use crate::error::{TreeError, TreeResult};
use crate::event::{EventBus, EventKind, NodeEvent, Subscription};
use crate::kind::{DebugInfo, NodeKind, Payload, PayloadBox};
use crate::refset::{Availability, ReferenceSet};

pub(crate) struct NodeData {
    pub(crate) id: String,
    pub(crate) condition: Condition,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) children_by_id: HashMap<String, NodeKey>,
    /// Children waiting for admission.
    pub(crate) queued: ReferenceSet,
    pub(crate) payload: Option<PayloadBox>,
}

/// An arena of nodes plus the event bus that announces their changes.
#[derive(Default)]
pub struct Tree {
    nodes: HashMap<NodeKey, NodeData>,
    bus: EventBus,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots().len())
            .finish()
    }
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    /// Create a detached, `Available` node.
    ///
    /// An invalid id is replaced by a generated one; the replacement is
    /// logged unless the requested id was empty.
    pub fn create_node(&mut self, id: impl Into<String>) -> NodeKey {
        self.insert_node(id.into(), None)
    }

    /// Create a detached node carrying `payload`.
    pub fn create_node_with<P: Payload>(&mut self, id: impl Into<String>, payload: P) -> NodeKey {
        self.insert_node(id.into(), Some(PayloadBox::new(payload)))
    }

    fn insert_node(&mut self, requested: String, payload: Option<PayloadBox>) -> NodeKey {
        let id = match validate_node_id(&requested) {
            Ok(()) => requested,
            Err(err) => {
                let generated = generate_node_id();
                if !requested.is_empty() {
                    warn!(requested = %requested, generated = %generated, error = %err, "node id rejected; using generated id");
                }
                generated
            }
        };

        let key = NodeKey::next();
        debug!(node = ?key, id = %id, "created node");
        self.nodes.insert(
            key,
            NodeData {
                id,
                condition: Condition::Available,
                parent: None,
                children: Vec::new(),
                children_by_id: HashMap::new(),
                queued: ReferenceSet::new(),
                payload,
            },
        );
        key
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Returns `true` if `node` is live in this tree.
    pub fn contains(&self, node: NodeKey) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All parentless nodes, oldest first.
    pub fn roots(&self) -> Vec<NodeKey> {
        let mut roots: Vec<NodeKey> = self
            .nodes
            .iter()
            .filter(|(_, data)| data.parent.is_none())
            .map(|(key, _)| *key)
            .collect();
        roots.sort();
        roots
    }

    /// The node's id.
    pub fn id(&self, node: NodeKey) -> Option<&str> {
        self.nodes.get(&node).map(|data| data.id.as_str())
    }

    /// The node's condition. Keys no longer in the arena read as `Destroyed`.
    pub fn condition(&self, node: NodeKey) -> Condition {
        self.nodes
            .get(&node)
            .map(|data| data.condition)
            .unwrap_or(Condition::Destroyed)
    }

    /// Returns `true` if the node's condition is one of `conditions`.
    pub fn is_in_conditions(&self, node: NodeKey, conditions: &[Condition]) -> bool {
        self.condition(node).is_any_of(conditions)
    }

    /// The node's parent.
    pub fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.nodes.get(&node).and_then(|data| data.parent)
    }

    /// The node's children in order. Empty for unknown keys.
    pub fn children(&self, node: NodeKey) -> &[NodeKey] {
        self.nodes
            .get(&node)
            .map(|data| data.children.as_slice())
            .unwrap_or(&[])
    }

    /// Number of children.
    pub fn child_count(&self, node: NodeKey) -> usize {
        self.children(node).len()
    }

    /// Children exposing kind `K`, in order.
    pub fn children_of<K: NodeKind>(&self, node: NodeKey) -> Vec<NodeKey> {
        self.children_where(node, |tree, child| K::matches(tree, child))
    }

    /// Children satisfying `predicate`, in order.
    pub fn children_where(
        &self,
        node: NodeKey,
        predicate: impl Fn(&Tree, NodeKey) -> bool,
    ) -> Vec<NodeKey> {
        self.children(node)
            .iter()
            .copied()
            .filter(|child| predicate(self, *child))
            .collect()
    }

    /// Look up a direct child by id. An empty id resolves to `node` itself.
    pub fn local_child(&self, node: NodeKey, id: &str) -> Option<NodeKey> {
        let data = self.nodes.get(&node)?;
        if id.is_empty() {
            return Some(node);
        }
        data.children_by_id.get(id).copied()
    }

    /// The first (or, with `reverse`, last) child.
    pub fn first_child(&self, node: NodeKey, reverse: bool) -> Option<NodeKey> {
        let children = self.children(node);
        if reverse {
            children.last().copied()
        } else {
            children.first().copied()
        }
    }

    /// The first child of kind `K` satisfying `predicate`, scanning from the
    /// back when `reverse` is set.
    pub fn find_child<K: NodeKind>(
        &self,
        node: NodeKey,
        predicate: impl Fn(&Tree, NodeKey) -> bool,
        reverse: bool,
    ) -> Option<NodeKey> {
        let matches = |child: &&NodeKey| K::matches(self, **child) && predicate(self, **child);
        let children = self.children(node);
        if reverse {
            children.iter().rev().find(matches).copied()
        } else {
            children.iter().find(matches).copied()
        }
    }

    /// Returns `true` if `child` is a direct child of `parent`.
    pub fn has_child(&self, parent: NodeKey, child: NodeKey) -> bool {
        self.parent(child) == Some(parent) && self.contains(parent)
    }

    /// The topmost ancestor of `node` (the node itself when it has no parent).
    pub fn root_of(&self, node: NodeKey) -> Option<NodeKey> {
        if !self.contains(node) {
            return None;
        }
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        Some(current)
    }

    /// Returns `true` if `candidate` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, node: NodeKey, candidate: NodeKey) -> bool {
        let mut current = self.parent(node);
        while let Some(ancestor) = current {
            if ancestor == candidate {
                return true;
            }
            current = self.parent(ancestor);
        }
        false
    }

    /// Strict ancestors of `node`, nearest first.
    pub fn ancestors(&self, node: NodeKey) -> Vec<NodeKey> {
        let mut result = Vec::new();
        let mut current = self.parent(node);
        while let Some(ancestor) = current {
            result.push(ancestor);
            current = self.parent(ancestor);
        }
        result
    }

    /// Borrow the node's payload as `P`.
    pub fn payload<P: 'static>(&self, node: NodeKey) -> Option<&P> {
        self.nodes.get(&node)?.payload.as_ref()?.downcast_ref::<P>()
    }

    /// Mutably borrow the node's payload as `P`.
    pub fn payload_mut<P: 'static>(&mut self, node: NodeKey) -> Option<&mut P> {
        self.nodes.get_mut(&node)?.payload.as_mut()?.downcast_mut::<P>()
    }

    /// Type name of the node's payload, if it has one.
    pub fn payload_type_name(&self, node: NodeKey) -> Option<&'static str> {
        self.nodes
            .get(&node)?
            .payload
            .as_ref()
            .map(PayloadBox::type_name)
    }

    /// Inspector description of the node.
    pub fn debug_info(&self, node: NodeKey) -> DebugInfo {
        self.nodes
            .get(&node)
            .and_then(|data| data.payload.as_ref())
            .map(|payload| payload.describe(self))
            .unwrap_or_default()
    }

    /// Keys currently waiting in the node's admission queue, oldest first.
    pub fn queued_children(&self, node: NodeKey) -> Vec<NodeKey> {
        self.nodes
            .get(&node)
            .map(|data| data.queued.references(Availability::All))
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------
    // Structural mutation
    // ---------------------------------------------------------------

    /// Check whether `child` may be added under `parent`.
    pub fn can_add_child(&self, parent: NodeKey, child: NodeKey) -> TreeResult<()> {
        let parent_data = self.node(parent)?;
        let child_data = self.node(child)?;

        if parent == child {
            return Err(TreeError::SelfParenting(child));
        }
        if parent_data.children_by_id.contains_key(&child_data.id) {
            return Err(TreeError::DuplicateId {
                parent,
                id: child_data.id.clone(),
            });
        }
        if parent_data.condition != Condition::Available {
            return Err(TreeError::ParentNotAvailable {
                parent,
                condition: parent_data.condition,
            });
        }
        if self.is_ancestor(parent, child) {
            return Err(TreeError::CycleDetected { parent, child });
        }
        Ok(())
    }

    /// Append `child` to `parent`, detaching it from any previous parent.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> TreeResult<()> {
        if let Err(err) = self.can_add_child(parent, child) {
            return self.reject(err);
        }

        if let Some(previous) = self.parent(child) {
            self.remove_child(previous, child)?;
            // Listeners of the removal may have changed the picture.
            if let Err(err) = self.can_add_child(parent, child) {
                return self.reject(err);
            }
        }

        let id = self.node(child)?.id.clone();
        let parent_data = self.node_mut(parent)?;
        let index = parent_data.children.len();
        parent_data.children.push(child);
        parent_data.children_by_id.insert(id, child);
        self.node_mut(child)?.parent = Some(parent);
        debug!(parent = ?parent, child = ?child, index, "child added");
        self.release_from_queues(child);

        self.emit(
            parent,
            NodeEvent::ChildAdded {
                parent,
                child,
                index,
            },
        );
        self.notify_structure_changed(child, Some(parent), None);
        self.emit(
            child,
            NodeEvent::NewParentSet {
                child,
                new_parent: Some(parent),
                old_parent: None,
            },
        );
        Ok(())
    }

    /// Add each of `children` in order, stopping at the first failure.
    pub fn add_children(&mut self, parent: NodeKey, children: &[NodeKey]) -> TreeResult<()> {
        for child in children {
            self.add_child(parent, *child)?;
        }
        Ok(())
    }

    /// Add `child` now if possible, otherwise park it until a sibling leaves.
    ///
    /// Missing keys, self-parenting and a disposed parent can never become
    /// admissible and are rejected instead of queued.
    pub fn queue_child(&mut self, parent: NodeKey, child: NodeKey) -> TreeResult<()> {
        match self.can_add_child(parent, child) {
            Ok(()) => self.add_child(parent, child),
            Err(err @ (TreeError::NodeNotFound(_) | TreeError::SelfParenting(_))) => {
                self.reject(err)
            }
            Err(TreeError::ParentNotAvailable { parent, condition }) if condition.is_disposed() => {
                self.reject(TreeError::ParentNotAvailable { parent, condition })
            }
            Err(reason) => {
                let queued = self.node(parent)?.queued.clone();
                if queued.contains(child) {
                    return Ok(());
                }
                debug!(parent = ?parent, child = ?child, reason = %reason, "child queued");
                queued.add(self, child)
            }
        }
    }

    /// Drop `child` from every admission queue once it has a parent.
    fn release_from_queues(&mut self, child: NodeKey) {
        let queues: Vec<ReferenceSet> = self
            .nodes
            .values()
            .filter(|data| data.queued.contains(child))
            .map(|data| data.queued.clone())
            .collect();
        for queued in queues {
            let _ = queued.remove(self, child);
        }
    }

    /// Try to admit every queued child of `parent`, most recently queued
    /// first. Returns how many were admitted.
    pub fn retry_queued(&mut self, parent: NodeKey) -> usize {
        let Some(queued) = self.nodes.get(&parent).map(|data| data.queued.clone()) else {
            return 0;
        };

        let mut admitted = 0;
        for pending in queued.references(Availability::All).into_iter().rev() {
            if self.can_add_child(parent, pending).is_ok() && self.add_child(parent, pending).is_ok() {
                admitted += 1;
                if queued.contains(pending) {
                    let _ = queued.remove(self, pending);
                }
            }
        }
        admitted
    }

    /// Check whether `parent` has a child with `id`.
    pub fn can_remove_child(&self, parent: NodeKey, id: &str) -> TreeResult<()> {
        let data = self.node(parent)?;
        if id.is_empty() || !data.children_by_id.contains_key(id) {
            return Err(TreeError::NotAChild {
                parent,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Detach `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> TreeResult<()> {
        let id = match self.node(child) {
            Ok(data) => data.id.clone(),
            Err(err) => return self.reject(err),
        };
        if let Err(err) = self.can_remove_child(parent, &id) {
            return self.reject(err);
        }
        if self.local_child(parent, &id) != Some(child) {
            return self.reject(TreeError::NotAChild { parent, id });
        }
        self.detach(parent, child, &id)
    }

    /// Detach the child of `parent` whose id is `id`.
    pub fn remove_child_by_id(&mut self, parent: NodeKey, id: &str) -> TreeResult<()> {
        if let Err(err) = self.can_remove_child(parent, id) {
            return self.reject(err);
        }
        match self.local_child(parent, id) {
            Some(child) => self.detach(parent, child, id),
            None => self.reject(TreeError::NotAChild {
                parent,
                id: id.to_string(),
            }),
        }
    }

    /// Re-parent `child`: `Some(p)` adds it under `p`, `None` detaches it.
    pub fn set_parent(&mut self, child: NodeKey, parent: Option<NodeKey>) -> TreeResult<()> {
        match parent {
            Some(parent) => self.add_child(parent, child),
            None => match self.parent(child) {
                Some(previous) => self.remove_child(previous, child),
                None => Ok(()),
            },
        }
    }

    fn detach(&mut self, parent: NodeKey, child: NodeKey, id: &str) -> TreeResult<()> {
        let parent_data = self.node_mut(parent)?;
        let Some(index) = parent_data.children.iter().position(|c| *c == child) else {
            return Err(TreeError::NotAChild {
                parent,
                id: id.to_string(),
            });
        };
        parent_data.children.remove(index);
        parent_data.children_by_id.remove(id);
        self.node_mut(child)?.parent = None;
        debug!(parent = ?parent, child = ?child, index, "child removed");

        self.emit(
            parent,
            NodeEvent::ChildRemoved {
                parent,
                child,
                index,
            },
        );
        self.notify_structure_changed(child, None, Some(parent));
        self.emit(
            child,
            NodeEvent::NewParentSet {
                child,
                new_parent: None,
                old_parent: Some(parent),
            },
        );

        self.retry_queued(parent);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Condition and disposal
    // ---------------------------------------------------------------

    /// Check whether `node` may enter `condition`.
    pub fn can_set_condition(&self, node: NodeKey, condition: Condition) -> TreeResult<()> {
        self.node(node)?.condition.can_transition_to(condition)?;
        Ok(())
    }

    /// Toggle between `Available` and `Unavailable`. Re-applying the
    /// current condition is a no-op.
    pub fn set_available(&mut self, node: NodeKey, available: bool) -> TreeResult<()> {
        let target = if available {
            Condition::Available
        } else {
            Condition::Unavailable
        };
        match self.node(node) {
            Ok(data) if data.condition == target => Ok(()),
            Ok(_) => self.set_condition(node, target),
            Err(err) => self.reject(err),
        }
    }

    fn set_condition(&mut self, node: NodeKey, condition: Condition) -> TreeResult<()> {
        if let Err(err) = self.can_set_condition(node, condition) {
            return self.reject(err);
        }
        let data = self.node_mut(node)?;
        let previous = data.condition;
        data.condition = condition;
        debug!(node = ?node, from = %previous, to = %condition, "condition changed");

        self.emit(
            node,
            NodeEvent::ConditionChanged {
                node,
                new: condition,
                previous,
            },
        );
        Ok(())
    }

    /// Dispose `node` and its whole subtree.
    ///
    /// Returns `false` without doing anything if the node is unknown or
    /// already disposed. Otherwise the node enters `Destroying`, announces
    /// `StartedDispose`, detaches from its parent, disposes its queued
    /// children and then its children in reverse order, enters `Destroyed`,
    /// announces `Disposed`, and finally loses every subscription and its
    /// arena slot.
    pub fn dispose(&mut self, node: NodeKey) -> bool {
        match self.nodes.get(&node) {
            None => {
                debug!(node = ?node, "dispose ignored: unknown node");
                return false;
            }
            Some(data) if data.condition.is_disposed() => {
                debug!(node = ?node, condition = %data.condition, "dispose ignored: already disposed");
                return false;
            }
            Some(_) => {}
        }

        if self.set_condition(node, Condition::Destroying).is_err() {
            return false;
        }
        self.emit(node, NodeEvent::StartedDispose { node });

        // Errors are already logged by the tree.
        let _ = self.set_parent(node, None);

        if let Some(queued) = self.nodes.get(&node).map(|data| data.queued.clone()) {
            // Queued nodes owned elsewhere are only released.
            for pending in queued.references(Availability::All).into_iter().rev() {
                if self.parent(pending).is_none() {
                    self.dispose(pending);
                }
            }
            queued.dispose(self);
        }

        let children = self.children(node).to_vec();
        for child in children.into_iter().rev() {
            self.dispose(child);
        }

        let _ = self.set_condition(node, Condition::Destroyed);
        self.emit(node, NodeEvent::Disposed { node });

        let dropped = self.bus.clear_node(node);
        self.nodes.remove(&node);
        debug!(node = ?node, dropped_listeners = dropped, "node disposed");
        true
    }

    // ---------------------------------------------------------------
    // Ordering
    // ---------------------------------------------------------------

    /// Position of `child` among the children of `parent`.
    pub fn child_index(&self, parent: NodeKey, child: NodeKey) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    /// Returns `true` if `index` addresses an existing child.
    pub fn is_child_index_in_range(&self, parent: NodeKey, index: usize) -> bool {
        index < self.child_count(parent)
    }

    /// Move `child` to `index` among its siblings.
    pub fn set_child_index(&mut self, parent: NodeKey, child: NodeKey, index: usize) -> TreeResult<()> {
        let Some(current) = self.child_index(parent, child) else {
            let id = self.id(child).unwrap_or_default().to_string();
            return self.reject(TreeError::NotAChild { parent, id });
        };
        let len = self.child_count(parent);
        if index >= len {
            return self.reject(TreeError::IndexOutOfRange { index, len });
        }

        let children = &mut self.node_mut(parent)?.children;
        children.remove(current);
        children.insert(index, child);
        debug!(parent = ?parent, child = ?child, from = current, to = index, "child reordered");
        Ok(())
    }

    /// Swap the children at positions `a` and `b`.
    pub fn swap_children(&mut self, parent: NodeKey, a: usize, b: usize) -> TreeResult<()> {
        let len = self.child_count(parent);
        for index in [a, b] {
            if !self.is_child_index_in_range(parent, index) {
                return self.reject(TreeError::IndexOutOfRange { index, len });
            }
        }
        self.node_mut(parent)?.children.swap(a, b);
        Ok(())
    }

    /// Swap two children by identity.
    pub fn swap_child_nodes(&mut self, parent: NodeKey, a: NodeKey, b: NodeKey) -> TreeResult<()> {
        let mut indices = [0; 2];
        for (slot, child) in indices.iter_mut().zip([a, b]) {
            match self.child_index(parent, child) {
                Some(index) => *slot = index,
                None => {
                    let id = self.id(child).unwrap_or_default().to_string();
                    return self.reject(TreeError::NotAChild { parent, id });
                }
            }
        }
        self.swap_children(parent, indices[0], indices[1])
    }

    // ---------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------

    /// Register `listener` for `kind` notifications on `node`.
    ///
    /// Subscribing to an unknown node yields an inert token.
    pub fn subscribe(
        &mut self,
        node: NodeKey,
        kind: EventKind,
        listener: impl Fn(&mut Tree, &NodeEvent) + 'static,
    ) -> Subscription {
        if !self.contains(node) {
            debug!(node = ?node, ?kind, "subscription to unknown node is inert");
            return Subscription {
                id: crate::signal::ListenerId::next(),
                node,
                kind,
            };
        }
        self.bus.subscribe(node, kind, Rc::new(listener))
    }

    /// Register a listener for custom events of type `E` on `node`.
    pub fn subscribe_custom<E: 'static>(
        &mut self,
        node: NodeKey,
        listener: impl Fn(&mut Tree, &E) + 'static,
    ) -> Subscription {
        self.subscribe(node, EventKind::custom::<E>(), move |tree, event| {
            if let Some(payload) = event.downcast::<E>() {
                listener(tree, payload);
            }
        })
    }

    /// Remove a registration. Returns `false` if it was not active.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.bus.unsubscribe(subscription)
    }

    /// Number of listeners registered on `node`.
    pub fn listener_count(&self, node: NodeKey) -> usize {
        self.bus.listener_count(node)
    }

    /// Emit a custom event on `node`.
    pub fn emit_custom<E: 'static>(&mut self, node: NodeKey, event: E) {
        self.emit(node, NodeEvent::custom(node, event));
    }

    fn emit(&mut self, node: NodeKey, event: NodeEvent) {
        let kind = event.kind();
        for (id, listener) in self.bus.snapshot(node, kind) {
            if self.bus.is_connected(node, kind, id) {
                listener(self, &event);
            }
        }
    }

    fn notify_structure_changed(
        &mut self,
        source: NodeKey,
        new_parent: Option<NodeKey>,
        old_parent: Option<NodeKey>,
    ) {
        self.propagate_structure_change(source, source, new_parent, old_parent);

        let mut ancestor = new_parent.or(old_parent);
        while let Some(affected) = ancestor {
            self.emit(
                affected,
                NodeEvent::TreeStructureChanged {
                    affected,
                    source,
                    new_parent,
                    old_parent,
                },
            );
            ancestor = self.parent(affected);
        }
    }

    fn propagate_structure_change(
        &mut self,
        affected: NodeKey,
        source: NodeKey,
        new_parent: Option<NodeKey>,
        old_parent: Option<NodeKey>,
    ) {
        self.emit(
            affected,
            NodeEvent::TreeStructureChanged {
                affected,
                source,
                new_parent,
                old_parent,
            },
        );
        let children = self.children(affected).to_vec();
        for child in children {
            self.propagate_structure_change(child, source, new_parent, old_parent);
        }
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    fn node(&self, key: NodeKey) -> TreeResult<&NodeData> {
        self.nodes.get(&key).ok_or(TreeError::NodeNotFound(key))
    }

    fn node_mut(&mut self, key: NodeKey) -> TreeResult<&mut NodeData> {
        self.nodes.get_mut(&key).ok_or(TreeError::NodeNotFound(key))
    }

    pub(crate) fn reject<T>(&self, err: TreeError) -> TreeResult<T> {
        warn!(error = %err, "tree operation rejected");
        Err(err)
    }
}
