//! Nodes that hold a value.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use arbor_types::NodeKey;

use crate::error::{TreeError, TreeResult};
use crate::event::Subscription;
use crate::kind::{DebugInfo, NodeKind, Payload};
use crate::tree::Tree;

/// Values a [`ValueNode`] can hold.
pub trait ValueType: Clone + PartialEq + fmt::Debug + 'static {}

impl<T: Clone + PartialEq + fmt::Debug + 'static> ValueType for T {}

/// Payload of a value node.
#[derive(Debug)]
pub struct ValueCell<T> {
    value: T,
}

impl<T: ValueType> Payload for ValueCell<T> {
    fn debug_info(&self, _tree: &Tree) -> DebugInfo {
        DebugInfo::new(format!("{:?}", self.value), type_name::<T>())
    }
}

/// Emitted before a differing value is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueWillChange<T> {
    pub new: T,
    pub old: T,
}

/// Emitted after a differing value was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChanged<T> {
    pub new: T,
    pub old: T,
}

/// Emitted on every `set_value`, whether or not the value changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSet<T> {
    pub value: T,
}

/// Typed handle over a node carrying a [`ValueCell<T>`].
pub struct ValueNode<T> {
    key: NodeKey,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for ValueNode<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ValueNode<T> {}

impl<T> PartialEq for ValueNode<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for ValueNode<T> {}

impl<T> fmt::Debug for ValueNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueNode").field(&self.key).finish()
    }
}

impl<T: ValueType> NodeKind for ValueNode<T> {
    fn matches(tree: &Tree, node: NodeKey) -> bool {
        tree.payload::<ValueCell<T>>(node).is_some()
    }
}

impl<T: ValueType> ValueNode<T> {
    /// Create a detached value node holding `initial`.
    pub fn create(tree: &mut Tree, id: impl Into<String>, initial: T) -> Self {
        let key = tree.create_node_with(id, ValueCell { value: initial });
        Self {
            key,
            _value: PhantomData,
        }
    }

    /// Wrap an existing node, if it holds a `T`.
    pub fn from_key(tree: &Tree, key: NodeKey) -> Option<Self> {
        Self::matches(tree, key).then_some(Self {
            key,
            _value: PhantomData,
        })
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// The current value, or `None` once the node is gone.
    pub fn value<'t>(&self, tree: &'t Tree) -> Option<&'t T> {
        tree.payload::<ValueCell<T>>(self.key).map(|cell| &cell.value)
    }

    /// Store `value`.
    ///
    /// A differing value is bracketed by [`ValueWillChange`] and
    /// [`ValueChanged`]. [`ValueSet`] follows unconditionally.
    pub fn set_value(&self, tree: &mut Tree, value: T) -> TreeResult<()> {
        let Some(old) = self.value(tree).cloned() else {
            let err = if tree.contains(self.key) {
                TreeError::KindMismatch {
                    node: self.key,
                    expected: type_name::<T>(),
                }
            } else {
                TreeError::NodeNotFound(self.key)
            };
            return tree.reject(err);
        };

        if old != value {
            tree.emit_custom(
                self.key,
                ValueWillChange {
                    new: value.clone(),
                    old: old.clone(),
                },
            );
            // A listener may have disposed the node.
            if let Some(cell) = tree.payload_mut::<ValueCell<T>>(self.key) {
                cell.value = value.clone();
            }
            debug!(node = ?self.key, ?old, new = ?value, "value changed");
            tree.emit_custom(
                self.key,
                ValueChanged {
                    new: value.clone(),
                    old,
                },
            );
        }

        tree.emit_custom(self.key, ValueSet { value });
        Ok(())
    }

    pub fn on_will_change(
        &self,
        tree: &mut Tree,
        listener: impl Fn(&mut Tree, &ValueWillChange<T>) + 'static,
    ) -> Subscription {
        tree.subscribe_custom(self.key, listener)
    }

    pub fn on_changed(
        &self,
        tree: &mut Tree,
        listener: impl Fn(&mut Tree, &ValueChanged<T>) + 'static,
    ) -> Subscription {
        tree.subscribe_custom(self.key, listener)
    }

    pub fn on_set(
        &self,
        tree: &mut Tree,
        listener: impl Fn(&mut Tree, &ValueSet<T>) + 'static,
    ) -> Subscription {
        tree.subscribe_custom(self.key, listener)
    }
}
