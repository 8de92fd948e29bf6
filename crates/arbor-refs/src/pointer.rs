//! References set directly by the caller.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, warn};

use arbor_tree::{
    AnyNode, Condition, EventKind, Listener, ListenerId, NodeEvent, NodeKey, NodeKind, Tree,
};

use crate::kernel::RefCore;
use crate::traits::{resolves_as, InstanceChange, NodeRef};

/// Holds exactly the node it was given.
///
/// A pointer never re-resolves on structural changes. It only clears when
/// its target starts disposal.
pub struct PointerRef<K: NodeKind = AnyNode> {
    core: RefCore<()>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: NodeKind> Clone for PointerRef<K> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: NodeKind> fmt::Debug for PointerRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerRef")
            .field("instance", &self.core.instance())
            .finish()
    }
}

impl<K: NodeKind> PointerRef<K> {
    pub fn new(tree: &mut Tree, target: Option<NodeKey>) -> Self {
        let reference = Self {
            core: RefCore::new(()),
            _kind: PhantomData,
        };
        reference.set_target(tree, target);
        reference
    }

    /// Replace the target. A target that is gone or does not expose `K`
    /// leaves the pointer empty.
    pub fn set_target(&self, tree: &mut Tree, target: Option<NodeKey>) {
        Self::point(&self.core, tree, target);
    }

    fn point(core: &RefCore<()>, tree: &mut Tree, target: Option<NodeKey>) {
        if core.is_disposed() {
            debug!(?target, "ignoring target of disposed pointer");
            return;
        }
        let target = target.filter(|node| {
            let ok = resolves_as::<K>(tree, *node);
            if !ok {
                warn!(node = ?node, expected = type_name::<K>(), "pointer target rejected");
            }
            ok
        });
        if target == core.instance() {
            return;
        }

        let mut watch = Vec::new();
        if let Some(node) = target {
            let weak = core.downgrade();
            watch.push(tree.subscribe(node, EventKind::ConditionChanged, move |tree, event| {
                if let (Some(core), NodeEvent::ConditionChanged { new: Condition::Destroying, .. }) =
                    (RefCore::upgrade(&weak), event)
                {
                    Self::point(&core, tree, None);
                }
            }));
        }
        core.replace_watch(tree, watch);
        core.set_instance(tree, target);
    }
}

impl<K: NodeKind> NodeRef for PointerRef<K> {
    fn instance(&self) -> Option<NodeKey> {
        self.core.instance()
    }

    fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    fn on_instance_changed(&self, listener: Listener<InstanceChange>) -> ListenerId {
        self.core.connect_instance_changed(listener)
    }

    fn on_disposed(&self, listener: Listener<()>) -> ListenerId {
        self.core.connect_disposed(listener)
    }

    fn disconnect(&self, id: ListenerId) -> bool {
        self.core.disconnect(id)
    }

    fn dispose(&self, tree: &mut Tree) {
        self.core.dispose(tree);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use arbor_tree::ValueNode;

    use super::*;

    #[test]
    fn holds_target_across_moves() {
        let mut tree = Tree::new();
        let left = tree.create_node("left");
        let right = tree.create_node("right");
        let target = tree.create_node("t");
        tree.add_child(left, target).unwrap();

        let pointer: PointerRef = PointerRef::new(&mut tree, Some(target));
        tree.add_child(right, target).unwrap();
        tree.remove_child(right, target).unwrap();
        assert_eq!(pointer.instance(), Some(target));
    }

    #[test]
    fn clears_when_target_starts_disposal() {
        let mut tree = Tree::new();
        let target = tree.create_node("t");
        let pointer: PointerRef = PointerRef::new(&mut tree, Some(target));
        let changes = Rc::new(RefCell::new(Vec::new()));
        let c = changes.clone();
        pointer.on_instance_changed(Rc::new(move |tree: &mut Tree, change: &InstanceChange| {
            c.borrow_mut().push((change.old.map(|n| tree.condition(n)), change.new));
        }));

        tree.dispose(target);
        assert_eq!(pointer.instance(), None);
        assert!(!pointer.is_disposed());
        assert_eq!(*changes.borrow(), vec![(Some(Condition::Destroying), None)]);
    }

    #[test]
    fn set_target_swaps_watch() {
        let mut tree = Tree::new();
        let first = tree.create_node("first");
        let second = tree.create_node("second");
        let pointer: PointerRef = PointerRef::new(&mut tree, Some(first));
        assert_eq!(tree.listener_count(first), 1);

        pointer.set_target(&mut tree, Some(second));
        assert_eq!(tree.listener_count(first), 0);
        assert_eq!(tree.listener_count(second), 1);

        tree.dispose(first);
        assert_eq!(pointer.instance(), Some(second));
    }

    #[test]
    fn identical_target_does_not_notify() {
        let mut tree = Tree::new();
        let target = tree.create_node("t");
        let pointer: PointerRef = PointerRef::new(&mut tree, None);
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        pointer.on_instance_changed(Rc::new(move |_: &mut Tree, _: &InstanceChange| {
            *h.borrow_mut() += 1
        }));

        pointer.set_target(&mut tree, Some(target));
        pointer.set_target(&mut tree, Some(target));
        pointer.set_target(&mut tree, None);
        pointer.set_target(&mut tree, None);
        assert_eq!(*hits.borrow(), 2);
    }

    #[test]
    fn kind_mismatch_resolves_to_absent() {
        let mut tree = Tree::new();
        let plain = tree.create_node("plain");
        let value = ValueNode::create(&mut tree, "v", 0u16);

        let pointer: PointerRef<ValueNode<u16>> = PointerRef::new(&mut tree, Some(plain));
        assert!(!pointer.has_instance());
        pointer.set_target(&mut tree, Some(value.key()));
        assert_eq!(pointer.instance(), Some(value.key()));
    }

    #[test]
    fn disposed_pointer_ignores_new_targets() {
        let mut tree = Tree::new();
        let target = tree.create_node("t");
        let pointer: PointerRef = PointerRef::new(&mut tree, Some(target));
        let disposals = Rc::new(RefCell::new(0));
        let d = disposals.clone();
        pointer.on_disposed(Rc::new(move |_: &mut Tree, _: &()| *d.borrow_mut() += 1));

        pointer.dispose(&mut tree);
        pointer.dispose(&mut tree);
        pointer.set_target(&mut tree, Some(target));
        assert_eq!(pointer.instance(), None);
        assert_eq!(*disposals.borrow(), 1);
        assert_eq!(tree.listener_count(target), 0);
        assert!(tree.contains(target));
    }

    #[test]
    fn usable_as_trait_object() {
        let mut tree = Tree::new();
        let target = tree.create_node("t");
        let refs: Vec<Box<dyn NodeRef>> = vec![
            Box::new(PointerRef::<AnyNode>::new(&mut tree, Some(target))),
            Box::new(crate::LocalRef::<AnyNode>::new(&mut tree, target, "")),
        ];
        assert!(refs.iter().all(|r| r.instance() == Some(target)));
        for r in &refs {
            r.dispose(&mut tree);
        }
        assert_eq!(tree.listener_count(target), 0);
    }
}
