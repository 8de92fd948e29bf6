//! References to a direct child of a container, by id.

use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use arbor_tree::{
    AnyNode, Condition, EventKind, Listener, ListenerId, NodeEvent, NodeKey, NodeKind, Tree,
};

use crate::kernel::RefCore;
use crate::traits::{resolves_as, InstanceChange, NodeRef};

struct LocalState {
    container: NodeKey,
    id: String,
}

/// Tracks the child of `container` whose id is `id`.
///
/// While unresolved the reference only watches the container for new
/// children; once resolved it only watches the instance for a parent change.
/// The container starting disposal disposes the reference.
pub struct LocalRef<K: NodeKind = AnyNode> {
    core: RefCore<LocalState>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: NodeKind> Clone for LocalRef<K> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: NodeKind> fmt::Debug for LocalRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRef")
            .field("container", &self.container())
            .field("id", &self.target_id())
            .field("instance", &self.core.instance())
            .finish()
    }
}

impl<K: NodeKind> LocalRef<K> {
    /// Create a reference to the child `id` of `container`.
    ///
    /// A missing container yields a reference that never resolves.
    pub fn new(tree: &mut Tree, container: NodeKey, id: impl Into<String>) -> Self {
        let core = RefCore::new(LocalState {
            container,
            id: id.into(),
        });
        let reference = Self {
            core,
            _kind: PhantomData,
        };

        if tree.condition(container).is_disposed() {
            debug!(container = ?container, "local reference container is gone");
            return reference;
        }

        let weak = reference.core.downgrade();
        let sub = tree.subscribe(container, EventKind::ConditionChanged, move |tree, event| {
            if let (Some(core), NodeEvent::ConditionChanged { new: Condition::Destroying, .. }) =
                (RefCore::upgrade(&weak), event)
            {
                core.dispose(tree);
            }
        });
        reference.core.anchor(sub);

        Self::resolve(&reference.core, tree);
        reference
    }

    pub fn container(&self) -> NodeKey {
        self.core.read(|state| state.container)
    }

    pub fn target_id(&self) -> String {
        self.core.read(|state| state.id.clone())
    }

    fn resolve(core: &RefCore<LocalState>, tree: &mut Tree) {
        if core.is_disposed() {
            return;
        }
        let (container, id) = core.read(|state| (state.container, state.id.clone()));
        let found = tree
            .local_child(container, &id)
            .filter(|node| resolves_as::<K>(tree, *node));

        let weak = core.downgrade();
        let watch = match found {
            Some(instance) => tree.subscribe(instance, EventKind::NewParentSet, move |tree, event| {
                if let (Some(core), NodeEvent::NewParentSet { new_parent, .. }) =
                    (RefCore::upgrade(&weak), event)
                {
                    if *new_parent != Some(container) {
                        Self::resolve(&core, tree);
                    }
                }
            }),
            None => tree.subscribe(container, EventKind::ChildAdded, move |tree, event| {
                let (Some(core), NodeEvent::ChildAdded { child, .. }) = (RefCore::upgrade(&weak), event)
                else {
                    return;
                };
                let wanted = core.read(|state| tree.id(*child) == Some(state.id.as_str()));
                if wanted {
                    Self::resolve(&core, tree);
                }
            }),
        };
        core.replace_watch(tree, vec![watch]);
        core.set_instance(tree, found);
    }
}

impl<K: NodeKind> NodeRef for LocalRef<K> {
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
