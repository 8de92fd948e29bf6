//! References that follow a path string from an origin.

use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use arbor_tree::{
    AnyNode, Condition, EventKind, Listener, ListenerId, NodeEvent, NodeKey, NodeKind, Tree,
};

use crate::kernel::RefCore;
use crate::traits::{resolves_as, InstanceChange, NodeRef};

struct PathState {
    origin: NodeKey,
    /// `None` when no path could be computed; such a reference never
    /// resolves.
    path: Option<String>,
}

/// Tracks whatever node `path` leads to from `origin`.
///
/// Every structural change reaching the origin (anything at or below it, or
/// a move of the origin itself) re-evaluates the path, as does every
/// structural change reaching the current instance.
pub struct PathRef<K: NodeKind = AnyNode> {
    core: RefCore<PathState>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: NodeKind> Clone for PathRef<K> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: NodeKind> fmt::Debug for PathRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRef")
            .field("origin", &self.origin())
            .field("path", &self.relative_path())
            .field("instance", &self.core.instance())
            .finish()
    }
}

impl<K: NodeKind> PathRef<K> {
    /// Create a reference to `path` evaluated from `origin`.
    pub fn new(tree: &mut Tree, origin: NodeKey, path: impl Into<String>) -> Self {
        Self::build(tree, origin, Some(path.into()))
    }

    /// Create a reference from `origin` to `target` using the relative path
    /// between them. Nodes in different trees give a reference that never
    /// resolves.
    pub fn to_node(tree: &mut Tree, origin: NodeKey, target: NodeKey) -> Self {
        let path = tree.relative_path(origin, target);
        if path.is_none() {
            debug!(origin = ?origin, target = ?target, "no path between nodes");
        }
        Self::build(tree, origin, path)
    }

    fn build(tree: &mut Tree, origin: NodeKey, path: Option<String>) -> Self {
        let reference = Self {
            core: RefCore::new(PathState { origin, path }),
            _kind: PhantomData,
        };
        if tree.condition(origin).is_disposed() {
            debug!(origin = ?origin, "path reference origin is gone");
            return reference;
        }

        let weak = reference.core.downgrade();
        let on_condition = tree.subscribe(origin, EventKind::ConditionChanged, move |tree, event| {
            if let (Some(core), NodeEvent::ConditionChanged { new: Condition::Destroying, .. }) =
                (RefCore::upgrade(&weak), event)
            {
                core.dispose(tree);
            }
        });
        let weak = reference.core.downgrade();
        let on_structure = tree.subscribe(origin, EventKind::TreeStructureChanged, move |tree, _| {
            if let Some(core) = RefCore::upgrade(&weak) {
                Self::resolve(&core, tree);
            }
        });
        reference.core.anchor(on_condition);
        reference.core.anchor(on_structure);

        Self::resolve(&reference.core, tree);
        reference
    }

    pub fn origin(&self) -> NodeKey {
        self.core.read(|state| state.origin)
    }

    /// The path being followed, or `None` if none could be computed.
    pub fn relative_path(&self) -> Option<String> {
        self.core.read(|state| state.path.clone())
    }

    fn resolve(core: &RefCore<PathState>, tree: &mut Tree) {
        if core.is_disposed() {
            return;
        }
        let (origin, path) = core.read(|state| (state.origin, state.path.clone()));
        let found = path
            .as_deref()
            .and_then(|path| tree.get_node(origin, path))
            .filter(|node| resolves_as::<K>(tree, *node));

        let mut watch = Vec::new();
        if let Some(instance) = found.filter(|node| *node != origin) {
            let weak = core.downgrade();
            watch.push(tree.subscribe(instance, EventKind::TreeStructureChanged, move |tree, _| {
                if let Some(core) = RefCore::upgrade(&weak) {
                    Self::resolve(&core, tree);
                }
            }));
        }
        core.replace_watch(tree, watch);
        if core.set_instance(tree, found) {
            debug!(origin = ?origin, path = ?path, instance = ?found, "path reference re-resolved");
        }
    }
}

impl<K: NodeKind> NodeRef for PathRef<K> {
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
