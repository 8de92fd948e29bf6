//! Layer roots and root holders.

use tracing::debug;

use arbor_refs::{NodeRef, PointerRef};
use arbor_tree::{NodeKey, Tree};

/// Builds one root node per layer and tears them down in reverse order.
pub struct LayerBootstrapper<L> {
    layers: Vec<(L, PointerRef)>,
}

impl<L: PartialEq> LayerBootstrapper<L> {
    /// Call `factory` once per layer, in order, and keep a pointer to each
    /// root it returns.
    pub fn new(
        tree: &mut Tree,
        layers: impl IntoIterator<Item = L>,
        factory: impl Fn(&mut Tree, &L) -> NodeKey,
    ) -> Self {
        let layers = layers
            .into_iter()
            .map(|layer| {
                let root = factory(tree, &layer);
                (layer, PointerRef::new(tree, Some(root)))
            })
            .collect::<Vec<_>>();
        debug!(layers = layers.len(), "layers bootstrapped");
        Self { layers }
    }

    /// The root of `layer`, while it is live.
    pub fn layer_root(&self, layer: &L) -> Option<NodeKey> {
        self.layers
            .iter()
            .find(|(label, _)| label == layer)
            .and_then(|(_, root)| root.instance())
    }

    pub fn layers(&self) -> impl Iterator<Item = &L> {
        self.layers.iter().map(|(label, _)| label)
    }

    /// Live layer roots in creation order.
    pub fn roots(&self) -> Vec<NodeKey> {
        self.layers
            .iter()
            .filter_map(|(_, root)| root.instance())
            .collect()
    }

    /// Dispose every layer root, last layer first, then the pointers.
    pub fn shutdown(self, tree: &mut Tree) {
        for (_, root) in self.layers.iter().rev() {
            if let Some(node) = root.instance() {
                tree.dispose(node);
            }
            root.dispose(tree);
        }
        debug!("layers shut down");
    }
}

/// Keeps a pointer to a root node for a display surface.
pub struct RootHolder {
    root: PointerRef,
    name: String,
}

impl RootHolder {
    pub fn new(tree: &mut Tree, root: NodeKey) -> Self {
        let name = tree.id(root).unwrap_or_default().to_string();
        Self {
            root: PointerRef::new(tree, Some(root)),
            name,
        }
    }

    pub fn root(&self) -> Option<NodeKey> {
        self.root.instance()
    }

    pub fn has_root(&self) -> bool {
        self.root.has_instance()
    }

    /// Id of the root at the time the holder was created.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn release(&self, tree: &mut Tree) {
        self.root.dispose(tree);
    }
}
