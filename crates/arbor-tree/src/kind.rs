//! Capability queries and node payloads.
//!
//! Nodes are untyped in the arena. A node gains a capability by carrying a
//! [`Payload`]; a [`NodeKind`] answers "does this node expose capability
//! `K`" so that typed child lookups, references and reference sets can filter
//! nodes without casts.

use std::any::{type_name, Any};

use arbor_types::NodeKey;

use crate::tree::Tree;

/// A capability a node may expose.
pub trait NodeKind: 'static {
    /// Returns `true` if `node` is live in `tree` and exposes this kind.
    fn matches(tree: &Tree, node: NodeKey) -> bool;
}

/// The kind every live node has.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnyNode;

impl NodeKind for AnyNode {
    fn matches(tree: &Tree, node: NodeKey) -> bool {
        tree.contains(node)
    }
}

/// Human-readable description of a node for inspectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugInfo {
    /// One-line summary.
    pub summary: String,
    /// Longer free-form details.
    pub details: String,
}

impl DebugInfo {
    pub fn new(summary: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            details: details.into(),
        }
    }
}

impl Default for DebugInfo {
    fn default() -> Self {
        Self::new("-", "")
    }
}

/// Typed data attached to a node.
pub trait Payload: Any {
    /// Describe the payload for inspectors.
    fn debug_info(&self, _tree: &Tree) -> DebugInfo {
        DebugInfo::default()
    }
}

/// Type-erased payload plus the monomorphized describer for it.
pub(crate) struct PayloadBox {
    value: Box<dyn Any>,
    describe: fn(&dyn Any, &Tree) -> DebugInfo,
    type_name: &'static str,
}

impl PayloadBox {
    pub(crate) fn new<P: Payload>(payload: P) -> Self {
        Self {
            value: Box::new(payload),
            describe: describe_as::<P>,
            type_name: type_name::<P>(),
        }
    }

    pub(crate) fn downcast_ref<P: 'static>(&self) -> Option<&P> {
        self.value.downcast_ref::<P>()
    }

    pub(crate) fn downcast_mut<P: 'static>(&mut self) -> Option<&mut P> {
        self.value.downcast_mut::<P>()
    }

    pub(crate) fn describe(&self, tree: &Tree) -> DebugInfo {
        (self.describe)(self.value.as_ref(), tree)
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }
}

fn describe_as<P: Payload>(value: &dyn Any, tree: &Tree) -> DebugInfo {
    value
        .downcast_ref::<P>()
        .map(|payload| payload.debug_info(tree))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Label(&'static str);

    impl Payload for Label {
        fn debug_info(&self, _tree: &Tree) -> DebugInfo {
            DebugInfo::new(self.0, "label")
        }
    }

    struct Plain;

    impl Payload for Plain {}

    #[test]
    fn payload_box_downcasts_to_its_own_type_only() {
        let mut boxed = PayloadBox::new(Label("x"));
        assert!(boxed.downcast_ref::<Label>().is_some());
        assert!(boxed.downcast_ref::<Plain>().is_none());
        assert!(boxed.downcast_mut::<Label>().is_some());
        assert!(boxed.type_name().ends_with("Label"));
    }

    #[test]
    fn describe_uses_payload_impl() {
        let tree = Tree::new();
        assert_eq!(
            PayloadBox::new(Label("hello")).describe(&tree),
            DebugInfo::new("hello", "label")
        );
        assert_eq!(PayloadBox::new(Plain).describe(&tree), DebugInfo::default());
    }

    #[test]
    fn any_node_matches_live_nodes() {
        let mut tree = Tree::new();
        let node = tree.create_node("a");
        assert!(AnyNode::matches(&tree, node));
        tree.dispose(node);
        assert!(!AnyNode::matches(&tree, node));
    }
}
