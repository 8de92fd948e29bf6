//! Path strings.
//!
//! A path is a `/`-separated list of segments evaluated from an origin node:
//! `..` moves to the parent, an empty segment stays put, and any other
//! segment looks up a direct child by id. Ids can never contain `/` or `.`,
//! so every segment is unambiguous.

use arbor_types::NodeKey;

use crate::kind::NodeKind;
use crate::tree::Tree;

/// Path separator.
pub const SEPARATOR: char = '/';

/// Segment that moves to the parent.
pub const PARENT_SEGMENT: &str = "..";

impl Tree {
    /// Resolve `path` relative to `origin`.
    pub fn get_node(&self, origin: NodeKey, path: &str) -> Option<NodeKey> {
        if !self.contains(origin) {
            return None;
        }
        path.split(SEPARATOR).try_fold(origin, |current, segment| match segment {
            "" => Some(current),
            PARENT_SEGMENT => self.parent(current),
            id => self.local_child(current, id),
        })
    }

    /// Resolve `path` and require the target to expose kind `K`.
    pub fn get_node_as<K: NodeKind>(&self, origin: NodeKey, path: &str) -> Option<NodeKey> {
        self.get_node(origin, path)
            .filter(|node| K::matches(self, *node))
    }

    /// Returns `true` if `path` resolves from `origin`.
    pub fn has_node(&self, origin: NodeKey, path: &str) -> bool {
        self.get_node(origin, path).is_some()
    }

    /// Ids from the root's immediate child down to `node`, joined by `/`.
    ///
    /// The root is excluded, so a root's own full path is empty and
    /// `get_node(root_of(n), full_path(n))` always yields `n`.
    pub fn full_path(&self, node: NodeKey) -> Option<String> {
        if !self.contains(node) {
            return None;
        }
        let mut builder = PathBuilder::new();
        let mut chain = vec![node];
        chain.extend(self.ancestors(node));
        chain.pop();
        for key in chain.into_iter().rev() {
            builder.go_down(self.id(key)?);
        }
        Some(builder.build())
    }

    /// Nearest node that is `a` or an ancestor of `a` and also `b` or an
    /// ancestor of `b`.
    pub fn common_ancestor(&self, a: NodeKey, b: NodeKey) -> Option<NodeKey> {
        if !self.contains(a) || !self.contains(b) {
            return None;
        }
        let mut candidate = Some(a);
        while let Some(node) = candidate {
            if node == b || self.is_ancestor(b, node) {
                return Some(node);
            }
            candidate = self.parent(node);
        }
        None
    }

    /// A path that leads from `from` to `to`, or `None` when they live in
    /// different trees.
    ///
    /// Covers self (`""`), ancestor (`..` repeated), descendant (id chain)
    /// and cousin (`..` up to the common ancestor, then down).
    pub fn relative_path(&self, from: NodeKey, to: NodeKey) -> Option<String> {
        let common = self.common_ancestor(from, to)?;

        let mut builder = PathBuilder::new();
        let mut current = from;
        while current != common {
            builder.go_up();
            current = self.parent(current)?;
        }

        let mut down = Vec::new();
        let mut current = to;
        while current != common {
            down.push(current);
            current = self.parent(current)?;
        }
        for key in down.into_iter().rev() {
            builder.go_down(self.id(key)?);
        }
        Some(builder.build())
    }
}

/// Fluent builder for path strings.
///
/// ```
/// use arbor_tree::PathBuilder;
///
/// let path = PathBuilder::new().go_up().go_down("menu").go_down("item").build();
/// assert_eq!(path, "../menu/item");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathBuilder {
    path: String,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child lookup.
    pub fn go_down(&mut self, id: &str) -> &mut Self {
        self.push(id)
    }

    /// Append a parent step.
    pub fn go_up(&mut self) -> &mut Self {
        self.push(PARENT_SEGMENT)
    }

    pub fn clear(&mut self) -> &mut Self {
        self.path.clear();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn build(&self) -> String {
        self.path.clone()
    }

    fn push(&mut self, segment: &str) -> &mut Self {
        if !self.path.is_empty() {
            self.path.push(SEPARATOR);
        }
        self.path.push_str(segment);
        self
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// `root -> a -> b`, plus `root -> c -> d` for cousin lookups.
    fn sample() -> (Tree, [NodeKey; 5]) {
        let mut tree = Tree::new();
        let root = tree.create_node("root");
        let a = tree.create_node("a");
        let b = tree.create_node("b");
        let c = tree.create_node("c");
        let d = tree.create_node("d");
        tree.add_child(root, a).unwrap();
        tree.add_child(a, b).unwrap();
        tree.add_child(root, c).unwrap();
        tree.add_child(c, d).unwrap();
        (tree, [root, a, b, c, d])
    }

    #[test]
    fn get_node_walks_segments() {
        let (tree, [root, a, b, c, d]) = sample();
        assert_eq!(tree.get_node(root, "a/b"), Some(b));
        assert_eq!(tree.get_node(b, ".."), Some(a));
        assert_eq!(tree.get_node(b, "../../c/d"), Some(d));
        assert_eq!(tree.get_node(c, ""), Some(c));
        assert_eq!(tree.get_node(root, "a//b"), Some(b));
        assert_eq!(tree.get_node(root, "missing"), None);
        assert_eq!(tree.get_node(root, ".."), None);
        assert!(tree.has_node(root, "c/d"));
    }

    #[test]
    fn full_path_excludes_root() {
        let (tree, [root, a, b, _, d]) = sample();
        assert_eq!(tree.full_path(root).as_deref(), Some(""));
        assert_eq!(tree.full_path(a).as_deref(), Some("a"));
        assert_eq!(tree.full_path(b).as_deref(), Some("a/b"));
        assert_eq!(tree.full_path(d).as_deref(), Some("c/d"));
        assert_eq!(tree.full_path(NodeKey::next()), None);
    }

    #[test]
    fn relative_path_between_root_and_grandchild() {
        let (tree, [root, _, b, _, _]) = sample();
        assert_eq!(tree.relative_path(root, b).as_deref(), Some("a/b"));
        assert_eq!(tree.relative_path(b, root).as_deref(), Some("../.."));
    }

    #[test]
    fn relative_path_cases_resolve_back() {
        let (tree, [root, a, b, c, d]) = sample();
        let cases = [
            (b, b, ""),
            (b, a, ".."),
            (a, b, "b"),
            (b, d, "../../c/d"),
            (d, a, "../../a"),
            (a, c, "../c"),
            (root, root, ""),
        ];
        for (from, to, expected) in cases {
            let path = tree.relative_path(from, to).unwrap();
            assert_eq!(path, expected);
            assert_eq!(tree.get_node(from, &path), Some(to));
        }
    }

    #[test]
    fn relative_path_across_trees_is_none() {
        let (mut tree, [_, a, _, _, _]) = sample();
        let stranger = tree.create_node("stranger");
        assert_eq!(tree.relative_path(a, stranger), None);
        assert_eq!(tree.common_ancestor(a, stranger), None);
    }

    #[test]
    fn common_ancestor_finds_nearest() {
        let (tree, [root, a, b, c, d]) = sample();
        assert_eq!(tree.common_ancestor(b, d), Some(root));
        assert_eq!(tree.common_ancestor(b, a), Some(a));
        assert_eq!(tree.common_ancestor(a, b), Some(a));
        assert_eq!(tree.common_ancestor(c, c), Some(c));
    }

    #[test]
    fn get_node_as_filters_by_kind() {
        struct Tagged;
        impl crate::kind::Payload for Tagged {}
        struct TaggedKind;
        impl NodeKind for TaggedKind {
            fn matches(tree: &Tree, node: NodeKey) -> bool {
                tree.payload::<Tagged>(node).is_some()
            }
        }

        let mut tree = Tree::new();
        let root = tree.create_node("root");
        let plain = tree.create_node("plain");
        let tagged = tree.create_node_with("tagged", Tagged);
        tree.add_children(root, &[plain, tagged]).unwrap();
        assert_eq!(tree.get_node_as::<TaggedKind>(root, "tagged"), Some(tagged));
        assert_eq!(tree.get_node_as::<TaggedKind>(root, "plain"), None);
    }

    #[test]
    fn builder_joins_segments() {
        let mut builder = PathBuilder::new();
        assert!(builder.is_empty());
        builder.go_up().go_up().go_down("x");
        assert_eq!(builder.as_str(), "../../x");
        builder.clear();
        assert_eq!(builder.build(), "");
    }

    /// Build a random tree: node `i > 0` is attached under node `parents[i-1] % i`.
    fn random_tree(parents: &[usize]) -> (Tree, Vec<NodeKey>) {
        let mut tree = Tree::new();
        let mut keys = vec![tree.create_node("n0")];
        for (offset, choice) in parents.iter().enumerate() {
            let index = offset + 1;
            let node = tree.create_node(format!("n{index}"));
            tree.add_child(keys[choice % index], node).unwrap();
            keys.push(node);
        }
        (tree, keys)
    }

    proptest! {
        #[test]
        fn full_path_round_trips(parents in prop::collection::vec(0usize..64, 1..24)) {
            let (tree, keys) = random_tree(&parents);
            for key in &keys {
                let path = tree.full_path(*key).unwrap();
                prop_assert_eq!(tree.get_node(keys[0], &path), Some(*key));
            }
        }

        #[test]
        fn relative_path_round_trips(
            parents in prop::collection::vec(0usize..64, 1..24),
            from in 0usize..64,
            to in 0usize..64,
        ) {
            let (tree, keys) = random_tree(&parents);
            let from = keys[from % keys.len()];
            let to = keys[to % keys.len()];
            let path = tree.relative_path(from, to).unwrap();
            prop_assert_eq!(tree.get_node(from, &path), Some(to));
        }
    }
}
