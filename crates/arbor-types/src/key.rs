use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_NODE_KEY: AtomicU64 = AtomicU64::new(1);

/// Arena handle for a node.
///
/// Keys are drawn from a process-wide counter and are never reused. A key
/// that outlives its node simply stops resolving, and a key minted by one
/// tree never resolves in another.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(u64);

impl NodeKey {
    /// Mint a fresh, never-before-seen key.
    pub fn next() -> Self {
        Self(NEXT_NODE_KEY.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw key value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({})", self.0)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_and_increasing() {
        let a = NodeKey::next();
        let b = NodeKey::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn display_and_debug() {
        let key = NodeKey(7);
        assert_eq!(key.to_string(), "#7");
        assert_eq!(format!("{key:?}"), "NodeKey(7)");
    }

    #[test]
    fn serde_roundtrip() {
        let key = NodeKey::next();
        let json = serde_json::to_string(&key).unwrap();
        let back: NodeKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
