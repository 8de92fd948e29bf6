//! Listener registries.
//!
//! A [`Signal`] is an ordered list of listeners. Listeners are reference
//! counted `Fn` closures that receive `&mut Tree`, which makes them fully
//! re-entrant: a listener may mutate the tree, trigger further notifications,
//! and even be invoked again by them before it returns.
//!
//! Emission always works on a snapshot of the listener list and skips any
//! listener disconnected mid-emission. Listeners connected mid-emission are
//! first called by the next emission.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::tree::Tree;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one connected listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Mint a fresh listener id.
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A connected listener.
pub type Listener<A> = Rc<dyn Fn(&mut Tree, &A)>;

/// An ordered registry of listeners for notifications of type `A`.
pub struct Signal<A> {
    listeners: Vec<(ListenerId, Listener<A>)>,
}

impl<A> Signal<A> {
    /// Create a signal with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Connect a listener; it is called after every listener connected
    /// before it.
    pub fn connect(&mut self, listener: impl Fn(&mut Tree, &A) + 'static) -> ListenerId {
        self.connect_rc(Rc::new(listener))
    }

    /// Connect an already shared listener.
    pub fn connect_rc(&mut self, listener: Listener<A>) -> ListenerId {
        let id = ListenerId::next();
        self.listeners.push((id, listener));
        id
    }

    /// Disconnect a listener. Returns `false` if it was not connected.
    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Returns `true` if `id` is still connected.
    pub fn is_connected(&self, id: ListenerId) -> bool {
        self.listeners.iter().any(|(lid, _)| *lid == id)
    }

    /// Number of connected listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if nothing is connected.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Disconnect every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// A copy of the current listener list, in connection order.
    pub fn snapshot(&self) -> Vec<(ListenerId, Listener<A>)> {
        self.listeners.clone()
    }
}

impl<A> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Emit `arg` to a signal stored inside shared state.
///
/// The `RefCell` is only borrowed while snapshotting and while checking
/// that each listener is still connected, never across a listener call, so
/// listeners are free to borrow the same state mutably.
pub fn emit_shared<S, A, F>(cell: &RefCell<S>, select: F, tree: &mut Tree, arg: &A)
where
    F: Fn(&S) -> &Signal<A>,
{
    let snapshot = select(&*cell.borrow()).snapshot();
    for (id, listener) in snapshot {
        let connected = select(&*cell.borrow()).is_connected(id);
        if connected {
            listener(tree, arg);
        }
    }
}
