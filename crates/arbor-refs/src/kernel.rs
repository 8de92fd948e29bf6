//! State shared by every reference strategy.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use arbor_tree::{emit_shared, Listener, ListenerId, NodeKey, Signal, Subscription, Tree};

use crate::traits::InstanceChange;

pub(crate) struct RefState<X> {
    instance: Option<NodeKey>,
    disposed: bool,
    /// Subscriptions held for the whole life of the reference.
    anchors: Vec<Subscription>,
    /// Subscriptions that depend on the current resolution.
    watch: Vec<Subscription>,
    instance_changed: Signal<InstanceChange>,
    disposed_signal: Signal<()>,
    extra: X,
}

/// Handle to the shared state of one reference. `X` is the strategy's own
/// data.
pub(crate) struct RefCore<X> {
    state: Rc<RefCell<RefState<X>>>,
}

pub(crate) type WeakCore<X> = Weak<RefCell<RefState<X>>>;

impl<X> Clone for RefCore<X> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<X: 'static> RefCore<X> {
    pub(crate) fn new(extra: X) -> Self {
        Self {
            state: Rc::new(RefCell::new(RefState {
                instance: None,
                disposed: false,
                anchors: Vec::new(),
                watch: Vec::new(),
                instance_changed: Signal::new(),
                disposed_signal: Signal::new(),
                extra,
            })),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakCore<X> {
        Rc::downgrade(&self.state)
    }

    pub(crate) fn upgrade(weak: &WeakCore<X>) -> Option<Self> {
        weak.upgrade().map(|state| Self { state })
    }

    pub(crate) fn instance(&self) -> Option<NodeKey> {
        self.state.borrow().instance
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&X) -> R) -> R {
        f(&self.state.borrow().extra)
    }

    pub(crate) fn anchor(&self, sub: Subscription) {
        self.state.borrow_mut().anchors.push(sub);
    }

    /// Swap the resolution-dependent subscriptions.
    pub(crate) fn replace_watch(&self, tree: &mut Tree, subs: Vec<Subscription>) {
        let old = std::mem::replace(&mut self.state.borrow_mut().watch, subs);
        for sub in old {
            tree.unsubscribe(sub);
        }
    }

    /// Store `new` and announce it if the identity differs. Returns whether
    /// it did.
    pub(crate) fn set_instance(&self, tree: &mut Tree, new: Option<NodeKey>) -> bool {
        let old = {
            let mut state = self.state.borrow_mut();
            if state.instance == new {
                return false;
            }
            std::mem::replace(&mut state.instance, new)
        };
        debug!(?old, ?new, "reference instance changed");
        emit_shared(
            &self.state,
            |s| &s.instance_changed,
            tree,
            &InstanceChange { new, old },
        );
        true
    }

    pub(crate) fn connect_instance_changed(&self, listener: Listener<InstanceChange>) -> ListenerId {
        self.state.borrow_mut().instance_changed.connect_rc(listener)
    }

    pub(crate) fn connect_disposed(&self, listener: Listener<()>) -> ListenerId {
        self.state.borrow_mut().disposed_signal.connect_rc(listener)
    }

    pub(crate) fn disconnect(&self, id: ListenerId) -> bool {
        let mut state = self.state.borrow_mut();
        state.instance_changed.disconnect(id) || state.disposed_signal.disconnect(id)
    }

    /// Run the shared disposal sequence. Returns `false` if already disposed.
    pub(crate) fn dispose(&self, tree: &mut Tree) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.disposed {
                return false;
            }
            state.disposed = true;
        }
        emit_shared(&self.state, |s| &s.disposed_signal, tree, &());
        self.set_instance(tree, None);

        let subs: Vec<Subscription> = {
            let mut state = self.state.borrow_mut();
            let mut subs = std::mem::take(&mut state.anchors);
            subs.append(&mut state.watch);
            state.instance_changed.clear();
            state.disposed_signal.clear();
            subs
        };
        for sub in subs {
            tree.unsubscribe(sub);
        }
        debug!("reference disposed");
        true
    }
}
