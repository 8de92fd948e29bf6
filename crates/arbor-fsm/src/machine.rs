//! State machines whose states and current index live in the tree.
//!
//! A machine node owns two children it creates itself: a plain holder
//! (`"states"`) whose children are the states, and a `ValueNode<i64>`
//! (`"state_index"`) holding the current index. The index is the single
//! source of truth: every way of selecting a state writes it, and the
//! index node's unconditional `ValueSet` notification performs the switch.
//! Changes to the holder's child list re-converge index and current state.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use tracing::debug;

use arbor_refs::{InstanceChange, LocalRef, NodeRef};
use arbor_tree::{
    AnyNode, DebugInfo, EventKind, NodeEvent, NodeKey, NodeKind, Payload, Subscription, Tree,
    ValueNode, ValueSet,
};

use crate::cycle::cycle_index;
use crate::error::{FsmError, FsmResult};
use crate::state::{self, ActivationRequested, StateNode};

/// Id of the holder child.
pub const STATES_HOLDER_ID: &str = "states";

/// Id of the index child.
pub const STATE_INDEX_ID: &str = "state_index";

/// Emitted on the machine right after the current state was replaced,
/// before the old state exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanging {
    pub new: Option<NodeKey>,
    pub old: Option<NodeKey>,
}

/// Emitted on the machine once the old state exited and the new one entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanged {
    pub new: Option<NodeKey>,
    pub old: Option<NodeKey>,
}

struct MachineCore {
    state_kind: TypeId,
    current: Option<NodeKey>,
    holder: Option<LocalRef<AnyNode>>,
    pointer: Option<LocalRef<ValueNode<i64>>>,
    holder_subs: Vec<Subscription>,
    pointer_sub: Option<Subscription>,
    state_subs: HashMap<NodeKey, Subscription>,
}

/// Payload of a machine node.
pub struct MachineCell {
    core: Rc<RefCell<MachineCore>>,
}

impl Payload for MachineCell {
    fn debug_info(&self, tree: &Tree) -> DebugInfo {
        match self.core.borrow().current {
            Some(current) => DebugInfo::new(
                format!("Current: {}", tree.id(current).unwrap_or("?")),
                tree.debug_info(current).summary,
            ),
            None => DebugInfo::new("Current: N/A", ""),
        }
    }
}

/// Handle to a state machine node whose states are of kind `S`.
pub struct StateMachine<S: NodeKind = StateNode> {
    key: NodeKey,
    _kind: PhantomData<fn() -> S>,
}

impl<S: NodeKind> Clone for StateMachine<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: NodeKind> Copy for StateMachine<S> {}

impl<S: NodeKind> PartialEq for StateMachine<S> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<S: NodeKind> fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateMachine").field(&self.key).finish()
    }
}

impl<S: NodeKind> NodeKind for StateMachine<S> {
    fn matches(tree: &Tree, node: NodeKey) -> bool {
        tree.payload::<MachineCell>(node)
            .is_some_and(|cell| cell.core.borrow().state_kind == TypeId::of::<S>())
    }
}

impl<S: NodeKind> StateMachine<S> {
    /// Create a detached machine holding `states`, then select
    /// `default_index`.
    ///
    /// States that cannot join the holder (for example because of a
    /// duplicate id) are skipped; the tree logs why.
    pub fn create(
        tree: &mut Tree,
        id: impl Into<String>,
        states: &[NodeKey],
        default_index: i64,
    ) -> Self {
        let core = Rc::new(RefCell::new(MachineCore {
            state_kind: TypeId::of::<S>(),
            current: None,
            holder: None,
            pointer: None,
            holder_subs: Vec::new(),
            pointer_sub: None,
            state_subs: HashMap::new(),
        }));
        let key = tree.create_node_with(id, MachineCell { core: core.clone() });
        let machine = Self {
            key,
            _kind: PhantomData,
        };

        let holder = LocalRef::<AnyNode>::new(tree, key, STATES_HOLDER_ID);
        let weak = Rc::downgrade(&core);
        holder.on_instance_changed(Rc::new(move |tree: &mut Tree, change: &InstanceChange| {
            if let Some(core) = weak.upgrade() {
                machine.holder_changed(tree, &core, change.new);
            }
        }));

        let pointer = LocalRef::<ValueNode<i64>>::new(tree, key, STATE_INDEX_ID);
        let weak = Rc::downgrade(&core);
        pointer.on_instance_changed(Rc::new(move |tree: &mut Tree, change: &InstanceChange| {
            if let Some(core) = weak.upgrade() {
                machine.pointer_changed(tree, &core, change.new);
            }
        }));

        {
            let mut core = core.borrow_mut();
            core.holder = Some(holder);
            core.pointer = Some(pointer);
        }

        let holder_node = tree.create_node(STATES_HOLDER_ID);
        let index_node = ValueNode::create(tree, STATE_INDEX_ID, i64::MIN);
        // Fresh nodes under a fresh parent: these cannot collide.
        let _ = tree.add_children(key, &[holder_node, index_node.key()]);

        for state in states {
            let _ = machine.add_state(tree, *state);
        }
        machine.set_state_index(tree, default_index, false);
        debug!(machine = ?key, states = machine.state_count(tree), "state machine created");
        machine
    }

    /// Wrap an existing machine node.
    pub fn from_node(tree: &Tree, key: NodeKey) -> Option<Self> {
        Self::matches(tree, key).then_some(Self {
            key,
            _kind: PhantomData,
        })
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    fn core(&self, tree: &Tree) -> Option<Rc<RefCell<MachineCore>>> {
        tree.payload::<MachineCell>(self.key)
            .map(|cell| cell.core.clone())
    }

    /// The states holder, while it is attached.
    pub fn holder(&self, tree: &Tree) -> Option<NodeKey> {
        let core = self.core(tree)?;
        let holder = core.borrow().holder.as_ref()?.instance();
        holder
    }

    /// The index node, while it is attached.
    pub fn pointer(&self, tree: &Tree) -> Option<ValueNode<i64>> {
        let core = self.core(tree)?;
        let pointer = core.borrow().pointer.as_ref()?.instance()?;
        ValueNode::from_key(tree, pointer)
    }

    pub fn current_state(&self, tree: &Tree) -> Option<NodeKey> {
        let core = self.core(tree)?;
        let current = core.borrow().current;
        current
    }

    /// The value of the index node.
    pub fn current_index(&self, tree: &Tree) -> Option<i64> {
        self.pointer(tree)?.value(tree).copied()
    }

    /// The holder's children of kind `S`, in order.
    pub fn states(&self, tree: &Tree) -> Vec<NodeKey> {
        self.holder(tree)
            .map(|holder| tree.children_of::<S>(holder))
            .unwrap_or_default()
    }

    pub fn state_count(&self, tree: &Tree) -> usize {
        self.states(tree).len()
    }

    /// Position of `state` among the machine's states.
    pub fn state_index(&self, tree: &Tree, state: NodeKey) -> Option<usize> {
        self.states(tree).iter().position(|s| *s == state)
    }

    /// The state at `index`, wrapping it into range when `cycling`.
    pub fn state_at(&self, tree: &Tree, index: i64, cycling: bool) -> Option<NodeKey> {
        let states = self.states(tree);
        if states.is_empty() {
            return None;
        }
        let index = if cycling {
            cycle_index(index, states.len())
        } else {
            index
        };
        usize::try_from(index)
            .ok()
            .and_then(|index| states.get(index).copied())
    }

    /// Append `state` to the holder.
    pub fn add_state(&self, tree: &mut Tree, state: NodeKey) -> FsmResult<()> {
        let holder = self.holder(tree).ok_or(FsmError::MissingHolder(self.key))?;
        tree.add_child(holder, state)?;
        Ok(())
    }

    /// Advance to the next state, staying inside a window of indices.
    ///
    /// The window starts at `start_margin` (default 0) and ends
    /// `end_margin` away from the last index (default 0, so a margin of
    /// `-1` excludes the last state). Both bounds are clamped into range. An
    /// advance that leaves the window lands on its start.
    pub fn progress(&self, tree: &mut Tree, start_margin: Option<i64>, end_margin: Option<i64>) {
        let count = self.state_count(tree);
        if count == 0 {
            debug!(machine = ?self.key, "progress ignored: no states");
            return;
        }
        let last = count as i64 - 1;
        let start = start_margin.map_or(0, |m| m.clamp(0, last));
        let end = end_margin.map_or(last, |m| (last + m).clamp(0, last));

        let from = self
            .current_state(tree)
            .and_then(|current| self.state_index(tree, current))
            .map_or(0, |index| index as i64 + 1);
        let mut next = cycle_index(from, count);
        if next < start || next > end {
            next = start;
        }
        self.set_state_index(tree, next, true);
    }

    /// Make `state` current, or clear the current state with `None`.
    ///
    /// A state that is not yet one of the machine's states is moved under
    /// the holder first.
    pub fn set_state(&self, tree: &mut Tree, state: Option<NodeKey>) -> FsmResult<()> {
        let Some(state) = state else {
            self.set_state_index(tree, -1, false);
            return Ok(());
        };
        if !S::matches(tree, state) {
            return Err(FsmError::NotAState {
                machine: self.key,
                state,
            });
        }
        if let Some(index) = self.state_index(tree, state) {
            self.set_state_index(tree, index as i64, false);
            return Ok(());
        }

        match self.holder(tree) {
            Some(holder) => {
                tree.set_parent(state, Some(holder))?;
                let index = self.state_index(tree, state).ok_or(FsmError::NotAState {
                    machine: self.key,
                    state,
                })?;
                self.set_state_index(tree, index as i64, false);
                Ok(())
            }
            None => {
                let core = self.core(tree).ok_or(FsmError::NotAMachine(self.key))?;
                self.switch_to(tree, &core, Some(state));
                Ok(())
            }
        }
    }

    /// Make the state with id `name` current. An unknown name clears the
    /// current state.
    pub fn set_state_named(&self, tree: &mut Tree, name: &str) -> FsmResult<()> {
        let state = self
            .holder(tree)
            .and_then(|holder| tree.get_node_as::<S>(holder, name));
        self.set_state(tree, state)
    }

    /// Like [`set_state_named`](Self::set_state_named) with a label's
    /// display form, for enum-like state names.
    pub fn set_state_label(&self, tree: &mut Tree, label: impl fmt::Display) -> FsmResult<()> {
        self.set_state_named(tree, &label.to_string())
    }

    /// Write `index` to the index node, wrapping it first when `cycle`.
    pub fn set_state_index(&self, tree: &mut Tree, index: i64, cycle: bool) {
        let index = if cycle {
            cycle_index(index, self.state_count(tree))
        } else {
            index
        };
        match self.pointer(tree) {
            Some(pointer) => {
                // The index node is live, so the write cannot be rejected.
                let _ = pointer.set_value(tree, index);
            }
            None => {
                let state = self.state_at(tree, index, true);
                if let Some(core) = self.core(tree) {
                    self.switch_to(tree, &core, state);
                }
            }
        }
    }

    pub fn on_state_changing(
        &self,
        tree: &mut Tree,
        listener: impl Fn(&mut Tree, &StateChanging) + 'static,
    ) -> Subscription {
        tree.subscribe_custom(self.key, listener)
    }

    pub fn on_state_changed(
        &self,
        tree: &mut Tree,
        listener: impl Fn(&mut Tree, &StateChanged) + 'static,
    ) -> Subscription {
        tree.subscribe_custom(self.key, listener)
    }

    fn switch_to(&self, tree: &mut Tree, core: &Rc<RefCell<MachineCore>>, state: Option<NodeKey>) {
        let old = {
            let mut core = core.borrow_mut();
            if core.current == state {
                return;
            }
            std::mem::replace(&mut core.current, state)
        };
        debug!(machine = ?self.key, ?old, new = ?state, "state switching");

        tree.emit_custom(self.key, StateChanging { new: state, old });
        if let Some(old) = old {
            state::exit(tree, old);
        }
        if let Some(new) = state {
            state::enter(tree, new);
        }
        tree.emit_custom(self.key, StateChanged { new: state, old });
    }

    /// Bring the index back in line with the current state's position.
    fn correct_index(&self, tree: &mut Tree, core: &Rc<RefCell<MachineCore>>) {
        let Some(current) = core.borrow().current else {
            return;
        };
        let (Some(pointer), Some(index)) = (self.pointer(tree), self.state_index(tree, current))
        else {
            return;
        };
        let index = index as i64;
        if pointer.value(tree) != Some(&index) {
            let _ = pointer.set_value(tree, index);
        }
    }

    fn pointer_changed(&self, tree: &mut Tree, core: &Rc<RefCell<MachineCore>>, pointer: Option<NodeKey>) {
        let old = core.borrow_mut().pointer_sub.take();
        if let Some(sub) = old {
            tree.unsubscribe(sub);
        }
        let Some(pointer) = pointer.and_then(|key| ValueNode::<i64>::from_key(tree, key)) else {
            return;
        };

        let weak = Rc::downgrade(core);
        let machine = *self;
        let sub = pointer.on_set(tree, move |tree, event: &ValueSet<i64>| {
            if let Some(core) = weak.upgrade() {
                let state = machine.state_at(tree, event.value, false);
                machine.switch_to(tree, &core, state);
            }
        });
        core.borrow_mut().pointer_sub = Some(sub);
    }

    fn holder_changed(&self, tree: &mut Tree, core: &Rc<RefCell<MachineCore>>, holder: Option<NodeKey>) {
        let (old_holder, old_states) = {
            let mut core = core.borrow_mut();
            (
                std::mem::take(&mut core.holder_subs),
                std::mem::take(&mut core.state_subs),
            )
        };
        for sub in old_holder.into_iter().chain(old_states.into_values()) {
            tree.unsubscribe(sub);
        }

        if let Some(holder) = holder {
            let subs = vec![
                self.subscribe_holder(tree, core, holder, EventKind::ChildAdded),
                self.subscribe_holder(tree, core, holder, EventKind::ChildRemoved),
            ];
            core.borrow_mut().holder_subs = subs;
            for state in tree.children_of::<S>(holder) {
                self.watch_state(tree, core, state);
            }
        }

        let index = self.current_index(tree).unwrap_or(-1);
        let state = self.state_at(tree, index, false);
        self.switch_to(tree, core, state);
    }

    fn subscribe_holder(
        &self,
        tree: &mut Tree,
        core: &Rc<RefCell<MachineCore>>,
        holder: NodeKey,
        kind: EventKind,
    ) -> Subscription {
        let weak: Weak<RefCell<MachineCore>> = Rc::downgrade(core);
        let machine = *self;
        tree.subscribe(holder, kind, move |tree, event| {
            let Some(core) = weak.upgrade() else {
                return;
            };
            match event {
                NodeEvent::ChildAdded { child, .. } => machine.state_added(tree, &core, *child),
                NodeEvent::ChildRemoved { child, index, .. } => {
                    machine.state_removed(tree, &core, *child, *index)
                }
                _ => {}
            }
        })
    }

    fn watch_state(&self, tree: &mut Tree, core: &Rc<RefCell<MachineCore>>, state: NodeKey) {
        let machine = *self;
        let sub = tree.subscribe_custom(state, move |tree, request: &ActivationRequested| {
            let _ = machine.set_state(tree, Some(request.state));
        });
        if let Some(previous) = core.borrow_mut().state_subs.insert(state, sub) {
            tree.unsubscribe(previous);
        }
    }

    fn state_added(&self, tree: &mut Tree, core: &Rc<RefCell<MachineCore>>, child: NodeKey) {
        if !S::matches(tree, child) {
            return;
        }
        self.watch_state(tree, core, child);
        self.correct_index(tree, core);
    }

    fn state_removed(&self, tree: &mut Tree, core: &Rc<RefCell<MachineCore>>, child: NodeKey, index: usize) {
        let sub = core.borrow_mut().state_subs.remove(&child);
        let Some(sub) = sub else {
            return;
        };
        tree.unsubscribe(sub);

        let was_current = core.borrow().current == Some(child);
        if was_current {
            let index = self.current_index(tree).unwrap_or(index as i64);
            self.set_state_index(tree, index, true);
        } else {
            self.correct_index(tree, core);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_with(tree: &mut Tree, ids: &[&str], default_index: i64) -> (StateMachine, Vec<NodeKey>) {
        let states: Vec<NodeKey> = ids.iter().map(|id| StateNode::create(tree, *id)).collect();
        let machine = StateMachine::create(tree, "fsm", &states, default_index);
        (machine, states)
    }

    type Log = Rc<RefCell<Vec<String>>>;

    fn record_transitions(tree: &mut Tree, machine: StateMachine, states: &[NodeKey]) -> Log {
        let log: Log = Rc::default();
        let name = |tree: &Tree, key: Option<NodeKey>| {
            key.and_then(|k| tree.id(k).map(str::to_string))
                .unwrap_or_else(|| "none".into())
        };
        let l = log.clone();
        machine.on_state_changing(tree, move |tree, e| {
            l.borrow_mut()
                .push(format!("changing {}->{}", name(tree, e.old), name(tree, e.new)));
        });
        let l = log.clone();
        machine.on_state_changed(tree, move |tree, e| {
            l.borrow_mut()
                .push(format!("changed {}->{}", name(tree, e.old), name(tree, e.new)));
        });
        for state in states {
            let l = log.clone();
            StateNode::on_entered(tree, *state, move |tree, e| {
                l.borrow_mut()
                    .push(format!("enter {}", tree.id(e.state).unwrap_or("?")));
            });
            let l = log.clone();
            StateNode::on_exited(tree, *state, move |tree, e| {
                l.borrow_mut()
                    .push(format!("exit {}", tree.id(e.state).unwrap_or("?")));
            });
        }
        log
    }

    #[test]
    fn construction_builds_holder_and_index() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b", "c"], 0);

        let holder = machine.holder(&tree).unwrap();
        assert_eq!(tree.id(holder), Some(STATES_HOLDER_ID));
        assert_eq!(tree.local_child(machine.key(), STATE_INDEX_ID), Some(machine.pointer(&tree).unwrap().key()));
        assert_eq!(machine.states(&tree), states);
        assert_eq!(machine.current_state(&tree), Some(states[0]));
        assert_eq!(machine.current_index(&tree), Some(0));
        assert!(StateNode::is_active(&tree, states[0]));
        assert!(StateMachine::<StateNode>::from_node(&tree, machine.key()).is_some());
    }

    #[test]
    fn progress_cycles_through_states() {
        let mut tree = Tree::new();
        let (machine, _) = machine_with(&mut tree, &["a", "b", "c"], 0);
        let mut seen = Vec::new();
        for _ in 0..4 {
            machine.progress(&mut tree, None, None);
            seen.push(machine.current_index(&tree).unwrap());
        }
        assert_eq!(seen, vec![1, 2, 0, 1]);
    }

    #[test]
    fn progress_respects_margins() {
        let mut tree = Tree::new();
        let (machine, _) = machine_with(&mut tree, &["a", "b", "c", "d"], 0);
        let mut seen = Vec::new();
        for _ in 0..4 {
            machine.progress(&mut tree, Some(1), Some(-1));
            seen.push(machine.current_index(&tree).unwrap());
        }
        assert_eq!(seen, vec![1, 2, 1, 2]);
    }

    #[test]
    fn progress_on_empty_machine_is_noop() {
        let mut tree = Tree::new();
        let (machine, _) = machine_with(&mut tree, &[], 0);
        machine.progress(&mut tree, None, None);
        assert_eq!(machine.current_state(&tree), None);
        assert_eq!(machine.current_index(&tree), Some(0));
    }

    #[test]
    fn state_switch_notification_order() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b"], 0);
        let log = record_transitions(&mut tree, machine, &states);

        machine.set_state(&mut tree, Some(states[1])).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["changing a->b", "exit a", "enter b", "changed a->b"]
        );
        assert!(!StateNode::is_active(&tree, states[0]));
        assert!(StateNode::is_active(&tree, states[1]));
    }

    #[test]
    fn selecting_the_current_state_does_not_notify() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b"], 1);
        let log = record_transitions(&mut tree, machine, &states);
        machine.set_state_index(&mut tree, 1, false);
        machine.set_state_named(&mut tree, "b").unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn removing_active_state_re_derives_current() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b", "c"], 1);
        let holder = machine.holder(&tree).unwrap();

        tree.remove_child(holder, states[1]).unwrap();
        assert_eq!(machine.current_state(&tree), Some(states[2]));
        assert_eq!(machine.current_index(&tree), Some(1));
        assert!(!StateNode::is_active(&tree, states[1]));
    }

    #[test]
    fn removing_last_active_state_wraps_index() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b", "c"], 2);
        let holder = machine.holder(&tree).unwrap();

        tree.remove_child(holder, states[2]).unwrap();
        assert_eq!(machine.current_state(&tree), Some(states[0]));
        assert_eq!(machine.current_index(&tree), Some(0));
    }

    #[test]
    fn removing_other_state_resyncs_index() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b", "c"], 2);
        let holder = machine.holder(&tree).unwrap();

        tree.remove_child(holder, states[0]).unwrap();
        assert_eq!(machine.current_state(&tree), Some(states[2]));
        assert_eq!(machine.current_index(&tree), Some(1));
    }

    #[test]
    fn disposing_active_state_moves_on() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b"], 0);
        tree.dispose(states[0]);
        assert_eq!(machine.current_state(&tree), Some(states[1]));
        assert_eq!(machine.current_index(&tree), Some(0));
    }

    #[test]
    fn writing_the_index_drives_the_state() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b", "c"], 0);
        let pointer = machine.pointer(&tree).unwrap();

        pointer.set_value(&mut tree, 2).unwrap();
        assert_eq!(machine.current_state(&tree), Some(states[2]));
        pointer.set_value(&mut tree, 7).unwrap();
        assert_eq!(machine.current_state(&tree), None);
    }

    #[test]
    fn foreign_state_is_reparented_under_holder() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b"], 0);
        let elsewhere = tree.create_node("elsewhere");
        let foreign = StateNode::create(&mut tree, "z");
        tree.add_child(elsewhere, foreign).unwrap();

        machine.set_state(&mut tree, Some(foreign)).unwrap();
        assert_eq!(tree.parent(foreign), machine.holder(&tree));
        assert_eq!(machine.current_state(&tree), Some(foreign));
        assert_eq!(machine.current_index(&tree), Some(2));
        assert_eq!(machine.state_count(&tree), states.len() + 1);
    }

    #[test]
    fn node_of_wrong_kind_is_not_a_state() {
        let mut tree = Tree::new();
        let (machine, _) = machine_with(&mut tree, &["a"], 0);
        let plain = tree.create_node("plain");
        assert_eq!(
            machine.set_state(&mut tree, Some(plain)),
            Err(FsmError::NotAState {
                machine: machine.key(),
                state: plain
            })
        );
        assert_eq!(tree.parent(plain), None);
    }

    #[test]
    fn clearing_and_naming_states() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["idle", "run"], 0);

        machine.set_state(&mut tree, None).unwrap();
        assert_eq!(machine.current_state(&tree), None);
        assert_eq!(machine.current_index(&tree), Some(-1));

        machine.set_state_named(&mut tree, "run").unwrap();
        assert_eq!(machine.current_state(&tree), Some(states[1]));

        #[derive(Debug)]
        enum Phase {
            Idle,
        }
        impl fmt::Display for Phase {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Phase::Idle => f.write_str("idle"),
                }
            }
        }
        machine.set_state_label(&mut tree, Phase::Idle).unwrap();
        assert_eq!(machine.current_state(&tree), Some(states[0]));

        machine.set_state_named(&mut tree, "missing").unwrap();
        assert_eq!(machine.current_state(&tree), None);
    }

    #[test]
    fn activation_request_makes_state_current() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b", "c"], 0);
        StateNode::request_activation(&mut tree, states[2]);
        assert_eq!(machine.current_state(&tree), Some(states[2]));
        assert_eq!(machine.current_index(&tree), Some(2));
    }

    #[test]
    fn added_state_keeps_index_consistent() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["b"], 0);
        let extra = StateNode::create(&mut tree, "c");
        machine.add_state(&mut tree, extra).unwrap();
        assert_eq!(machine.states(&tree), vec![states[0], extra]);
        assert_eq!(machine.current_index(&tree), Some(0));

        let holder = machine.holder(&tree).unwrap();
        tree.set_child_index(holder, extra, 0).unwrap();
        machine.progress(&mut tree, None, None);
        assert_eq!(machine.current_state(&tree), Some(extra));
    }

    #[test]
    fn state_at_with_and_without_cycling() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b", "c"], 0);
        assert_eq!(machine.state_at(&tree, 4, true), Some(states[1]));
        assert_eq!(machine.state_at(&tree, -1, true), Some(states[2]));
        assert_eq!(machine.state_at(&tree, 4, false), None);
        assert_eq!(machine.state_at(&tree, -1, false), None);
    }

    #[test]
    fn debug_info_names_current_state() {
        let mut tree = Tree::new();
        let (machine, _) = machine_with(&mut tree, &["idle"], 0);
        let info = tree.debug_info(machine.key());
        assert_eq!(info.summary, "Current: idle");
        assert_eq!(info.details, "active");

        machine.set_state(&mut tree, None).unwrap();
        assert_eq!(tree.debug_info(machine.key()).summary, "Current: N/A");
    }

    #[test]
    fn disposing_machine_releases_everything() {
        let mut tree = Tree::new();
        let (machine, states) = machine_with(&mut tree, &["a", "b"], 0);
        tree.dispose(machine.key());
        assert!(tree.is_empty());
        for state in states {
            assert!(!tree.contains(state));
        }
    }

    #[test]
    fn machine_without_holder_switches_directly() {
        let mut tree = Tree::new();
        let (machine, _) = machine_with(&mut tree, &["a", "b"], 0);
        let holder = machine.holder(&tree).unwrap();
        let pointer = machine.pointer(&tree).unwrap();
        tree.remove_child(machine.key(), pointer.key()).unwrap();
        assert!(machine.pointer(&tree).is_none());
        tree.remove_child(machine.key(), holder).unwrap();
        assert!(machine.holder(&tree).is_none());
        assert_eq!(machine.current_state(&tree), None);

        let loose = StateNode::create(&mut tree, "loose");
        machine.set_state(&mut tree, Some(loose)).unwrap();
        assert_eq!(machine.current_state(&tree), Some(loose));
    }
}
