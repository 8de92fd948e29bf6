//! Finite state machines built out of Arbor nodes.
//!
//! A [`StateMachine`] is a node with two owned children: a holder whose
//! children are the states, and a `ValueNode<i64>` holding the current
//! index. Selecting a state by instance, name, label or index always writes
//! the index; the index node's "value set" notification performs the switch.
//! Adding, removing or disposing states keeps index and current state in
//! agreement.
//!
//! # Modules
//!
//! - [`error`]: [`FsmError`] and [`FsmResult`]
//! - [`state`]: [`StateNode`] and the per-state notifications
//! - [`machine`]: [`StateMachine`] and its transition notifications
//! - [`cycle`]: [`cycle_index`]

pub mod cycle;
pub mod error;
pub mod machine;
pub mod state;

pub use cycle::cycle_index;
pub use error::{FsmError, FsmResult};
pub use machine::{StateChanged, StateChanging, StateMachine, STATES_HOLDER_ID, STATE_INDEX_ID};
pub use state::{ActivationRequested, StateEntered, StateExited, StateNode};
