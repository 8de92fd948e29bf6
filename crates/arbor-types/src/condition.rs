//! Node lifecycle conditions.
//!
//! A node starts `Available`, may toggle between `Available` and
//! `Unavailable`, and ends its life through `Destroying` into `Destroyed`.
//! `Destroying` and `Destroyed` together form the "disposed" state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Lifecycle state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// Accepts new children and participates normally.
    Available,
    /// Alive but refuses new children.
    Unavailable,
    /// Disposal has started; the subtree is being torn down.
    Destroying,
    /// Disposal finished. Terminal.
    Destroyed,
}

impl Condition {
    /// Returns `true` for `Destroying` and `Destroyed`.
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Destroying | Self::Destroyed)
    }

    /// Returns `true` if `self` is one of `conditions`.
    pub fn is_any_of(&self, conditions: &[Condition]) -> bool {
        conditions.contains(self)
    }

    /// Check whether the transition `self -> next` is legal.
    ///
    /// Legal transitions: `Available <-> Unavailable`,
    /// `{Available, Unavailable} -> Destroying`, `Destroying -> Destroyed`.
    /// Re-entering the current condition is rejected.
    pub fn can_transition_to(&self, next: Condition) -> Result<(), TypeError> {
        let legal = match self {
            Self::Available => matches!(next, Self::Unavailable | Self::Destroying),
            Self::Unavailable => matches!(next, Self::Available | Self::Destroying),
            Self::Destroying => next == Self::Destroyed,
            Self::Destroyed => false,
        };
        if legal {
            Ok(())
        } else {
            Err(TypeError::IllegalTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::Unavailable => write!(f, "Unavailable"),
            Self::Destroying => write!(f, "Destroying"),
            Self::Destroyed => write!(f, "Destroyed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Condition; 4] = [
        Condition::Available,
        Condition::Unavailable,
        Condition::Destroying,
        Condition::Destroyed,
    ];

    #[test]
    fn disposed_covers_destroying_and_destroyed() {
        assert!(!Condition::Available.is_disposed());
        assert!(!Condition::Unavailable.is_disposed());
        assert!(Condition::Destroying.is_disposed());
        assert!(Condition::Destroyed.is_disposed());
    }

    #[test]
    fn legal_transitions() {
        use Condition::*;
        assert!(Available.can_transition_to(Unavailable).is_ok());
        assert!(Unavailable.can_transition_to(Available).is_ok());
        assert!(Available.can_transition_to(Destroying).is_ok());
        assert!(Unavailable.can_transition_to(Destroying).is_ok());
        assert!(Destroying.can_transition_to(Destroyed).is_ok());
    }

    #[test]
    fn every_other_transition_is_rejected() {
        use Condition::*;
        let legal = [
            (Available, Unavailable),
            (Unavailable, Available),
            (Available, Destroying),
            (Unavailable, Destroying),
            (Destroying, Destroyed),
        ];
        for from in ALL {
            for to in ALL {
                if legal.contains(&(from, to)) {
                    continue;
                }
                assert_eq!(
                    from.can_transition_to(to),
                    Err(TypeError::IllegalTransition { from, to }),
                    "{from} -> {to} should be illegal"
                );
            }
        }
    }

    #[test]
    fn is_any_of_matches_membership() {
        assert!(Condition::Destroying.is_any_of(&[Condition::Destroying, Condition::Destroyed]));
        assert!(!Condition::Available.is_any_of(&[Condition::Unavailable]));
    }

    #[test]
    fn display() {
        assert_eq!(Condition::Unavailable.to_string(), "Unavailable");
    }
}
