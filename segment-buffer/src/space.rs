//! Action space of the environment the episodes were collected in.
use serde::{Deserialize, Serialize};

/// Action space, resolved once when the consumer is constructed.
///
/// Discrete actions are stored as one class index per step, so their per-step
/// shape is `[]`. Continuous actions are stored as vectors of `dim` elements.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum ActionSpace {
    /// `n` discrete actions.
    Discrete(usize),

    /// Continuous actions of dimension `dim`.
    Continuous(usize),
}

impl ActionSpace {
    /// Returns the shape of a single action.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Discrete(_) => vec![],
            Self::Continuous(dim) => vec![*dim],
        }
    }

    /// Returns `true` for a discrete action space.
    pub fn is_discrete(&self) -> bool {
        matches!(self, Self::Discrete(_))
    }
}
