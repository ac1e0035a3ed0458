//! Participant roles, session lifecycle status, and per-tick outcomes.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Whether a seat is driven by external input or by a policy worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Actions arrive from an external client.
    Human,
    /// Actions are produced by a background policy worker.
    Autonomous,
}

impl Role {
    /// `true` for [`Role::Human`].
    pub fn is_human(self) -> bool {
        matches!(self, Self::Human)
    }
}

/// Session-global lifecycle status.
///
/// ```text
/// INACTIVE --activate--> ACTIVE --tick(finished)--> DONE
///                          |  ^
///               needs_reset|  |reactivate
///                          v  |
///                         RESET
/// any --deactivate--> INACTIVE      invariant violation --> ERROR (terminal)
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Not running; ticks are no-ops and input is ignored.
    #[default]
    Inactive,
    /// Running; ticks commit joint actions.
    Active,
    /// A round boundary was crossed on this tick. The caller should hold
    /// the session inert for the reset pause before ticking again.
    Reset,
    /// The termination predicate holds.
    Done,
    /// An invariant was violated. Terminal.
    Error,
}

impl LifecycleStatus {
    /// Whether ticks are processed in this status.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::Reset)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Reset => "reset",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Reward signal produced by one world-model transition.
///
/// Rewards are indexed by seat, matching the joint action. Variants
/// decide how these feed the session score (e.g. only human seats).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Per-seat rewards for this transition.
    pub rewards: SmallVec<[f64; 4]>,
}

impl Outcome {
    /// Build an outcome from per-seat rewards.
    pub fn from_rewards(rewards: impl IntoIterator<Item = f64>) -> Self {
        Self {
            rewards: rewards.into_iter().collect(),
        }
    }

    /// An outcome with zero reward for each of `seats` seats.
    pub fn zero(seats: usize) -> Self {
        Self {
            rewards: smallvec::smallvec![0.0; seats],
        }
    }

    /// Sum of all per-seat rewards.
    pub fn total(&self) -> f64 {
        self.rewards.iter().sum()
    }

    /// Reward credited to one seat (zero if the seat is out of range).
    pub fn for_seat(&self, seat: usize) -> f64 {
        self.rewards.get(seat).copied().unwrap_or(0.0)
    }
}
