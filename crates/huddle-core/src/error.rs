//! Error types for the Huddle session engine.
//!
//! Organized by subsystem: slot management, world-model collaborator,
//! policy collaborator, and the session controller that wraps them all.
//!
//! User-input problems (stray or late actions, full mailboxes) are not
//! errors at all: the mailbox absorbs them silently and only counts them.

use thiserror::Error;

use crate::id::{ParticipantId, SeatIndex};

/// Structural-precondition failures from seat and spectator management.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Every seat allowed by the session's occupancy policy is taken.
    #[error("session is full ({max} participants)")]
    CapacityExceeded {
        /// The occupancy limit that was reached.
        max: usize,
    },
    /// Participants may only be added while the session is inactive.
    #[error("cannot add participants to an active session")]
    AlreadyActive,
    /// An explicit seat index lies outside the physical seat range.
    #[error("seat {seat} is out of range (capacity {capacity})")]
    SeatOutOfRange {
        /// The requested seat.
        seat: SeatIndex,
        /// Physical seat count.
        capacity: usize,
    },
    /// An explicit seat index is already occupied.
    #[error("seat {seat} is already occupied")]
    SeatOccupied {
        /// The requested seat.
        seat: SeatIndex,
    },
    /// The identity already occupies a seat in this session.
    #[error("participant '{id}' already occupies a seat")]
    DuplicateParticipant {
        /// The duplicated identity.
        id: ParticipantId,
    },
    /// A seated participant cannot also spectate.
    #[error("participant '{id}' cannot spectate and play at the same time")]
    SpectatorIsParticipant {
        /// The conflicting identity.
        id: ParticipantId,
    },
}

/// Failures reported by a world-model collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The transition function could not produce a next state.
    #[error("transition failed: {reason}")]
    TransitionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The joint action does not cover the expected number of seats.
    #[error("joint action has {got} entries, expected {expected}")]
    JointActionMismatch {
        /// Seats the world model expects.
        expected: usize,
        /// Entries in the submitted joint action.
        got: usize,
    },
}

/// Failures reported by a policy collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The named policy could not be loaded.
    #[error("failed to load policy '{name}': {reason}")]
    LoadFailed {
        /// Policy name as requested by the caller.
        name: String,
        /// Description of the load failure.
        reason: String,
    },
    /// Inference on an observation failed.
    #[error("inference failed: {reason}")]
    InferenceFailed {
        /// Description of the inference failure.
        reason: String,
    },
}

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A seat or spectator precondition failed.
    #[error(transparent)]
    Slot(#[from] SlotError),
    /// `activate()` was called on a session that is already running.
    #[error("session is already active")]
    AlreadyActive,
    /// An operation that requires a running session was called on an
    /// inactive one (e.g. `reset()`).
    #[error("session is not active")]
    NotActive,
    /// The participant set violates the composition invariant. The
    /// session has moved to ERROR.
    #[error("inconsistent session state: {reason}")]
    InconsistentState {
        /// Which part of the invariant was violated.
        reason: String,
    },
    /// The session is in the terminal ERROR status.
    #[error("session has terminated with an error")]
    Terminated,
    /// The world-model collaborator failed.
    #[error("world model: {0}")]
    World(#[from] WorldError),
    /// A policy collaborator failed, either at load time or during
    /// background inference.
    #[error("policy for participant '{participant}': {source}")]
    Policy {
        /// The autonomous participant whose policy failed.
        participant: ParticipantId,
        /// The underlying policy failure.
        #[source]
        source: PolicyError,
    },
    /// A background worker thread could not be started.
    #[error("could not spawn worker for '{participant}': {reason}")]
    WorkerSpawn {
        /// The autonomous participant whose worker failed to start.
        participant: ParticipantId,
        /// Operating-system error description.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn slot_error_converts_transparently() {
        let err: SessionError = SlotError::CapacityExceeded { max: 2 }.into();
        assert_eq!(err.to_string(), "session is full (2 participants)");
    }

    #[test]
    fn policy_error_keeps_source_chain() {
        let err = SessionError::Policy {
            participant: ParticipantId::new("ppo_1"),
            source: PolicyError::InferenceFailed {
                reason: "nan logits".into(),
            },
        };
        assert!(err.to_string().contains("ppo_1"));
        let source = err.source().expect("policy error has a source");
        assert_eq!(source.to_string(), "inference failed: nan logits");
    }

    #[test]
    fn world_error_display() {
        let err = WorldError::JointActionMismatch {
            expected: 2,
            got: 3,
        };
        assert_eq!(err.to_string(), "joint action has 3 entries, expected 2");
    }
}
