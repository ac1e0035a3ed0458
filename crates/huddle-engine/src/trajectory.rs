//! Serializable records: per-tick trajectory entries and session state
//! payloads for clients.

use serde::Serialize;

use huddle_core::{LifecycleStatus, ParticipantId, SessionId, TickId};

/// A seat as it appears in records and payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeatRecord {
    /// Occupant identity, `None` for a vacant seat.
    pub id: Option<ParticipantId>,
    /// Whether the occupant is human. `false` for vacant seats.
    pub is_human: bool,
}

/// One committed transition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransitionRecord<S, A> {
    /// Tick within the round.
    pub tick: TickId,
    /// Round, 0-based.
    pub round: u32,
    /// State the joint action was applied to.
    pub state: S,
    /// Seat-ordered joint action.
    pub joint_action: Vec<A>,
    /// Seat-ordered rewards of this transition.
    pub reward: Vec<f64>,
    /// Running score after settlement.
    pub score: f64,
    /// Seconds spent in the round.
    pub elapsed_secs: f64,
    /// Seconds left in the round, if rounds are timed.
    pub time_left_secs: Option<f64>,
    /// Seat layout at commit time.
    pub seats: Vec<SeatRecord>,
    /// Trial tag, if the variant assigns one.
    pub trial: Option<String>,
}

/// Compact per-tick payload for clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MinimalState<S> {
    /// Lifecycle status.
    pub status: LifecycleStatus,
    /// Tick within the round.
    pub tick: TickId,
    /// Round, 0-based.
    pub round: u32,
    /// Running score.
    pub score: f64,
    /// Seconds left in the round, if rounds are timed.
    pub time_left_secs: Option<f64>,
    /// Current world state.
    pub state: S,
}

/// Complete session description, sent once when a client joins.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FullState<S> {
    /// Session id.
    pub session: SessionId,
    /// Variant name.
    pub variant: &'static str,
    /// Physical seat count.
    pub capacity: usize,
    /// Seat layout.
    pub seats: Vec<SeatRecord>,
    /// Spectator identities.
    pub spectators: Vec<ParticipantId>,
    /// Live payload, present while the session is running.
    pub minimal: Option<MinimalState<S>>,
}
