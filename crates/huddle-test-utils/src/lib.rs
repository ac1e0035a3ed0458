//! Test utilities and mock collaborators for Huddle development.
//!
//! Provides a deterministic [`CounterWorld`] with a parseable [`Move`]
//! action, a [`FailingWorld`] for error paths, and (in [`fixtures`])
//! scripted, blocking, failing, and seeded-random policies plus a
//! name-keyed [`StaticLoader`](fixtures::StaticLoader).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use huddle_core::{Outcome, Transition, WorldError, WorldModel};
use serde::Serialize;

/// One seat's action in a [`CounterWorld`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    Stay,
    Up,
    Down,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Stay, Move::Up, Move::Down];

    pub fn delta(self) -> i64 {
        match self {
            Move::Stay => 0,
            Move::Up => 1,
            Move::Down => -1,
        }
    }
}

/// Error from parsing a [`Move`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseMoveError(pub String);

impl fmt::Display for ParseMoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown move '{}'", self.0)
    }
}

impl std::error::Error for ParseMoveError {}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stay" => Ok(Move::Stay),
            "up" => Ok(Move::Up),
            "down" => Ok(Move::Down),
            other => Err(ParseMoveError(other.to_owned())),
        }
    }
}

/// State of a [`CounterWorld`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CounterState {
    /// Running sum of every committed move delta.
    pub value: i64,
    /// Round this state belongs to.
    pub round: u32,
    /// Transitions applied since the round started.
    pub steps: u64,
}

/// Shared record of every joint action a [`CounterWorld`] was given.
#[derive(Clone, Debug, Default)]
pub struct JointLog {
    inner: Arc<Mutex<Vec<Vec<Move>>>>,
}

impl JointLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, joint: &[Move]) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(joint.to_vec());
    }

    /// Copy of every recorded joint action, oldest first.
    pub fn entries(&self) -> Vec<Vec<Move>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deterministic world: the state is a counter moved by each seat's
/// [`Move`]. A seat earns `up_reward` for every `Up`, nothing otherwise.
#[derive(Clone, Debug)]
pub struct CounterWorld {
    pub up_reward: f64,
    log: Option<JointLog>,
}

impl Default for CounterWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterWorld {
    pub fn new() -> Self {
        Self {
            up_reward: 1.0,
            log: None,
        }
    }

    /// Pay `reward` per `Up` instead of 1.0.
    pub fn with_reward(mut self, reward: f64) -> Self {
        self.up_reward = reward;
        self
    }

    /// Record every joint action into a [`JointLog`].
    pub fn logged(self) -> (Self, JointLog) {
        let log = JointLog::new();
        (
            Self {
                log: Some(log.clone()),
                ..self
            },
            log,
        )
    }
}

impl WorldModel for CounterWorld {
    type State = CounterState;
    type Action = Move;

    fn initial_state(&self, round: u32) -> CounterState {
        CounterState {
            value: 0,
            round,
            steps: 0,
        }
    }

    fn noop_action(&self) -> Move {
        Move::Stay
    }

    fn transition(
        &self,
        state: &CounterState,
        joint: &[Move],
    ) -> Result<Transition<CounterState>, WorldError> {
        if let Some(log) = &self.log {
            log.push(joint);
        }
        let next = CounterState {
            value: state.value + joint.iter().map(|m| m.delta()).sum::<i64>(),
            round: state.round,
            steps: state.steps + 1,
        };
        let rewards = joint
            .iter()
            .map(|m| if *m == Move::Up { self.up_reward } else { 0.0 });
        Ok(Transition {
            next,
            outcome: Outcome::from_rewards(rewards),
        })
    }
}

/// Fails deterministically after a configurable number of successful
/// transitions. Successful transitions behave like [`CounterWorld`].
pub struct FailingWorld {
    pub succeed_count: usize,
    inner: CounterWorld,
    call_count: AtomicUsize,
}

impl FailingWorld {
    /// Create a world that succeeds `succeed_count` times then fails.
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            inner: CounterWorld::new(),
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `transition()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl WorldModel for FailingWorld {
    type State = CounterState;
    type Action = Move;

    fn initial_state(&self, round: u32) -> CounterState {
        self.inner.initial_state(round)
    }

    fn noop_action(&self) -> Move {
        Move::Stay
    }

    fn transition(
        &self,
        state: &CounterState,
        joint: &[Move],
    ) -> Result<Transition<CounterState>, WorldError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(WorldError::TransitionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        self.inner.transition(state, joint)
    }
}
