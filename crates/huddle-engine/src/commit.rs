//! Tick commit: drain mailboxes, apply the joint action, fan out.
//!
//! [`TurnCommitter`] exclusively owns the world model and the current
//! state. Workers only ever see `Arc` snapshots published through their
//! relays, never the live state.
//!
//! # Commit sequence
//!
//! 1. Drain one action per seat, substituting the world's no-op action
//!    for empty or vacant seats.
//! 2. Apply the joint action to the world model exactly once, then
//!    advance the clock. A failed transition leaves the tick counter and
//!    the state where they were; the drained actions are discarded.
//! 3. Every `stride` ticks, publish the new state to autonomous workers.
//! 4. Let the variant fold the rewards into the running score.
//! 5. Optionally append a [`TransitionRecord`].

use std::sync::Arc;
use std::time::Instant;

use huddle_core::{SeatIndex, WorldError, WorldModel};

use crate::agent::AgentPool;
use crate::clock::SessionClock;
use crate::mailbox::ActionMailbox;
use crate::metrics::{micros, TickMetrics};
use crate::slots::SlotTable;
use crate::trajectory::{SeatRecord, TransitionRecord};
use crate::variant::Variant;

type Record<W> = TransitionRecord<<W as WorldModel>::State, <W as WorldModel>::Action>;

/// Owner of the world model and the committed state.
pub struct TurnCommitter<W: WorldModel> {
    world: W,
    state: Arc<W::State>,
    score: f64,
    stride: u64,
    recording: bool,
    trajectory: Vec<Record<W>>,
    last_metrics: TickMetrics,
}

impl<W: WorldModel> TurnCommitter<W> {
    /// Create a committer holding round 0's initial state.
    ///
    /// `stride` is clamped to at least one.
    pub fn new(world: W, stride: u64, recording: bool) -> Self {
        let state = Arc::new(world.initial_state(0));
        Self {
            world,
            state,
            score: 0.0,
            stride: stride.max(1),
            recording,
            trajectory: Vec::new(),
            last_metrics: TickMetrics::default(),
        }
    }

    /// Load the initial state of `round` and zero the score.
    pub(crate) fn start_round(&mut self, round: u32) {
        self.state = Arc::new(self.world.initial_state(round));
        self.score = 0.0;
    }

    /// Commit the tick after `clock.tick()`, advancing the clock on
    /// success.
    pub(crate) fn commit(
        &mut self,
        clock: &mut SessionClock,
        slots: &SlotTable,
        mailbox: &ActionMailbox<W::Action>,
        agents: &AgentPool<W::State, W::Action>,
        variant: &mut dyn Variant,
    ) -> Result<&TickMetrics, WorldError> {
        let tick_start = Instant::now();
        let tick = clock.tick().next();

        // 1. Drain.
        let mut defaulted_seats = 0u32;
        let mut joint_action = Vec::with_capacity(slots.len());
        for seat in 0..slots.len() {
            match mailbox.drain_one(SeatIndex(seat)) {
                Some(action) => joint_action.push(action),
                None => {
                    defaulted_seats += 1;
                    joint_action.push(self.world.noop_action());
                }
            }
        }
        let drain_us = micros(tick_start.elapsed());

        // 2. Transition.
        let transition_start = Instant::now();
        let transition = self.world.transition(&self.state, &joint_action)?;
        clock.advance_tick();
        let transition_us = micros(transition_start.elapsed());
        let previous = std::mem::replace(&mut self.state, Arc::new(transition.next));

        // 3. Fan out.
        let fanout_start = Instant::now();
        let fanned_out = tick.0 % self.stride == 0;
        if fanned_out {
            agents.broadcast(&self.state);
        }
        let fanout_us = micros(fanout_start.elapsed());

        // 4. Settle.
        let roles = slots.roles();
        variant.settle(&transition.outcome, &roles, &mut self.score);

        // 5. Record.
        if self.recording || variant.forces_recording() {
            let state = Arc::try_unwrap(previous).unwrap_or_else(|shared| (*shared).clone());
            self.trajectory.push(TransitionRecord {
                tick,
                round: clock.round(),
                state,
                joint_action,
                reward: transition.outcome.rewards.to_vec(),
                score: self.score,
                elapsed_secs: clock.elapsed().as_secs_f64(),
                time_left_secs: clock.time_remaining().map(|d| d.as_secs_f64()),
                seats: seat_records(slots),
                trial: variant.trial_tag().map(str::to_owned),
            });
        }

        self.last_metrics = TickMetrics {
            total_us: micros(tick_start.elapsed()),
            drain_us,
            transition_us,
            fanout_us,
            defaulted_seats,
            fanned_out,
        };
        tracing::trace!(
            tick = tick.0,
            score = self.score,
            defaulted_seats,
            fanned_out,
            "tick committed"
        );
        Ok(&self.last_metrics)
    }

    /// The committed state.
    pub fn state(&self) -> &Arc<W::State> {
        &self.state
    }

    /// Running score of the current round.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// The world model.
    pub fn world(&self) -> &W {
        &self.world
    }

    /// Fan-out stride in ticks.
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Metrics from the most recent commit.
    pub fn last_metrics(&self) -> &TickMetrics {
        &self.last_metrics
    }

    /// Whether every commit is recorded regardless of variant.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Return and clear the recorded trajectory.
    pub fn take_trajectory(&mut self) -> Vec<Record<W>> {
        std::mem::take(&mut self.trajectory)
    }
}

/// Seat layout as it appears in records and payloads.
pub(crate) fn seat_records(slots: &SlotTable) -> Vec<SeatRecord> {
    slots
        .seats()
        .map(|(_, occupant)| SeatRecord {
            id: occupant.map(|o| o.id.clone()),
            is_human: occupant.is_some_and(|o| o.role.is_human()),
        })
        .collect()
}
