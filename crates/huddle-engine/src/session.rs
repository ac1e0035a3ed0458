//! The session controller: seats, lifecycle, and the tick entry point.
//!
//! [`SessionController`] composes the seat table, mailboxes, worker pool,
//! clock, and committer, parametrized by a [`WorldModel`] and a boxed
//! [`Variant`].
//!
//! # Concurrency contract
//!
//! Every method taking `&mut self` must be serialized by the caller: one
//! driver owns the controller (or holds it behind a single lock). The only
//! operation meant for arbitrary threads is action intake, through
//! [`enqueue_action`](SessionController::enqueue_action) or a cloned
//! [`ActionSender`]; it never blocks and never waits on `tick()`.
//!
//! # Lifecycle
//!
//! ```text
//! INACTIVE --activate--> ACTIVE --tick(finished)--> DONE
//!                          |  ^
//!               needs_reset|  |tick returns RESET once
//!                          +--+
//! any --deactivate--> INACTIVE      composition violation --> ERROR
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use huddle_core::{
    Agent, LifecycleStatus, ParticipantId, PolicyLoader, Role, SeatIndex, SessionError, SessionId,
    SlotError, TickId, WorldModel,
};
use indexmap::IndexSet;

use crate::agent::{AgentPool, StopReport};
use crate::clock::{SessionClock, TimeSource, WallClock};
use crate::commit::{seat_records, TurnCommitter};
use crate::config::{ConfigError, SessionConfig};
use crate::mailbox::{self, ActionMailbox, ActionSender};
use crate::metrics::{millis, IntakeStats, TickMetrics};
use crate::slots::SlotTable;
use crate::trajectory::{FullState, MinimalState, TransitionRecord};
use crate::variant::{RoundView, Variant};

/// A multiplayer session driven by discrete ticks.
pub struct SessionController<W: WorldModel> {
    id: SessionId,
    config: SessionConfig,
    variant: Box<dyn Variant>,
    slots: SlotTable,
    spectators: IndexSet<ParticipantId>,
    mailbox: Arc<ActionMailbox<W::Action>>,
    agents: AgentPool<W::State, W::Action>,
    clock: SessionClock,
    committer: TurnCommitter<W>,
    reset_pause: Duration,
}

impl<W: WorldModel> SessionController<W> {
    /// Create an inactive session on the system clock.
    pub fn new(
        world: W,
        variant: Box<dyn Variant>,
        config: SessionConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_time_source(world, variant, config, Arc::new(WallClock))
    }

    /// Create an inactive session reading time from `time`.
    pub fn with_time_source(
        world: W,
        variant: Box<dyn Variant>,
        config: SessionConfig,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let budget = variant
            .round_budget()
            .map(|b| b.min(config.max_round_time()));
        let stride = variant.relay_stride().unwrap_or(config.relay_stride);
        let reset_pause = variant.reset_pause().unwrap_or_else(|| config.reset_pause());
        let id = SessionId::next();
        tracing::info!(
            session = %id,
            variant = variant.name(),
            capacity = config.capacity,
            stride,
            "session created"
        );
        Ok(Self {
            id,
            slots: SlotTable::new(config.capacity, variant.max_participants()),
            spectators: IndexSet::new(),
            mailbox: Arc::new(ActionMailbox::new(config.mailbox_capacity)),
            agents: AgentPool::new(),
            clock: SessionClock::new(time, budget),
            committer: TurnCommitter::new(world, stride, config.record_trajectory),
            reset_pause,
            variant,
            config,
        })
    }

    // ── Participants ───────────────────────────────────────────────

    /// Seat a human participant.
    ///
    /// Without `seat`, the lowest vacant seat is reused.
    pub fn add_participant(
        &mut self,
        id: impl Into<ParticipantId>,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, SessionError> {
        self.seat(id.into(), Role::Human, seat)
    }

    /// Seat an autonomous participant driven by `agent`.
    pub fn add_autonomous(
        &mut self,
        id: impl Into<ParticipantId>,
        agent: Box<dyn Agent<W::State, W::Action>>,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, SessionError> {
        let id = id.into();
        let seat = self.seat(id.clone(), Role::Autonomous, seat)?;
        self.agents.insert(id, agent);
        Ok(seat)
    }

    /// Load the policy `name` through `loader` and seat it.
    ///
    /// The participant id is `"{name}_{seat}"`.
    pub fn add_autonomous_from(
        &mut self,
        loader: &dyn PolicyLoader<W::State, W::Action>,
        name: &str,
        seat: Option<SeatIndex>,
    ) -> Result<ParticipantId, SessionError> {
        self.ensure_mutable()?;
        if self.slots.is_full() {
            return Err(SlotError::CapacityExceeded {
                max: self.slots.max_occupants(),
            }
            .into());
        }
        let seat = match seat {
            Some(seat) => seat,
            None => self.slots.next_vacant().ok_or(SlotError::CapacityExceeded {
                max: self.slots.max_occupants(),
            })?,
        };
        let id = ParticipantId::new(format!("{name}_{seat}"));
        let agent = loader
            .load(name, seat, self.config.agent_dir.as_deref())
            .map_err(|source| SessionError::Policy {
                participant: id.clone(),
                source,
            })?;
        self.add_autonomous(id.clone(), agent, Some(seat))?;
        Ok(id)
    }

    /// Seating is only allowed while INACTIVE.
    fn ensure_mutable(&self) -> Result<(), SessionError> {
        match self.clock.status() {
            LifecycleStatus::Inactive => Ok(()),
            LifecycleStatus::Error => Err(SessionError::Terminated),
            LifecycleStatus::Active | LifecycleStatus::Reset | LifecycleStatus::Done => {
                Err(SlotError::AlreadyActive.into())
            }
        }
    }

    fn seat(
        &mut self,
        id: ParticipantId,
        role: Role,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, SessionError> {
        self.ensure_mutable()?;
        let seat = self.slots.add(id.clone(), role, seat)?;
        self.mailbox.open(seat, id.clone());
        tracing::info!(session = %self.id, participant = %id, %seat, ?role, "participant seated");
        Ok(seat)
    }

    /// Vacate `id`'s seat. Returns `false` if `id` held no seat.
    ///
    /// Removing an autonomous participant from a running session joins
    /// its worker first.
    pub fn remove_participant(&mut self, id: &ParticipantId) -> bool {
        let Some((seat, role)) = self.slots.remove(id) else {
            return false;
        };
        self.mailbox.close(seat);
        if role == Role::Autonomous {
            self.agents.remove(id);
        }
        tracing::info!(session = %self.id, participant = %id, %seat, "participant removed");
        true
    }

    /// Register a spectator.
    pub fn add_spectator(&mut self, id: impl Into<ParticipantId>) -> Result<(), SessionError> {
        let id = id.into();
        if self.slots.seat_of(&id).is_some() {
            return Err(SlotError::SpectatorIsParticipant { id }.into());
        }
        self.spectators.insert(id);
        Ok(())
    }

    /// Unregister a spectator. Returns `false` if `id` was not spectating.
    pub fn remove_spectator(&mut self, id: &ParticipantId) -> bool {
        self.spectators.shift_remove(id)
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Start the session: open intake, start one worker per autonomous
    /// participant, and seed each with the initial state.
    ///
    /// A seat table that disagrees with the registered agents moves the
    /// session to ERROR.
    pub fn activate(&mut self) -> Result<(), SessionError> {
        match self.clock.status() {
            LifecycleStatus::Error => return Err(SessionError::Terminated),
            LifecycleStatus::Active | LifecycleStatus::Reset => {
                return Err(SessionError::AlreadyActive)
            }
            LifecycleStatus::Inactive | LifecycleStatus::Done => {}
        }
        if let Err(reason) = self.check_composition() {
            tracing::error!(session = %self.id, %reason, "inconsistent participant set");
            self.clock.set_status(LifecycleStatus::Error);
            return Err(SessionError::InconsistentState { reason });
        }
        self.go_live()?;
        tracing::info!(
            session = %self.id,
            round = self.clock.round(),
            workers = self.agents.running(),
            "session activated"
        );
        Ok(())
    }

    fn check_composition(&self) -> Result<(), String> {
        for (seat, occupant) in self.slots.occupants() {
            if occupant.role == Role::Autonomous && !self.agents.contains(&occupant.id) {
                return Err(format!(
                    "autonomous participant '{}' at seat {seat} has no agent",
                    occupant.id
                ));
            }
        }
        for id in self.agents.ids() {
            if self.agents.is_lost(id) {
                return Err(format!("worker for '{id}' died and lost its agent"));
            }
            let seated = self
                .slots
                .seat_of(id)
                .and_then(|seat| self.slots.occupant(seat))
                .is_some_and(|o| o.role == Role::Autonomous);
            if !seated {
                return Err(format!("agent '{id}' does not hold an autonomous seat"));
            }
        }
        Ok(())
    }

    fn go_live(&mut self) -> Result<(), SessionError> {
        self.clock.start_round();
        self.committer.start_round(self.clock.round());
        self.variant.on_activate(SystemTime::now());
        self.mailbox.clear_all();
        self.mailbox.set_active(true);
        if let Err(err) = self.agents.start_all(&self.mailbox, self.committer.state()) {
            self.go_idle();
            let status = match err {
                SessionError::InconsistentState { .. } => LifecycleStatus::Error,
                _ => LifecycleStatus::Inactive,
            };
            self.clock.set_status(status);
            return Err(err);
        }
        self.clock.set_status(LifecycleStatus::Active);
        Ok(())
    }

    fn go_idle(&mut self) -> StopReport {
        self.mailbox.set_active(false);
        let report = self.agents.stop_all();
        self.mailbox.clear_all();
        report
    }

    /// Stop the session: close intake, stop and join every worker, and
    /// discard pending input.
    ///
    /// Blocks until every in-flight inference call has returned. ERROR
    /// stays ERROR; every other status becomes INACTIVE.
    pub fn deactivate(&mut self) -> StopReport {
        let report = self.go_idle();
        if self.clock.status() != LifecycleStatus::Error {
            self.clock.set_status(LifecycleStatus::Inactive);
        }
        tracing::info!(
            session = %self.id,
            joined = report.joined,
            lost = report.lost,
            total_ms = report.total_ms,
            "session deactivated"
        );
        report
    }

    /// Advance the session by one tick.
    ///
    /// Returns INACTIVE without side effects when the session is not
    /// running, RESET when a round boundary was crossed (the caller should
    /// then wait [`reset_pause`](Self::reset_pause) before ticking again),
    /// DONE once the session has finished, and ACTIVE otherwise.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Terminated`] once the session is in ERROR.
    /// - [`SessionError::Policy`] when an autonomous worker's policy
    ///   failed since the previous tick. The worker has exited; its seat
    ///   receives the no-op action from then on.
    /// - [`SessionError::World`] when the transition failed. The state
    ///   and tick counter are unchanged; the actions drained for the
    ///   failed tick are discarded.
    pub fn tick(&mut self) -> Result<LifecycleStatus, SessionError> {
        match self.clock.status() {
            LifecycleStatus::Error => return Err(SessionError::Terminated),
            LifecycleStatus::Inactive => return Ok(LifecycleStatus::Inactive),
            LifecycleStatus::Done => return Ok(LifecycleStatus::Done),
            LifecycleStatus::Active | LifecycleStatus::Reset => {}
        }
        if let Some(fault) = self.agents.take_fault() {
            return Err(fault.into());
        }

        if self.variant.needs_reset(&self.round_view()) {
            return self.cycle_round();
        }

        self.committer.commit(
            &mut self.clock,
            &self.slots,
            &self.mailbox,
            &self.agents,
            self.variant.as_mut(),
        )?;

        if self.variant.is_finished(&self.round_view()) {
            self.finish();
            return Ok(LifecycleStatus::Done);
        }
        self.clock.set_status(LifecycleStatus::Active);
        Ok(LifecycleStatus::Active)
    }

    /// End the current round now.
    ///
    /// Returns RESET after restarting the session for the next round, or
    /// DONE if no round follows.
    pub fn reset(&mut self) -> Result<LifecycleStatus, SessionError> {
        match self.clock.status() {
            LifecycleStatus::Error => Err(SessionError::Terminated),
            LifecycleStatus::Active | LifecycleStatus::Reset => self.cycle_round(),
            LifecycleStatus::Inactive | LifecycleStatus::Done => Err(SessionError::NotActive),
        }
    }

    fn cycle_round(&mut self) -> Result<LifecycleStatus, SessionError> {
        if self.variant.is_finished(&self.round_view()) {
            self.finish();
            return Ok(LifecycleStatus::Done);
        }
        self.go_idle();
        self.variant.on_reset();
        if self.variant.is_finished(&self.upcoming_round_view()) {
            self.finish();
            return Ok(LifecycleStatus::Done);
        }
        self.clock.next_round();
        self.go_live()?;
        self.clock.defer_start(self.reset_pause);
        tracing::info!(
            session = %self.id,
            round = self.clock.round(),
            pause_ms = millis(self.reset_pause),
            "round reset"
        );
        Ok(LifecycleStatus::Reset)
    }

    fn finish(&mut self) {
        self.mailbox.set_active(false);
        self.clock.set_status(LifecycleStatus::Done);
        tracing::info!(
            session = %self.id,
            round = self.clock.round(),
            score = self.committer.score(),
            "session finished"
        );
    }

    fn round_view(&self) -> RoundView {
        RoundView {
            tick: self.clock.tick(),
            round: self.clock.round(),
            elapsed: self.clock.elapsed(),
            time_remaining: self.clock.time_remaining(),
            score: self.committer.score(),
        }
    }

    /// The round after the current one, as it would look on its first
    /// tick.
    fn upcoming_round_view(&self) -> RoundView {
        RoundView {
            tick: TickId::default(),
            round: self.clock.round() + 1,
            elapsed: Duration::ZERO,
            time_remaining: self.clock.budget(),
            score: 0.0,
        }
    }

    // ── Intake ─────────────────────────────────────────────────────

    /// Submit an action for `id`. Never blocks; stray input is dropped.
    pub fn enqueue_action(&self, id: &ParticipantId, action: W::Action) {
        self.mailbox.enqueue(id, action);
    }

    /// Cloneable intake handle for producer threads.
    pub fn action_sender(&self) -> ActionSender<W::Action> {
        ActionSender::new(Arc::clone(&self.mailbox))
    }

    /// Cumulative intake counters.
    pub fn intake_stats(&self) -> IntakeStats {
        self.mailbox.stats()
    }

    // ── Payloads ───────────────────────────────────────────────────

    /// Compact per-tick state for clients.
    pub fn serialize_minimal_state(&self) -> MinimalState<W::State> {
        MinimalState {
            status: self.clock.status(),
            tick: self.clock.tick(),
            round: self.clock.round(),
            score: self.committer.score(),
            time_left_secs: self.clock.time_remaining().map(|d| d.as_secs_f64()),
            state: (**self.committer.state()).clone(),
        }
    }

    /// Complete session description. The live payload is present only
    /// while the session is running.
    pub fn serialize_full_state(&self) -> FullState<W::State> {
        FullState {
            session: self.id,
            variant: self.variant.name(),
            capacity: self.slots.capacity(),
            seats: seat_records(&self.slots),
            spectators: self.spectators.iter().cloned().collect(),
            minimal: self
                .clock
                .status()
                .is_live()
                .then(|| self.serialize_minimal_state()),
        }
    }

    /// Return and clear the recorded trajectory.
    pub fn collect_trajectory(&mut self) -> Vec<TransitionRecord<W::State, W::Action>> {
        self.committer.take_trajectory()
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle status.
    pub fn status(&self) -> LifecycleStatus {
        self.clock.status()
    }

    /// Whether ticks are being processed.
    pub fn is_active(&self) -> bool {
        self.clock.status().is_live()
    }

    /// Whether the occupancy limit has been reached.
    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }

    /// Whether the session is full and not [empty](Self::is_empty).
    pub fn is_ready(&self) -> bool {
        self.is_full() && !self.is_empty()
    }

    /// Whether nobody is left who cares about this session: no occupants,
    /// or no humans and no spectators.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() || (self.spectators.is_empty() && self.slots.human_count() == 0)
    }

    /// Number of occupied seats.
    pub fn occupant_count(&self) -> usize {
        self.slots.occupant_count()
    }

    /// Seat held by `id`, if any.
    pub fn seat_of(&self, id: &ParticipantId) -> Option<SeatIndex> {
        self.slots.seat_of(id)
    }

    /// Ticks committed in the current round.
    pub fn tick_id(&self) -> TickId {
        self.clock.tick()
    }

    /// Current round, 0-based.
    pub fn round(&self) -> u32 {
        self.clock.round()
    }

    /// Running score of the current round.
    pub fn score(&self) -> f64 {
        self.committer.score()
    }

    /// Time left in the current round, if rounds are timed.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.clock.time_remaining()
    }

    /// How long the caller should hold the session inert after RESET.
    pub fn reset_pause(&self) -> Duration {
        self.reset_pause
    }

    /// The committed world state.
    pub fn state(&self) -> &Arc<W::State> {
        self.committer.state()
    }

    /// The world model.
    pub fn world(&self) -> &W {
        self.committer.world()
    }

    /// Metrics from the most recent committed tick.
    pub fn last_metrics(&self) -> &TickMetrics {
        self.committer.last_metrics()
    }

    /// Number of autonomous workers currently running.
    pub fn running_workers(&self) -> usize {
        self.agents.running()
    }

    /// Name of the composed variant.
    pub fn variant_name(&self) -> &'static str {
        self.variant.name()
    }

    /// The configuration this session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl<W> SessionController<W>
where
    W: WorldModel,
    W::Action: FromStr,
{
    /// Parse a raw client action and submit it for `id`.
    ///
    /// Unparseable input is dropped like any other stray input.
    pub fn enqueue_raw(&self, id: &ParticipantId, raw: &str) {
        mailbox::enqueue_raw(&self.mailbox, id, raw);
    }
}

impl<W: WorldModel> Drop for SessionController<W> {
    fn drop(&mut self) {
        if self.agents.running() > 0 || self.mailbox.is_active() {
            self.deactivate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTime;
    use crate::variant::TimedRounds;
    use huddle_core::{Outcome, PolicyError, Transition, WorldError};

    struct Counter;

    impl WorldModel for Counter {
        type State = u64;
        type Action = u64;

        fn initial_state(&self, _round: u32) -> u64 {
            0
        }

        fn noop_action(&self) -> u64 {
            0
        }

        fn transition(&self, state: &u64, joint: &[u64]) -> Result<Transition<u64>, WorldError> {
            Ok(Transition {
                next: state + joint.iter().sum::<u64>(),
                outcome: Outcome::zero(joint.len()),
            })
        }
    }

    struct Idle;

    impl Agent<u64, u64> for Idle {
        fn decide(&mut self, _: &u64) -> Result<u64, PolicyError> {
            Ok(0)
        }

        fn reset(&mut self) {}
    }

    fn session() -> (ManualTime, SessionController<Counter>) {
        let time = ManualTime::new();
        let s = SessionController::with_time_source(
            Counter,
            Box::new(TimedRounds::new(2, Duration::from_secs(10))),
            SessionConfig::default(),
            Arc::new(time.clone()),
        )
        .unwrap();
        (time, s)
    }

    #[test]
    fn session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SessionController<Counter>>();
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = SessionConfig {
            capacity: 0,
            ..Default::default()
        };
        let variant = Box::new(TimedRounds::new(1, Duration::ZERO));
        let err = SessionController::new(Counter, variant, cfg);
        assert!(matches!(err, Err(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn inactive_tick_is_a_no_op() {
        let (_, mut s) = session();
        s.add_participant("alice", None).unwrap();
        assert_eq!(s.tick().unwrap(), LifecycleStatus::Inactive);
        assert_eq!(s.tick_id(), TickId(0));
        assert_eq!(**s.state(), 0);
    }

    #[test]
    fn cannot_seat_while_active() {
        let (_, mut s) = session();
        s.add_participant("alice", None).unwrap();
        s.activate().unwrap();
        assert!(matches!(
            s.add_participant("bob", None),
            Err(SessionError::Slot(SlotError::AlreadyActive))
        ));
        assert!(matches!(s.activate(), Err(SessionError::AlreadyActive)));
        s.deactivate();
    }

    #[test]
    fn spectators_cannot_play() {
        let (_, mut s) = session();
        s.add_participant("alice", None).unwrap();
        assert!(matches!(
            s.add_spectator("alice"),
            Err(SessionError::Slot(SlotError::SpectatorIsParticipant { .. }))
        ));
        s.add_spectator("carol").unwrap();
        assert!(s.remove_spectator(&ParticipantId::from("carol")));
        assert!(!s.remove_spectator(&ParticipantId::from("carol")));
    }

    #[test]
    fn emptiness_tracks_humans_and_spectators() {
        let (_, mut s) = session();
        assert!(s.is_empty());
        s.add_autonomous("bot", Box::new(Idle), None).unwrap();
        assert!(s.is_empty());
        s.add_spectator("carol").unwrap();
        assert!(!s.is_empty());
        s.add_participant("alice", None).unwrap();
        assert!(s.is_full());
        assert!(s.is_ready());
    }

    #[test]
    fn bots_alone_are_not_ready() {
        let (_, mut s) = session();
        s.add_autonomous("bot_0", Box::new(Idle), None).unwrap();
        s.add_autonomous("bot_1", Box::new(Idle), None).unwrap();
        assert!(s.is_full());
        assert!(s.is_empty());
        assert!(!s.is_ready());
        s.add_spectator("carol").unwrap();
        assert!(s.is_ready());
    }

    #[test]
    fn cannot_seat_once_done() {
        let (time, mut s) = session();
        s.add_participant("alice", None).unwrap();
        s.activate().unwrap();
        time.advance(Duration::from_secs(10));
        assert_eq!(s.tick().unwrap(), LifecycleStatus::Reset);
        time.advance(s.reset_pause() + Duration::from_secs(10));
        assert_eq!(s.tick().unwrap(), LifecycleStatus::Done);

        assert!(matches!(
            s.add_participant("bob", None),
            Err(SessionError::Slot(SlotError::AlreadyActive))
        ));
        assert!(matches!(
            s.add_autonomous("bot", Box::new(Idle), None),
            Err(SessionError::Slot(SlotError::AlreadyActive))
        ));
        assert_eq!(s.occupant_count(), 1);

        s.deactivate();
        assert_eq!(s.add_participant("bob", None).unwrap(), SeatIndex(1));
    }

    #[test]
    fn reset_requires_running_session() {
        let (_, mut s) = session();
        assert!(matches!(s.reset(), Err(SessionError::NotActive)));
    }

    #[test]
    fn explicit_reset_starts_next_round() {
        let (_, mut s) = session();
        s.add_participant("alice", None).unwrap();
        s.activate().unwrap();
        s.enqueue_action(&ParticipantId::from("alice"), 3);
        assert_eq!(s.tick().unwrap(), LifecycleStatus::Active);
        assert_eq!(**s.state(), 3);
        assert_eq!(s.reset().unwrap(), LifecycleStatus::Reset);
        assert_eq!(s.round(), 1);
        assert_eq!(s.tick_id(), TickId(0));
        assert_eq!(**s.state(), 0);
        assert_eq!(s.status(), LifecycleStatus::Active);
        s.deactivate();
    }

    #[test]
    fn explicit_reset_on_last_round_finishes() {
        let (_, mut s) = session();
        s.add_participant("alice", None).unwrap();
        s.activate().unwrap();
        assert_eq!(s.reset().unwrap(), LifecycleStatus::Reset);
        s.enqueue_action(&ParticipantId::from("alice"), 4);
        s.tick().unwrap();

        assert_eq!(s.reset().unwrap(), LifecycleStatus::Done);
        assert_eq!(s.status(), LifecycleStatus::Done);
        assert_eq!(s.round(), 1);
        assert_eq!(**s.state(), 4);
        assert_eq!(s.tick().unwrap(), LifecycleStatus::Done);
        s.deactivate();
    }

    #[test]
    fn full_state_hides_live_payload_when_inactive() {
        let (_, mut s) = session();
        s.add_participant("alice", None).unwrap();
        let full = s.serialize_full_state();
        assert!(full.minimal.is_none());
        assert_eq!(full.seats.len(), 1);
        s.activate().unwrap();
        assert!(s.serialize_full_state().minimal.is_some());
        s.deactivate();
    }
}
