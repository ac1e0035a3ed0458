//! Session variants: the rules that differ between game modes.
//!
//! A [`Variant`] decides when a round is over, when the whole session is
//! finished, and how a transition's rewards feed the running score. The
//! mailbox, worker, and commit machinery is shared by every variant.
//!
//! Three variants ship with the engine:
//!
//! - [`TimedRounds`]: a fixed number of rounds, each with a time budget.
//! - [`Tutorial`]: three scripted phases that advance on scoring events.
//! - [`Experiment`]: timed rounds tagged with a trial id and always
//!   recorded.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use huddle_core::{Outcome, PolicyError, Policy, Role, TickId};

/// Read-only view of the current round handed to variant hooks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoundView {
    /// Ticks committed in this round.
    pub tick: TickId,
    /// Current round, 0-based.
    pub round: u32,
    /// Time spent in this round.
    pub elapsed: Duration,
    /// Time left in this round, if rounds are timed.
    pub time_remaining: Option<Duration>,
    /// Running score of this round.
    pub score: f64,
}

impl RoundView {
    /// Whether a timed round has run out of time.
    pub fn round_expired(&self) -> bool {
        self.time_remaining.is_some_and(|t| t.is_zero())
    }
}

/// Variant-specific hooks composed into a session.
///
/// Every method has a default matching a plain, untimed, never-ending
/// session that sums all rewards into the score.
pub trait Variant: Send + 'static {
    /// Short name used in logs and state payloads.
    fn name(&self) -> &'static str;

    /// Occupancy limit. The seat table's physical capacity still applies.
    fn max_participants(&self) -> usize {
        usize::MAX
    }

    /// Time budget of one round, before the session-wide cap.
    fn round_budget(&self) -> Option<Duration> {
        None
    }

    /// Overrides the configured reset pause.
    fn reset_pause(&self) -> Option<Duration> {
        None
    }

    /// Overrides the configured relay stride.
    fn relay_stride(&self) -> Option<u64> {
        None
    }

    /// Whether the current round should end on this tick.
    fn needs_reset(&self, _view: &RoundView) -> bool {
        false
    }

    /// Whether the session has reached its end.
    fn is_finished(&self, _view: &RoundView) -> bool {
        false
    }

    /// Called on every activation, including the reactivation inside a
    /// reset. `started` is the wall-clock activation time.
    fn on_activate(&mut self, _started: SystemTime) {}

    /// Called after a round boundary has been crossed.
    fn on_reset(&mut self) {}

    /// Fold one transition's rewards into the running score.
    ///
    /// `roles` is seat-indexed, `None` for vacant seats.
    fn settle(&mut self, outcome: &Outcome, _roles: &[Option<Role>], score: &mut f64) {
        *score += outcome.total();
    }

    /// Tag attached to every trajectory record.
    fn trial_tag(&self) -> Option<&str> {
        None
    }

    /// Record trajectories regardless of configuration.
    fn forces_recording(&self) -> bool {
        false
    }
}

// ── TimedRounds ────────────────────────────────────────────────────

/// A fixed number of rounds, each lasting `round_time`.
///
/// A round ends when its time is spent; the session finishes when the
/// last round's time is spent.
#[derive(Clone, Debug, PartialEq)]
pub struct TimedRounds {
    rounds: u32,
    round_time: Duration,
    max_participants: usize,
}

impl TimedRounds {
    /// `rounds` is clamped to at least one.
    pub fn new(rounds: u32, round_time: Duration) -> Self {
        Self {
            rounds: rounds.max(1),
            round_time,
            max_participants: usize::MAX,
        }
    }

    /// Limit how many participants may be seated.
    pub fn with_max_participants(mut self, max: usize) -> Self {
        self.max_participants = max;
        self
    }

    /// Number of rounds.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    fn on_last_round(&self, view: &RoundView) -> bool {
        view.round + 1 >= self.rounds
    }
}

impl Variant for TimedRounds {
    fn name(&self) -> &'static str {
        "timed_rounds"
    }

    fn max_participants(&self) -> usize {
        self.max_participants
    }

    fn round_budget(&self) -> Option<Duration> {
        Some(self.round_time)
    }

    fn needs_reset(&self, view: &RoundView) -> bool {
        view.round_expired() && !self.on_last_round(view)
    }

    fn is_finished(&self, view: &RoundView) -> bool {
        view.round >= self.rounds || (view.round_expired() && self.on_last_round(view))
    }
}

// ── Tutorial ───────────────────────────────────────────────────────

/// Number of tutorial phases.
pub const TUTORIAL_PHASES: u32 = 3;

/// Guided two-seat session in three phases.
///
/// - Phases 0 and 1 end as soon as the score is positive.
/// - Phase 2 ends when a human seat earns exactly the target reward on a
///   single tick; its score is held at zero.
///
/// Only human rewards count toward the score. The session finishes once
/// every phase has ended.
#[derive(Clone, Debug, PartialEq)]
pub struct Tutorial {
    phase: u32,
    target_reward: f64,
    target_reached: bool,
}

impl Default for Tutorial {
    fn default() -> Self {
        Self::new(15.0)
    }
}

impl Tutorial {
    /// Create a tutorial whose last phase ends on `target_reward`.
    pub fn new(target_reward: f64) -> Self {
        Self {
            phase: 0,
            target_reward,
            target_reached: false,
        }
    }

    /// Current phase, 0-based.
    pub fn phase(&self) -> u32 {
        self.phase
    }
}

impl Variant for Tutorial {
    fn name(&self) -> &'static str {
        "tutorial"
    }

    fn max_participants(&self) -> usize {
        2
    }

    fn reset_pause(&self) -> Option<Duration> {
        Some(Duration::from_millis(1))
    }

    fn relay_stride(&self) -> Option<u64> {
        Some(8)
    }

    fn needs_reset(&self, view: &RoundView) -> bool {
        match self.phase {
            0 | 1 => view.score > 0.0,
            2 => self.target_reached,
            _ => false,
        }
    }

    fn is_finished(&self, _view: &RoundView) -> bool {
        self.phase >= TUTORIAL_PHASES
    }

    fn on_reset(&mut self) {
        self.phase += 1;
        self.target_reached = false;
    }

    fn settle(&mut self, outcome: &Outcome, roles: &[Option<Role>], score: &mut f64) {
        let human_rewards = roles
            .iter()
            .enumerate()
            .filter(|(_, role)| matches!(role, Some(Role::Human)))
            .map(|(seat, _)| outcome.for_seat(seat));
        if self.phase == 2 {
            *score = 0.0;
            let target = self.target_reward;
            if human_rewards.into_iter().any(|r| r == target) {
                self.target_reached = true;
            }
        } else {
            *score += human_rewards.sum::<f64>();
        }
    }
}

/// Scripted tutorial partner.
///
/// Replays one action loop per phase. The phase advances on every
/// [`reset`](Policy::reset), which the worker protocol calls at the start
/// of each round; phases without a script (or past the last) play `idle`.
#[derive(Clone, Debug)]
pub struct PhaseScript<A> {
    scripts: Vec<Vec<A>>,
    idle: A,
    phase: Option<usize>,
    step: usize,
}

impl<A: Clone> PhaseScript<A> {
    /// Create a script. `scripts[n]` is looped during phase `n`.
    pub fn new(scripts: Vec<Vec<A>>, idle: A) -> Self {
        Self {
            scripts,
            idle,
            phase: None,
            step: 0,
        }
    }

    /// Phase the script is currently in, or `None` before the first round.
    pub fn phase(&self) -> Option<usize> {
        self.phase
    }

    fn next_action(&mut self) -> A {
        let script = self
            .phase
            .and_then(|p| self.scripts.get(p))
            .filter(|s| !s.is_empty());
        let action = match script {
            Some(script) => script[self.step % script.len()].clone(),
            None => self.idle.clone(),
        };
        self.step += 1;
        action
    }
}

impl<S, A> Policy<S, A> for PhaseScript<A>
where
    A: Clone + Send + 'static,
{
    type Observation = ();
    type Memory = ();

    fn observe(&self, _state: &S) {}

    fn act(&mut self, _observation: (), _memory: &()) -> Result<(A, ()), PolicyError> {
        Ok((self.next_action(), ()))
    }

    fn reset(&mut self) {
        self.phase = Some(self.phase.map_or(0, |p| p + 1));
        self.step = 0;
    }
}

// ── Experiment ─────────────────────────────────────────────────────

/// Timed rounds recorded under a per-round trial tag.
///
/// The tag is the participant uid followed by the activation time in
/// whole Unix seconds, refreshed on every activation.
#[derive(Clone, Debug, PartialEq)]
pub struct Experiment {
    rounds: TimedRounds,
    uid: String,
    trial: Option<String>,
}

impl Experiment {
    /// Wrap `rounds` for the study participant `uid`.
    pub fn new(uid: impl Into<String>, rounds: TimedRounds) -> Self {
        Self {
            rounds,
            uid: uid.into(),
            trial: None,
        }
    }

    /// The study participant uid.
    pub fn uid(&self) -> &str {
        &self.uid
    }
}

impl Variant for Experiment {
    fn name(&self) -> &'static str {
        "experiment"
    }

    fn max_participants(&self) -> usize {
        self.rounds.max_participants()
    }

    fn round_budget(&self) -> Option<Duration> {
        self.rounds.round_budget()
    }

    fn needs_reset(&self, view: &RoundView) -> bool {
        self.rounds.needs_reset(view)
    }

    fn is_finished(&self, view: &RoundView) -> bool {
        self.rounds.is_finished(view)
    }

    fn on_activate(&mut self, started: SystemTime) {
        let secs = started
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.trial = Some(format!("{}{}", self.uid, secs));
    }

    fn trial_tag(&self) -> Option<&str> {
        self.trial.as_deref()
    }

    fn forces_recording(&self) -> bool {
        true
    }
}
