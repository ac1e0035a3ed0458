//! Session lifecycle status, tick counter, and round timing.
//!
//! [`SessionClock`] reads time through a [`TimeSource`] so elapsed-time
//! behavior can be driven deterministically with [`ManualTime`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use huddle_core::{LifecycleStatus, TickId};

use crate::metrics::micros;

// ── TimeSource ─────────────────────────────────────────────────────

/// Monotonic time provider.
pub trait TimeSource: Send + Sync + fmt::Debug {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same offset, so a test can keep one handle and
/// advance time after giving another to a session.
#[derive(Clone, Debug)]
pub struct ManualTime {
    origin: Instant,
    offset_us: Arc<AtomicU64>,
}

impl Default for ManualTime {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualTime {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_us: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.offset_us.fetch_add(micros(by), Ordering::SeqCst);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Instant {
        self.origin + Duration::from_micros(self.offset_us.load(Ordering::SeqCst))
    }
}

// ── SessionClock ───────────────────────────────────────────────────

/// Lifecycle status plus tick and round timing for one session.
#[derive(Debug)]
pub struct SessionClock {
    time: Arc<dyn TimeSource>,
    status: LifecycleStatus,
    tick: TickId,
    round: u32,
    round_started: Instant,
    budget: Option<Duration>,
}

impl SessionClock {
    /// Create an INACTIVE clock. `budget` is the per-round time limit,
    /// if rounds are timed.
    pub fn new(time: Arc<dyn TimeSource>, budget: Option<Duration>) -> Self {
        let round_started = time.now();
        Self {
            time,
            status: LifecycleStatus::Inactive,
            tick: TickId::default(),
            round: 0,
            round_started,
            budget,
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> LifecycleStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: LifecycleStatus) {
        self.status = status;
    }

    /// Ticks committed in the current round.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// Current round, 0-based.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Per-round time limit.
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Restart the tick counter and round timer.
    pub(crate) fn start_round(&mut self) {
        self.tick = TickId::default();
        self.round_started = self.time.now();
    }

    /// Move to the next round.
    pub(crate) fn next_round(&mut self) {
        self.round += 1;
    }

    /// Count one committed tick and return its id.
    pub(crate) fn advance_tick(&mut self) -> TickId {
        self.tick = self.tick.next();
        self.tick
    }

    /// Push the round start into the future so a reset pause does not
    /// count against the round's budget.
    pub(crate) fn defer_start(&mut self, pause: Duration) {
        self.round_started += pause;
    }

    /// Time spent in the current round. Zero while a deferred start lies
    /// in the future.
    pub fn elapsed(&self) -> Duration {
        self.time.now().saturating_duration_since(self.round_started)
    }

    /// Time left in the current round, if rounds are timed.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.budget.map(|b| b.saturating_sub(self.elapsed()))
    }

    /// Whether the current round's time is spent.
    pub fn round_expired(&self) -> bool {
        self.budget.is_some_and(|b| self.elapsed() >= b)
    }
}
