//! Per-tick timing metrics and cumulative intake counters.
//!
//! [`TickMetrics`] captures timing for a single committed tick.
//! [`IntakeStats`] is a point-in-time copy of the mailbox's lock-free
//! counters, which record every action the intake path silently absorbed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// `d` in whole microseconds, saturating at `u64::MAX`.
pub(crate) fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// `d` in whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Timing data collected during a single committed tick.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickMetrics {
    /// Wall-clock time for the entire commit, in microseconds.
    pub total_us: u64,
    /// Time spent draining mailboxes into the joint action.
    pub drain_us: u64,
    /// Time spent inside the world model's transition.
    pub transition_us: u64,
    /// Time spent pushing the new state into autonomous relays.
    pub fanout_us: u64,
    /// Seats whose mailbox was empty and received the no-op action.
    pub defaulted_seats: u32,
    /// Whether this tick fanned the state out to autonomous participants.
    pub fanned_out: bool,
}

/// Snapshot of the intake counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntakeStats {
    /// Actions that reached a mailbox.
    pub accepted: u64,
    /// Actions dropped because the seat's mailbox was full.
    pub dropped_full: u64,
    /// Actions dropped because the session was not active.
    pub dropped_inactive: u64,
    /// Actions from identities that do not occupy a seat (or unparseable
    /// raw input).
    pub dropped_unknown: u64,
    /// Actions dropped because the seat layout was being changed.
    pub dropped_contended: u64,
}

impl IntakeStats {
    /// Total actions dropped for any reason.
    pub fn dropped(&self) -> u64 {
        self.dropped_full + self.dropped_inactive + self.dropped_unknown + self.dropped_contended
    }
}

/// Lock-free cumulative counters updated by producer threads.
#[derive(Debug, Default)]
pub(crate) struct IntakeCounters {
    accepted: AtomicU64,
    dropped_full: AtomicU64,
    dropped_inactive: AtomicU64,
    dropped_unknown: AtomicU64,
    dropped_contended: AtomicU64,
}

impl IntakeCounters {
    pub(crate) fn accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn full(&self) {
        self.dropped_full.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inactive(&self) {
        self.dropped_inactive.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn unknown(&self) {
        self.dropped_unknown.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn contended(&self) {
        self.dropped_contended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> IntakeStats {
        IntakeStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped_full: self.dropped_full.load(Ordering::Relaxed),
            dropped_inactive: self.dropped_inactive.load(Ordering::Relaxed),
            dropped_unknown: self.dropped_unknown.load(Ordering::Relaxed),
            dropped_contended: self.dropped_contended.load(Ordering::Relaxed),
        }
    }
}
