//! Per-seat bounded action mailboxes.
//!
//! Producers (client handlers, autonomous workers) call
//! [`ActionMailbox::enqueue`] from any thread; the tick thread drains one
//! action per seat with [`ActionMailbox::drain_one`]. Enqueue never blocks
//! and never fails: input that cannot be delivered is dropped and counted.
//!
//! Lanes are index-aligned with seats. A lane is opened when a seat is
//! filled and closed when it is vacated, so a departed participant's
//! stale input can never reach the seat's next occupant.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use huddle_core::{ParticipantId, SeatIndex};

use crate::metrics::{IntakeCounters, IntakeStats};

struct Lane<A> {
    tx: Sender<A>,
    rx: Receiver<A>,
}

struct Lanes<A> {
    routes: HashMap<ParticipantId, SeatIndex>,
    lanes: Vec<Option<Lane<A>>>,
}

/// Bounded, drop-on-full action buffers, one per seat.
pub struct ActionMailbox<A> {
    active: AtomicBool,
    capacity: usize,
    lanes: RwLock<Lanes<A>>,
    counters: IntakeCounters,
}

impl<A> ActionMailbox<A> {
    /// Create an inactive mailbox set whose lanes each hold `capacity`
    /// actions.
    pub fn new(capacity: usize) -> Self {
        Self {
            active: AtomicBool::new(false),
            capacity,
            lanes: RwLock::new(Lanes {
                routes: HashMap::new(),
                lanes: Vec::new(),
            }),
            counters: IntakeCounters::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Lanes<A>> {
        self.lanes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Lanes<A>> {
        self.lanes.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Submit an action on behalf of `id`.
    ///
    /// Dropped silently when intake is closed, when `id` holds no seat,
    /// when the seat layout is being changed, or when the lane is full.
    pub fn enqueue(&self, id: &ParticipantId, action: A) {
        if !self.active.load(Ordering::Acquire) {
            self.counters.inactive();
            return;
        }
        let Ok(guard) = self.lanes.try_read() else {
            self.counters.contended();
            return;
        };
        let Some(lane) = guard
            .routes
            .get(id)
            .and_then(|seat| guard.lanes.get(seat.0))
            .and_then(Option::as_ref)
        else {
            self.counters.unknown();
            tracing::trace!(participant = %id, "dropping action from unseated participant");
            return;
        };
        match lane.tx.try_send(action) {
            Ok(()) => self.counters.accepted(),
            Err(TrySendError::Full(_)) => self.counters.full(),
            // The mailbox owns both ends of every lane.
            Err(TrySendError::Disconnected(_)) => self.counters.unknown(),
        }
    }

    /// Take the oldest pending action for `seat`, if any.
    pub fn drain_one(&self, seat: SeatIndex) -> Option<A> {
        let guard = self.read();
        guard.lanes.get(seat.0)?.as_ref()?.rx.try_recv().ok()
    }

    /// Discard every pending action.
    pub fn clear_all(&self) -> usize {
        let guard = self.read();
        let mut discarded = 0;
        for lane in guard.lanes.iter().flatten() {
            discarded += lane.rx.try_iter().count();
        }
        discarded
    }

    /// Open a fresh lane for `seat`, routed from `id`.
    ///
    /// Any lane previously at `seat` is replaced along with its contents.
    pub fn open(&self, seat: SeatIndex, id: ParticipantId) {
        let mut guard = self.write();
        if guard.lanes.len() <= seat.0 {
            guard.lanes.resize_with(seat.0 + 1, || None);
        }
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        guard.lanes[seat.0] = Some(Lane { tx, rx });
        guard.routes.retain(|_, s| *s != seat);
        guard.routes.insert(id, seat);
    }

    /// Close the lane at `seat`, discarding anything pending.
    pub fn close(&self, seat: SeatIndex) {
        let mut guard = self.write();
        if let Some(slot) = guard.lanes.get_mut(seat.0) {
            *slot = None;
        }
        guard.routes.retain(|_, s| *s != seat);
    }

    /// Open or close intake.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    /// Whether intake is open.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Number of lanes (open or closed).
    pub fn len(&self) -> usize {
        self.read().lanes.len()
    }

    /// Whether no lane was ever opened.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pending actions at `seat`.
    pub fn pending(&self, seat: SeatIndex) -> usize {
        self.read()
            .lanes
            .get(seat.0)
            .and_then(Option::as_ref)
            .map_or(0, |lane| lane.rx.len())
    }

    /// Per-lane bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the intake counters.
    pub fn stats(&self) -> IntakeStats {
        self.counters.snapshot()
    }

    pub(crate) fn count_unknown(&self) {
        self.counters.unknown();
    }
}

// ── ActionSender ───────────────────────────────────────────────────

/// Cloneable producer handle for a session's mailboxes.
///
/// Hand one to each client connection so input can be submitted without
/// touching the session itself.
pub struct ActionSender<A> {
    mailbox: Arc<ActionMailbox<A>>,
}

impl<A> Clone for ActionSender<A> {
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

impl<A> ActionSender<A> {
    pub(crate) fn new(mailbox: Arc<ActionMailbox<A>>) -> Self {
        Self { mailbox }
    }

    /// Submit an action on behalf of `id`. See [`ActionMailbox::enqueue`].
    pub fn enqueue(&self, id: &ParticipantId, action: A) {
        self.mailbox.enqueue(id, action);
    }

    /// Snapshot of the intake counters.
    pub fn stats(&self) -> IntakeStats {
        self.mailbox.stats()
    }
}

impl<A: FromStr> ActionSender<A> {
    /// Parse a raw client action and submit it.
    ///
    /// Unparseable input is dropped and counted as unknown.
    pub fn enqueue_raw(&self, id: &ParticipantId, raw: &str) {
        enqueue_raw(&self.mailbox, id, raw);
    }
}

pub(crate) fn enqueue_raw<A: FromStr>(mailbox: &ActionMailbox<A>, id: &ParticipantId, raw: &str) {
    match raw.parse::<A>() {
        Ok(action) => mailbox.enqueue(id, action),
        Err(_) => {
            tracing::debug!(participant = %id, raw, "dropping unparseable action");
            mailbox.count_unknown();
        }
    }
}

// Compile-time assertion: mailboxes are shared with producer threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<ActionMailbox<u32>>();
    assert::<ActionSender<u32>>();
};
