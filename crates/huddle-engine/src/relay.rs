//! Latest-value state relay between the tick thread and one worker.
//!
//! A worker only ever cares about the most recent state: a push replaces
//! whatever the worker has not yet picked up. A poison message wakes the
//! worker for shutdown and wins over any later push.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// What a worker receives from its relay.
#[derive(Debug)]
pub enum RelayMessage<S> {
    /// Fresh state snapshot to act on.
    State(Arc<S>),
    /// Stop the worker.
    Poison,
}

#[derive(Debug)]
enum Slot<S> {
    Empty,
    State(Arc<S>),
    Poisoned,
}

/// Single-slot, overwrite-on-push mailbox for state snapshots.
#[derive(Debug)]
pub struct ObservationRelay<S> {
    slot: Mutex<Slot<S>>,
    ready: Condvar,
}

impl<S> Default for ObservationRelay<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ObservationRelay<S> {
    /// Create an empty relay.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<S>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish a state, replacing any unconsumed one.
    ///
    /// Ignored once the relay is poisoned.
    pub fn push(&self, state: Arc<S>) {
        let mut slot = self.lock();
        if matches!(*slot, Slot::Poisoned) {
            return;
        }
        *slot = Slot::State(state);
        self.ready.notify_one();
    }

    /// Tell the worker to stop. Sticky.
    pub fn poison(&self) {
        *self.lock() = Slot::Poisoned;
        self.ready.notify_all();
    }

    /// Block until a message is available and take it.
    ///
    /// A poisoned relay keeps returning [`RelayMessage::Poison`].
    pub fn recv(&self) -> RelayMessage<S> {
        let mut slot = self.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Empty) {
                Slot::State(state) => return RelayMessage::State(state),
                Slot::Poisoned => {
                    *slot = Slot::Poisoned;
                    return RelayMessage::Poison;
                }
                Slot::Empty => {
                    slot = self.ready.wait(slot).unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }

    /// Whether a state is waiting to be picked up.
    pub fn has_pending(&self) -> bool {
        matches!(*self.lock(), Slot::State(_))
    }
}
