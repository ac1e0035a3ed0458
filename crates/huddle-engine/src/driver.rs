//! Optional background tick thread for a single session.
//!
//! [`SessionDriver`] moves a [`SessionController`] onto a dedicated thread
//! that ticks it at a fixed rate. The thread owns the session exclusively,
//! so no lock sits on the tick path; input still arrives lock-free through
//! the session's [`ActionSender`]. Progress is published as
//! [`DriverEvent`]s on a bounded channel and dropped when the consumer
//! falls behind.
//!
//! On RESET the thread holds the session inert for its reset pause. On
//! DONE, or on any tick error, it deactivates the session and exits.
//! [`SessionDriver::stop`] wakes the thread from its budget sleep and
//! joins it; the session is handed back through the `JoinHandle`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use huddle_core::{LifecycleStatus, SessionError, WorldModel};
use thiserror::Error;

use crate::agent::StopReport;
use crate::config::{ConfigError, DriverConfig};
use crate::mailbox::ActionSender;
use crate::metrics::millis;
use crate::session::SessionController;
use crate::trajectory::MinimalState;

// ── DriverError ────────────────────────────────────────────────────

/// Errors from [`SessionDriver::spawn`].
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The session could not be activated.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The tick thread could not be started.
    #[error("could not spawn tick thread: {0}")]
    Spawn(#[source] std::io::Error),
}

// ── DriverEvent ────────────────────────────────────────────────────

/// Progress published by the tick thread.
#[derive(Clone, Debug, PartialEq)]
pub enum DriverEvent<S> {
    /// A tick was committed.
    Tick(MinimalState<S>),
    /// A round ended; the session is paused for `pause`.
    Reset {
        /// The round that is about to start.
        round: u32,
        /// Inert period before the next tick.
        pause: Duration,
    },
    /// The session finished.
    Done {
        /// Final score of the last round.
        score: f64,
    },
    /// A tick failed; the driver has stopped.
    Failed {
        /// Rendered error.
        error: String,
    },
}

// ── DriverReport ───────────────────────────────────────────────────

/// Report from [`SessionDriver::stop`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverReport {
    /// Time spent stopping, in milliseconds.
    pub total_ms: u64,
    /// Whether the tick thread was joined and the session recovered.
    pub thread_joined: bool,
    /// Ticks committed.
    pub ticks: u64,
    /// Round resets performed.
    pub resets: u64,
    /// Events dropped because the channel was full.
    pub events_dropped: u64,
    /// Worker shutdown report from the final deactivation.
    pub workers: StopReport,
}

#[derive(Default)]
struct RunStats {
    ticks: u64,
    resets: u64,
    workers: StopReport,
}

// ── SessionDriver ──────────────────────────────────────────────────

/// Fixed-rate tick thread owning one session.
pub struct SessionDriver<W: WorldModel> {
    shutdown: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    events_dropped: Arc<AtomicU64>,
    thread: Option<JoinHandle<(SessionController<W>, RunStats)>>,
    events: Receiver<DriverEvent<W::State>>,
    sender: ActionSender<W::Action>,
    recovered: Option<SessionController<W>>,
    report: Option<DriverReport>,
}

impl<W: WorldModel> SessionDriver<W> {
    /// Activate `session` if needed and start ticking it.
    pub fn spawn(
        mut session: SessionController<W>,
        config: DriverConfig,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        if !session.is_active() {
            session.activate()?;
        }
        let sender = session.action_sender();
        let (tx, rx) = crossbeam_channel::bounded(config.event_buffer);
        let shutdown = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let events_dropped = Arc::new(AtomicU64::new(0));

        let tick_loop = TickLoop {
            session,
            events: tx,
            shutdown: Arc::clone(&shutdown),
            finished: Arc::clone(&finished),
            events_dropped: Arc::clone(&events_dropped),
            tick_budget: config.tick_budget(),
            stats: RunStats::default(),
        };
        let thread = thread::Builder::new()
            .name("huddle-tick".into())
            .spawn(move || tick_loop.run())
            .map_err(DriverError::Spawn)?;

        Ok(Self {
            shutdown,
            finished,
            events_dropped,
            thread: Some(thread),
            events: rx,
            sender,
            recovered: None,
            report: None,
        })
    }

    /// Event stream of the tick thread.
    pub fn events(&self) -> &Receiver<DriverEvent<W::State>> {
        &self.events
    }

    /// Intake handle for the driven session.
    pub fn sender(&self) -> ActionSender<W::Action> {
        self.sender.clone()
    }

    /// Whether the tick thread has exited on its own (DONE or failure) or
    /// been stopped.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Stop the tick thread and recover the session. Idempotent.
    ///
    /// Waits for the current tick and for worker shutdown, which in turn
    /// waits for in-flight inference.
    pub fn stop(&mut self) -> DriverReport {
        if let Some(report) = &self.report {
            return report.clone();
        }
        let start = Instant::now();
        self.shutdown.store(true, Ordering::Release);

        let mut report = DriverReport::default();
        if let Some(handle) = self.thread.take() {
            // Wake the thread from a budget or pause sleep.
            handle.thread().unpark();
            match handle.join() {
                Ok((session, stats)) => {
                    self.recovered = Some(session);
                    report.thread_joined = true;
                    report.ticks = stats.ticks;
                    report.resets = stats.resets;
                    report.workers = stats.workers;
                }
                Err(_) => tracing::error!("tick thread panicked"),
            }
        }
        report.events_dropped = self.events_dropped.load(Ordering::Relaxed);
        report.total_ms = millis(start.elapsed());
        tracing::info!(
            ticks = report.ticks,
            resets = report.resets,
            events_dropped = report.events_dropped,
            total_ms = report.total_ms,
            "session driver stopped"
        );
        self.report = Some(report.clone());
        report
    }

    /// Stop the driver and take back the session, deactivated.
    ///
    /// `None` if the tick thread panicked.
    pub fn into_session(mut self) -> Option<SessionController<W>> {
        self.stop();
        self.recovered.take()
    }
}

impl<W: WorldModel> Drop for SessionDriver<W> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── TickLoop ───────────────────────────────────────────────────────

struct TickLoop<W: WorldModel> {
    session: SessionController<W>,
    events: Sender<DriverEvent<W::State>>,
    shutdown: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    events_dropped: Arc<AtomicU64>,
    tick_budget: Duration,
    stats: RunStats,
}

impl<W: WorldModel> TickLoop<W> {
    fn run(mut self) -> (SessionController<W>, RunStats) {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            let tick_start = Instant::now();

            match self.session.tick() {
                Ok(LifecycleStatus::Active) => {
                    self.stats.ticks += 1;
                    self.publish(DriverEvent::Tick(self.session.serialize_minimal_state()));
                }
                Ok(LifecycleStatus::Reset) => {
                    self.stats.resets += 1;
                    let pause = self.session.reset_pause();
                    self.publish(DriverEvent::Reset {
                        round: self.session.round(),
                        pause,
                    });
                    self.sleep_until(Instant::now() + pause);
                    continue;
                }
                Ok(LifecycleStatus::Done) => {
                    self.stats.ticks += 1;
                    self.publish(DriverEvent::Tick(self.session.serialize_minimal_state()));
                    self.publish(DriverEvent::Done {
                        score: self.session.score(),
                    });
                    break;
                }
                Ok(status @ (LifecycleStatus::Inactive | LifecycleStatus::Error)) => {
                    tracing::warn!(%status, "driven session stopped running");
                    break;
                }
                Err(error) => {
                    tracing::warn!(%error, "tick failed, stopping driver");
                    self.publish(DriverEvent::Failed {
                        error: error.to_string(),
                    });
                    break;
                }
            }

            self.sleep_until(tick_start + self.tick_budget);
        }

        self.stats.workers = self.session.deactivate();
        self.finished.store(true, Ordering::Release);
        (self.session, self.stats)
    }

    fn publish(&self, event: DriverEvent<W::State>) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.events_dropped.fetch_add(1, Ordering::Relaxed);
            }
            // Nobody is listening; nothing to count.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Park until `deadline`, waking early on shutdown.
    ///
    /// `park_timeout` rather than `sleep` so that `stop()` can cut a long
    /// reset pause short with `unpark`.
    fn sleep_until(&self, deadline: Instant) {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::variant::{TimedRounds, Variant};
    use huddle_core::{Outcome, ParticipantId, Transition, WorldError};

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
                outcome: Outcome::from_rewards(joint.iter().map(|a| *a as f64)),
            })
        }
    }

    fn session(variant: Box<dyn Variant>) -> SessionController<Counter> {
        let mut s = SessionController::new(Counter, variant, SessionConfig::default()).unwrap();
        s.add_participant("alice", None).unwrap();
        s
    }

    fn fast() -> DriverConfig {
        DriverConfig {
            tick_rate_hz: 500.0,
            ..Default::default()
        }
    }

    #[test]
    fn ticks_until_stopped_and_returns_session() {
        let untimed = Box::new(TimedRounds::new(1, Duration::from_secs(600)));
        let mut driver = SessionDriver::spawn(session(untimed), fast()).unwrap();
        driver.sender().enqueue(&ParticipantId::from("alice"), 2);
        let applied = driver
            .events()
            .iter()
            .any(|e| matches!(e, DriverEvent::Tick(m) if m.state == 2));
        assert!(applied);

        let report = driver.stop();
        assert!(report.thread_joined);
        assert!(report.ticks >= 1);
        assert_eq!(driver.stop(), report);

        let session = driver.into_session().unwrap();
        assert_eq!(session.status(), LifecycleStatus::Inactive);
        assert_eq!(**session.state(), 2);
    }

    #[test]
    fn finishes_on_done() {
        let short = Box::new(TimedRounds::new(1, Duration::from_millis(30)));
        let driver = SessionDriver::spawn(session(short), fast()).unwrap();
        let done = driver
            .events()
            .iter()
            .find(|e| matches!(e, DriverEvent::Done { .. }));
        assert!(done.is_some());
        let session = driver.into_session().unwrap();
        assert_eq!(session.status(), LifecycleStatus::Inactive);
    }

    #[test]
    fn invalid_driver_config_rejected() {
        let bad = DriverConfig {
            tick_rate_hz: 0.0,
            ..Default::default()
        };
        let variant = Box::new(TimedRounds::new(1, Duration::from_secs(1)));
        assert!(matches!(
            SessionDriver::spawn(session(variant), bad),
            Err(DriverError::Config(ConfigError::InvalidTickRate { .. }))
        ));
    }
}
