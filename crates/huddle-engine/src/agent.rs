//! Background inference workers for autonomous participants.
//!
//! [`AgentPool`] owns one [`Agent`] per autonomous participant. While the
//! session is active each agent lives on its own thread:
//!
//! 1. block on the participant's [`ObservationRelay`],
//! 2. run inference on the received snapshot (no session lock held),
//! 3. enqueue the action through the same [`ActionMailbox`] path as
//!    human input,
//! 4. repeat until the relay delivers [`RelayMessage::Poison`].
//!
//! The poison message is the only shutdown signal; workers never poll a
//! liveness flag. The agent is handed to its thread only after the thread
//! has started, and handed back through the `JoinHandle` on exit, so
//! recurrent policy state survives deactivation and failed spawns alike.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use huddle_core::{Agent, ParticipantId, PolicyError, SessionError};
use indexmap::IndexMap;

use crate::mailbox::ActionMailbox;
use crate::metrics::millis;
use crate::relay::{ObservationRelay, RelayMessage};

// ── StopReport ─────────────────────────────────────────────────────

/// Report from [`AgentPool::stop_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Wall-clock time from poisoning to the last join, in milliseconds.
    pub total_ms: u64,
    /// Workers that exited cleanly and returned their agent.
    pub joined: usize,
    /// Workers that panicked. Their agents are gone.
    pub lost: usize,
}

/// A policy failure raised on a worker thread, waiting to be reported.
#[derive(Debug)]
pub struct WorkerFault {
    /// The participant whose policy failed.
    pub participant: ParticipantId,
    /// The failure.
    pub error: PolicyError,
}

impl From<WorkerFault> for SessionError {
    fn from(fault: WorkerFault) -> Self {
        SessionError::Policy {
            participant: fault.participant,
            source: fault.error,
        }
    }
}

type FaultSlot = Arc<Mutex<Option<WorkerFault>>>;

fn lock_fault(slot: &FaultSlot) -> MutexGuard<'_, Option<WorkerFault>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

// ── AgentPool ──────────────────────────────────────────────────────

/// What a worker thread returns: its agent, unless the agent never arrived.
type WorkerOutput<S, A> = Option<Box<dyn Agent<S, A>>>;
type WorkerBody<S, A> = Box<dyn FnOnce() -> WorkerOutput<S, A> + Send>;
type Spawner<S, A> =
    fn(thread::Builder, WorkerBody<S, A>) -> io::Result<JoinHandle<WorkerOutput<S, A>>>;

fn os_spawn<S, A>(
    builder: thread::Builder,
    body: WorkerBody<S, A>,
) -> io::Result<JoinHandle<WorkerOutput<S, A>>>
where
    S: 'static,
    A: 'static,
{
    builder.spawn(body)
}

struct Worker<S, A> {
    relay: Arc<ObservationRelay<S>>,
    handle: JoinHandle<WorkerOutput<S, A>>,
}

enum AgentSlot<S, A> {
    Idle(Box<dyn Agent<S, A>>),
    Running(Worker<S, A>),
    /// The worker panicked and took its agent with it.
    Lost,
}

/// The autonomous participants of one session and their workers.
pub struct AgentPool<S, A> {
    agents: IndexMap<ParticipantId, AgentSlot<S, A>>,
    fault: FaultSlot,
    spawn: Spawner<S, A>,
}

impl<S, A> Default for AgentPool<S, A>
where
    S: Send + Sync + 'static,
    A: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> AgentPool<S, A>
where
    S: Send + Sync + 'static,
    A: Send + 'static,
{
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            agents: IndexMap::new(),
            fault: Arc::new(Mutex::new(None)),
            spawn: os_spawn::<S, A>,
        }
    }

    /// Register an idle agent. Replaces any previous agent for `id`.
    pub fn insert(&mut self, id: ParticipantId, agent: Box<dyn Agent<S, A>>) {
        self.agents.insert(id, AgentSlot::Idle(agent));
    }

    /// Remove the agent for `id`, stopping its worker first if running.
    ///
    /// Returns the agent, or `None` if `id` is unknown or its worker was
    /// lost.
    pub fn remove(&mut self, id: &ParticipantId) -> Option<Box<dyn Agent<S, A>>> {
        match self.agents.shift_remove(id)? {
            AgentSlot::Idle(agent) => Some(agent),
            AgentSlot::Running(worker) => {
                worker.relay.poison();
                join_worker(id, worker.handle)
            }
            AgentSlot::Lost => None,
        }
    }

    /// Whether `id` is a registered autonomous participant.
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.agents.contains_key(id)
    }

    /// Whether the worker for `id` panicked and took its agent with it.
    pub fn is_lost(&self, id: &ParticipantId) -> bool {
        matches!(self.agents.get(id), Some(AgentSlot::Lost))
    }

    /// Registered participants in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.agents.keys()
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Number of workers currently running.
    pub fn running(&self) -> usize {
        self.agents
            .values()
            .filter(|slot| matches!(slot, AgentSlot::Running(_)))
            .count()
    }

    /// Reset every idle agent and start its worker, seeding it with
    /// `initial`.
    ///
    /// Stops at the first failure. Workers started before the failure
    /// keep running; the caller is expected to [`stop_all`](Self::stop_all).
    /// An agent whose thread could not be spawned stays idle.
    pub fn start_all(
        &mut self,
        mailbox: &Arc<ActionMailbox<A>>,
        initial: &Arc<S>,
    ) -> Result<(), SessionError> {
        lock_fault(&self.fault).take();
        for (id, slot) in self.agents.iter_mut() {
            let agent = match std::mem::replace(slot, AgentSlot::Lost) {
                AgentSlot::Idle(agent) => agent,
                running @ AgentSlot::Running(_) => {
                    *slot = running;
                    continue;
                }
                AgentSlot::Lost => {
                    return Err(SessionError::InconsistentState {
                        reason: format!("autonomous participant '{id}' lost its agent"),
                    });
                }
            };
            match spawn_worker(
                self.spawn,
                id.clone(),
                agent,
                Arc::clone(mailbox),
                Arc::clone(&self.fault),
            ) {
                Ok(worker) => {
                    worker.relay.push(Arc::clone(initial));
                    *slot = AgentSlot::Running(worker);
                }
                Err((agent, err)) => {
                    *slot = AgentSlot::Idle(agent);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Publish `state` to every running worker.
    pub fn broadcast(&self, state: &Arc<S>) {
        for slot in self.agents.values() {
            if let AgentSlot::Running(worker) = slot {
                worker.relay.push(Arc::clone(state));
            }
        }
    }

    /// Poison every relay, then wait for every worker to exit.
    ///
    /// Blocks for as long as the slowest in-flight inference call.
    pub fn stop_all(&mut self) -> StopReport {
        let start = Instant::now();
        for slot in self.agents.values() {
            if let AgentSlot::Running(worker) = slot {
                worker.relay.poison();
            }
        }

        let mut report = StopReport::default();
        for (id, slot) in self.agents.iter_mut() {
            let worker = match std::mem::replace(slot, AgentSlot::Lost) {
                AgentSlot::Running(worker) => worker,
                other => {
                    *slot = other;
                    continue;
                }
            };
            if let Some(agent) = join_worker(id, worker.handle) {
                *slot = AgentSlot::Idle(agent);
                report.joined += 1;
            } else {
                report.lost += 1;
            }
        }
        report.total_ms = millis(start.elapsed());
        report
    }

    /// Take the first policy failure raised since the last call, if any.
    pub fn take_fault(&self) -> Option<WorkerFault> {
        lock_fault(&self.fault).take()
    }
}

impl<S, A> Drop for AgentPool<S, A> {
    fn drop(&mut self) {
        for slot in self.agents.values() {
            if let AgentSlot::Running(worker) = slot {
                worker.relay.poison();
            }
        }
        for (_, slot) in self.agents.drain(..) {
            if let AgentSlot::Running(worker) = slot {
                let _ = worker.handle.join();
            }
        }
    }
}

fn join_worker<S, A>(
    id: &ParticipantId,
    handle: JoinHandle<WorkerOutput<S, A>>,
) -> Option<Box<dyn Agent<S, A>>> {
    match handle.join() {
        Ok(Some(agent)) => Some(agent),
        Ok(None) => {
            tracing::error!(participant = %id, "agent worker exited without its agent");
            None
        }
        Err(_) => {
            tracing::error!(participant = %id, "agent worker panicked");
            None
        }
    }
}

/// Start a worker for `agent`. On failure the agent is handed back.
fn spawn_worker<S, A>(
    spawn: Spawner<S, A>,
    id: ParticipantId,
    mut agent: Box<dyn Agent<S, A>>,
    mailbox: Arc<ActionMailbox<A>>,
    fault: FaultSlot,
) -> Result<Worker<S, A>, (Box<dyn Agent<S, A>>, SessionError)>
where
    S: Send + Sync + 'static,
    A: Send + 'static,
{
    agent.reset();
    let relay = Arc::new(ObservationRelay::new());
    let worker_relay = Arc::clone(&relay);
    let (handoff_tx, handoff_rx) = crossbeam_channel::bounded::<Box<dyn Agent<S, A>>>(1);
    let participant = id.clone();
    let body: WorkerBody<S, A> = Box::new(move || {
        let mut agent = handoff_rx.recv().ok()?;
        worker_loop(&participant, agent.as_mut(), &worker_relay, &mailbox, &fault);
        Some(agent)
    });
    let builder = thread::Builder::new().name(format!("huddle-agent-{id}"));
    let handle = match spawn(builder, body) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(participant = %id, error = %e, "failed to spawn agent worker");
            let err = SessionError::WorkerSpawn {
                participant: id,
                reason: e.to_string(),
            };
            return Err((agent, err));
        }
    };
    // The receiver lives until the thread has taken the agent.
    if let Err(returned) = handoff_tx.send(agent) {
        let _ = handle.join();
        let err = SessionError::WorkerSpawn {
            participant: id,
            reason: "worker exited before receiving its agent".into(),
        };
        return Err((returned.into_inner(), err));
    }
    tracing::debug!(participant = %id, "agent worker started");
    Ok(Worker { relay, handle })
}

fn worker_loop<S, A>(
    id: &ParticipantId,
    agent: &mut dyn Agent<S, A>,
    relay: &ObservationRelay<S>,
    mailbox: &ActionMailbox<A>,
    fault: &FaultSlot,
) {
    let mut decisions: u64 = 0;
    loop {
        let state = match relay.recv() {
            RelayMessage::State(state) => state,
            RelayMessage::Poison => break,
        };
        match agent.decide(&state) {
            Ok(action) => {
                mailbox.enqueue(id, action);
                decisions += 1;
            }
            Err(error) => {
                tracing::warn!(participant = %id, %error, "policy failed, worker exiting");
                let mut slot = lock_fault(fault);
                if slot.is_none() {
                    *slot = Some(WorkerFault {
                        participant: id.clone(),
                        error,
                    });
                }
                break;
            }
        }
    }
    tracing::debug!(participant = %id, decisions, "agent worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::SeatIndex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Echo {
        resets: Arc<AtomicUsize>,
    }

    impl Agent<u32, u32> for Echo {
        fn decide(&mut self, state: &u32) -> Result<u32, PolicyError> {
            Ok(*state + 1)
        }

        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Broken;

    impl Agent<u32, u32> for Broken {
        fn decide(&mut self, _: &u32) -> Result<u32, PolicyError> {
            Err(PolicyError::InferenceFailed {
                reason: "broken".into(),
            })
        }

        fn reset(&mut self) {}
    }

    fn mailbox_for(id: &str) -> Arc<ActionMailbox<u32>> {
        let mb = Arc::new(ActionMailbox::new(4));
        mb.open(SeatIndex(0), ParticipantId::from(id));
        mb.set_active(true);
        mb
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn worker_acts_on_initial_state_and_returns_agent() {
        let resets = Arc::new(AtomicUsize::new(0));
        let mut pool: AgentPool<u32, u32> = AgentPool::new();
        pool.insert(
            ParticipantId::from("bot"),
            Box::new(Echo {
                resets: Arc::clone(&resets),
            }),
        );
        let mb = mailbox_for("bot");
        pool.start_all(&mb, &Arc::new(41)).unwrap();
        assert_eq!(pool.running(), 1);
        assert!(wait_for(|| mb.pending(SeatIndex(0)) == 1));
        assert_eq!(mb.drain_one(SeatIndex(0)), Some(42));

        let report = pool.stop_all();
        assert_eq!(report.joined, 1);
        assert_eq!(report.lost, 0);
        assert_eq!(pool.running(), 0);

        // The same agent is restarted and reset again.
        pool.start_all(&mb, &Arc::new(0)).unwrap();
        pool.stop_all();
        assert_eq!(resets.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stop_without_any_state_does_not_hang() {
        let mut pool: AgentPool<u32, u32> = AgentPool::new();
        pool.insert(
            ParticipantId::from("bot"),
            Box::new(Echo {
                resets: Arc::default(),
            }),
        );
        let report = pool.stop_all();
        assert_eq!(report.joined, 0);
    }

    #[test]
    fn policy_failure_is_recorded_once() {
        let mut pool: AgentPool<u32, u32> = AgentPool::new();
        pool.insert(ParticipantId::from("bot"), Box::new(Broken));
        let mb = mailbox_for("bot");
        pool.start_all(&mb, &Arc::new(1)).unwrap();
        let fault = (0..200).find_map(|_| {
            thread::sleep(Duration::from_millis(5));
            pool.take_fault()
        });
        let fault = fault.expect("worker should report its failure");
        assert_eq!(fault.participant, ParticipantId::from("bot"));
        assert!(pool.take_fault().is_none());
        // The worker exited on its own; joining still recovers the agent.
        assert_eq!(pool.stop_all().joined, 1);
    }

    fn refuse_spawn(
        _: thread::Builder,
        _: WorkerBody<u32, u32>,
    ) -> io::Result<JoinHandle<WorkerOutput<u32, u32>>> {
        Err(io::Error::other("thread limit reached"))
    }

    #[test]
    fn failed_spawn_keeps_agent_idle() {
        let mut pool: AgentPool<u32, u32> = AgentPool::new();
        let bot = ParticipantId::from("bot");
        pool.insert(
            bot.clone(),
            Box::new(Echo {
                resets: Arc::default(),
            }),
        );
        pool.spawn = refuse_spawn;
        let mb = mailbox_for("bot");

        let err = pool.start_all(&mb, &Arc::new(1)).unwrap_err();
        assert!(matches!(err, SessionError::WorkerSpawn { ref participant, .. } if *participant == bot));
        assert!(!pool.is_lost(&bot));
        assert_eq!(pool.running(), 0);

        // Once threads are available again the same agent starts normally.
        pool.spawn = os_spawn::<u32, u32>;
        pool.start_all(&mb, &Arc::new(1)).unwrap();
        assert!(wait_for(|| mb.pending(SeatIndex(0)) == 1));
        assert_eq!(mb.drain_one(SeatIndex(0)), Some(2));
        assert_eq!(pool.stop_all().joined, 1);
    }

    #[test]
    fn remove_running_agent_joins_worker() {
        let mut pool: AgentPool<u32, u32> = AgentPool::new();
        pool.insert(
            ParticipantId::from("bot"),
            Box::new(Echo {
                resets: Arc::default(),
            }),
        );
        let mb = mailbox_for("bot");
        pool.start_all(&mb, &Arc::new(1)).unwrap();
        assert!(pool.remove(&ParticipantId::from("bot")).is_some());
        assert!(pool.is_empty());
    }
}
