//! Reusable policy and loader fixtures for [`CounterWorld`](crate::CounterWorld)
//! sessions.
//!
//! - [`ConstPolicy`]: always plays the same move, counting its calls.
//! - [`ScriptedPolicy`]: loops a fixed script; the position lives in the
//!   recurrent memory, so it restarts every round.
//! - [`GatedPolicy`]: signals entry and blocks until released.
//! - [`SlowPolicy`]: sleeps before answering.
//! - [`FailingPolicy`]: fails deterministically after N calls.
//! - [`RandomPolicy`]: seeded, reproducible random moves.
//! - [`PanickingAgent`]: panics on its first decision.
//! - [`StaticLoader`]: resolves policy names from a fixed table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use huddle_core::{into_agent, Agent, Policy, PolicyError, PolicyLoader, SeatIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{CounterState, Move};

/// Boxed agent for a [`CounterWorld`](crate::CounterWorld) session.
pub type CounterAgent = Box<dyn Agent<CounterState, Move>>;

/// Always plays `action`.
pub struct ConstPolicy {
    pub action: Move,
    calls: Arc<AtomicUsize>,
}

impl ConstPolicy {
    pub fn new(action: Move) -> Self {
        Self {
            action,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of `act` calls, readable after the policy has moved
    /// onto its worker.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Policy<CounterState, Move> for ConstPolicy {
    type Observation = ();
    type Memory = ();

    fn observe(&self, _state: &CounterState) {}

    fn act(&mut self, _observation: (), _memory: &()) -> Result<(Move, ()), PolicyError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok((self.action, ()))
    }
}

/// Loops `script`. The next index is carried as recurrent memory.
pub struct ScriptedPolicy {
    pub script: Vec<Move>,
}

impl ScriptedPolicy {
    pub fn new(script: Vec<Move>) -> Self {
        Self { script }
    }
}

impl Policy<CounterState, Move> for ScriptedPolicy {
    type Observation = ();
    type Memory = usize;

    fn observe(&self, _state: &CounterState) {}

    fn act(&mut self, _observation: (), step: &usize) -> Result<(Move, usize), PolicyError> {
        let action = match self.script.len() {
            0 => Move::Stay,
            n => self.script[step % n],
        };
        Ok((action, step + 1))
    }
}

/// Test-side handle of a [`GatedPolicy`].
pub struct Gate {
    /// Receives one message each time the policy enters `act`.
    pub entered: Receiver<()>,
    /// Each message lets one blocked `act` call return. Dropping the
    /// sender releases every future call immediately.
    pub release: Sender<()>,
}

/// Blocks inside `act` until the test releases it.
pub struct GatedPolicy {
    action: Move,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl GatedPolicy {
    pub fn new(action: Move) -> (Self, Gate) {
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        (
            Self {
                action,
                entered: entered_tx,
                release: release_rx,
            },
            Gate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }
}

impl Policy<CounterState, Move> for GatedPolicy {
    type Observation = ();
    type Memory = ();

    fn observe(&self, _state: &CounterState) {}

    fn act(&mut self, _observation: (), _memory: &()) -> Result<(Move, ()), PolicyError> {
        let _ = self.entered.send(());
        // A disconnected gate counts as released.
        let _ = self.release.recv();
        Ok((self.action, ()))
    }
}

/// Sleeps for `delay` on every call, then plays `action`.
pub struct SlowPolicy {
    pub delay: Duration,
    pub action: Move,
}

impl Policy<CounterState, Move> for SlowPolicy {
    type Observation = ();
    type Memory = ();

    fn observe(&self, _state: &CounterState) {}

    fn act(&mut self, _observation: (), _memory: &()) -> Result<(Move, ()), PolicyError> {
        thread::sleep(self.delay);
        Ok((self.action, ()))
    }
}

/// Fails deterministically after a configurable number of successful calls.
pub struct FailingPolicy {
    pub succeed_count: usize,
    call_count: usize,
}

impl FailingPolicy {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            call_count: 0,
        }
    }
}

impl Policy<CounterState, Move> for FailingPolicy {
    type Observation = ();
    type Memory = ();

    fn observe(&self, _state: &CounterState) {}

    fn act(&mut self, _observation: (), _memory: &()) -> Result<(Move, ()), PolicyError> {
        let n = self.call_count;
        self.call_count += 1;
        if n >= self.succeed_count {
            return Err(PolicyError::InferenceFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        Ok((Move::Up, ()))
    }
}

/// Picks uniformly among [`Move::ALL`] from a seeded ChaCha8 stream.
///
/// The stream is reseeded on every round, so each round replays the same
/// sequence for a given seed.
pub struct RandomPolicy {
    seed: u64,
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Policy<CounterState, Move> for RandomPolicy {
    type Observation = i64;
    type Memory = ();

    fn observe(&self, state: &CounterState) -> i64 {
        state.value
    }

    fn act(&mut self, _observation: i64, _memory: &()) -> Result<(Move, ()), PolicyError> {
        let i = self.rng.gen_range(0..Move::ALL.len());
        Ok((Move::ALL[i], ()))
    }

    fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }
}

/// Panics on its first decision, taking its worker down with it.
///
/// Sends on the returned receiver just before panicking.
pub struct PanickingAgent {
    about_to_panic: Sender<()>,
}

impl PanickingAgent {
    pub fn new() -> (Self, Receiver<()>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (Self { about_to_panic: tx }, rx)
    }
}

impl Agent<CounterState, Move> for PanickingAgent {
    fn decide(&mut self, _state: &CounterState) -> Result<Move, PolicyError> {
        let _ = self.about_to_panic.try_send(());
        panic!("deliberate panic in agent");
    }

    fn reset(&mut self) {}
}

type Factory = Box<dyn Fn() -> CounterAgent + Send + Sync>;

/// Resolves policy names from a fixed table of factories.
///
/// Records every `(name, seat, agent_dir)` request it sees.
#[derive(Default)]
pub struct StaticLoader {
    factories: HashMap<String, Factory>,
    requests: Mutex<Vec<(String, SeatIndex, Option<PathBuf>)>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, built by `factory` on each load.
    pub fn with(
        mut self,
        name: impl Into<String>,
        factory: impl Fn() -> CounterAgent + Send + Sync + 'static,
    ) -> Self {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    /// Loader knowing `"stay"`, `"up"` and `"random"`.
    pub fn standard() -> Self {
        Self::new()
            .with("stay", || into_agent(ConstPolicy::new(Move::Stay)))
            .with("up", || into_agent(ConstPolicy::new(Move::Up)))
            .with("random", || into_agent(RandomPolicy::new(7)))
    }

    pub fn requests(&self) -> Vec<(String, SeatIndex, Option<PathBuf>)> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl PolicyLoader<CounterState, Move> for StaticLoader {
    fn load(
        &self,
        name: &str,
        seat: SeatIndex,
        agent_dir: Option<&Path>,
    ) -> Result<CounterAgent, PolicyError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((name.to_owned(), seat, agent_dir.map(Path::to_path_buf)));
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PolicyError::LoadFailed {
                name: name.to_owned(),
                reason: "no such policy".into(),
            })?;
        Ok(factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::PolicyAgent;

    #[test]
    fn scripted_memory_restarts_on_reset() {
        let mut agent = PolicyAgent::new(ScriptedPolicy::new(vec![Move::Up, Move::Down]));
        let s = CounterState::default();
        assert_eq!(agent.decide(&s).unwrap(), Move::Up);
        assert_eq!(agent.decide(&s).unwrap(), Move::Down);
        assert_eq!(agent.decide(&s).unwrap(), Move::Up);
        agent.reset();
        assert_eq!(agent.decide(&s).unwrap(), Move::Up);
    }

    #[test]
    fn random_policy_is_reproducible() {
        let s = CounterState::default();
        let mut a = PolicyAgent::new(RandomPolicy::new(3));
        let mut b = PolicyAgent::new(RandomPolicy::new(3));
        let xs: Vec<Move> = (0..16).map(|_| a.decide(&s).unwrap()).collect();
        let ys: Vec<Move> = (0..16).map(|_| b.decide(&s).unwrap()).collect();
        assert_eq!(xs, ys);
        a.reset();
        let again: Vec<Move> = (0..16).map(|_| a.decide(&s).unwrap()).collect();
        assert_eq!(xs, again);
    }

    #[test]
    fn failing_policy_fails_after_budget() {
        let mut agent = PolicyAgent::new(FailingPolicy::new(1));
        let s = CounterState::default();
        assert!(agent.decide(&s).is_ok());
        assert!(matches!(
            agent.decide(&s),
            Err(PolicyError::InferenceFailed { .. })
        ));
    }

    #[test]
    fn loader_reports_unknown_names() {
        let loader = StaticLoader::standard();
        assert!(loader.load("up", SeatIndex(1), None).is_ok());
        assert!(matches!(
            loader.load("ppo", SeatIndex(0), None),
            Err(PolicyError::LoadFailed { .. })
        ));
        assert_eq!(loader.requests().len(), 2);
    }
}
