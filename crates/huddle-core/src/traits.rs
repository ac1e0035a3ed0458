//! Collaborator traits: the world model that advances shared state and
//! the policies that drive autonomous participants.
//!
//! Both are opaque to the engine. The engine only relies on the
//! contracts documented here.

use std::marker::PhantomData;
use std::path::Path;

use crate::error::{PolicyError, WorldError};
use crate::id::SeatIndex;
use crate::status::Outcome;

/// Result of one world-model transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<S> {
    /// State after applying the joint action.
    pub next: S,
    /// Reward signal for this transition.
    pub outcome: Outcome,
}

/// The simulation collaborator that turns a joint action into a new state.
///
/// Owned exclusively by the tick committer. Autonomous workers never see
/// the model, only frozen state snapshots.
pub trait WorldModel: Send + 'static {
    /// Shared simulation state. Snapshots are handed to workers behind an
    /// `Arc`, so the state must be shareable across threads.
    type State: Clone + Send + Sync + 'static;
    /// A single seat's action.
    type Action: Clone + Send + 'static;

    /// Start state for the given round (0-based).
    fn initial_state(&self, round: u32) -> Self::State;

    /// Action substituted for a seat whose mailbox was empty at drain time.
    fn noop_action(&self) -> Self::Action;

    /// Apply a joint action (one entry per seat, seat-ordered).
    ///
    /// Must be a pure function of its inputs.
    fn transition(
        &self,
        state: &Self::State,
        joint_action: &[Self::Action],
    ) -> Result<Transition<Self::State>, WorldError>;
}

/// Decision-making collaborator for an autonomous participant.
///
/// Inference is split in two steps: [`observe`](Policy::observe) turns a
/// state snapshot into the policy's input representation, and
/// [`act`](Policy::act) maps that observation plus the recurrent memory
/// from the previous call to an action and the next memory.
///
/// `act` may block for a long time. It is always called on the
/// participant's own worker thread, never under a session lock.
pub trait Policy<S, A>: Send + 'static {
    /// Input representation fed to [`act`](Policy::act).
    type Observation;
    /// Recurrent state carried between calls. Reset to `Default` at the
    /// start of every round.
    type Memory: Default + Send;

    /// Featurize a state snapshot.
    fn observe(&self, state: &S) -> Self::Observation;

    /// Produce an action and the updated memory.
    fn act(
        &mut self,
        observation: Self::Observation,
        memory: &Self::Memory,
    ) -> Result<(A, Self::Memory), PolicyError>;

    /// Called at the start of a fresh round. Stateful policies override this.
    fn reset(&mut self) {}
}

/// Type-erased autonomous participant as seen by the worker protocol.
///
/// Every [`Policy`] becomes an `Agent` through [`PolicyAgent`]; tests and
/// scripted partners may implement `Agent` directly.
pub trait Agent<S, A>: Send {
    /// Observe `state`, run inference, and return the chosen action.
    fn decide(&mut self, state: &S) -> Result<A, PolicyError>;

    /// Start a fresh round.
    fn reset(&mut self);
}

/// Adapter owning a [`Policy`] and its recurrent memory.
pub struct PolicyAgent<P, S, A>
where
    P: Policy<S, A>,
{
    policy: P,
    memory: P::Memory,
    _marker: PhantomData<fn(&S) -> A>,
}

impl<P, S, A> PolicyAgent<P, S, A>
where
    P: Policy<S, A>,
{
    /// Wrap a policy with fresh memory.
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            memory: P::Memory::default(),
            _marker: PhantomData,
        }
    }

    /// The wrapped policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }
}

impl<P, S, A> Agent<S, A> for PolicyAgent<P, S, A>
where
    P: Policy<S, A>,
{
    fn decide(&mut self, state: &S) -> Result<A, PolicyError> {
        let observation = self.policy.observe(state);
        let (action, memory) = self.policy.act(observation, &self.memory)?;
        self.memory = memory;
        Ok(action)
    }

    fn reset(&mut self) {
        self.memory = P::Memory::default();
        self.policy.reset();
    }
}

/// Box a policy as an [`Agent`] trait object.
pub fn into_agent<P, S, A>(policy: P) -> Box<dyn Agent<S, A>>
where
    P: Policy<S, A>,
    S: 'static,
    A: 'static,
{
    Box::new(PolicyAgent::new(policy))
}

/// Resolves policy names (e.g. `"ppo"`) to ready-to-run agents.
///
/// `agent_dir` is the session's configured asset directory, if any.
/// Loading may touch the filesystem and can fail; failures are reported
/// to the caller of the session operation that requested the load.
pub trait PolicyLoader<S, A> {
    /// Load the named policy for the given seat.
    fn load(
        &self,
        name: &str,
        seat: SeatIndex,
        agent_dir: Option<&Path>,
    ) -> Result<Box<dyn Agent<S, A>>, PolicyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts calls in its memory to check that memory threads through.
    struct Recurrent;

    impl Policy<u32, u32> for Recurrent {
        type Observation = u32;
        type Memory = u32;

        fn observe(&self, state: &u32) -> u32 {
            *state * 10
        }

        fn act(&mut self, observation: u32, memory: &u32) -> Result<(u32, u32), PolicyError> {
            Ok((observation + memory, memory + 1))
        }
    }

    #[test]
    fn memory_threads_through_calls_and_resets() {
        let mut agent = PolicyAgent::new(Recurrent);
        assert_eq!(agent.decide(&1).unwrap(), 10);
        assert_eq!(agent.decide(&1).unwrap(), 11);
        assert_eq!(agent.decide(&2).unwrap(), 22);
        agent.reset();
        assert_eq!(agent.decide(&1).unwrap(), 10);
    }

    #[test]
    fn boxed_agent_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let agent: Box<dyn Agent<u32, u32>> = into_agent(Recurrent);
        assert_send(&agent);
    }
}
