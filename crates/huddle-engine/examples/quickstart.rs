//! Huddle quickstart: one human and one autonomous participant playing
//! tug-of-war on a background tick thread.
//!
//! Demonstrates:
//!   1. Implementing a `WorldModel` and a `Policy`
//!   2. Seating a human and an autonomous participant
//!   3. Driving the session with `SessionDriver` at a fixed tick rate
//!   4. Feeding human input from another thread via an `ActionSender`
//!   5. Consuming driver events and collecting the trajectory
//!
//! Run with:
//!   RUST_LOG=huddle_engine=debug cargo run --example quickstart

use std::thread;
use std::time::Duration;

use huddle_core::{
    into_agent, Outcome, ParticipantId, Policy, PolicyError, Transition, WorldError, WorldModel,
};
use huddle_engine::{
    DriverConfig, DriverEvent, SessionConfig, SessionController, SessionDriver, TimedRounds,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

// ─── World: a rope pulled from both ends ────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
enum Pull {
    Rest,
    Left,
    Right,
}

#[derive(Clone, Debug, Serialize)]
struct Rope {
    /// Negative is toward seat 0, positive toward seat 1.
    knot: i32,
}

const WIN_DISTANCE: i32 = 5;

struct TugOfWar;

impl WorldModel for TugOfWar {
    type State = Rope;
    type Action = Pull;

    fn initial_state(&self, _round: u32) -> Rope {
        Rope { knot: 0 }
    }

    fn noop_action(&self) -> Pull {
        Pull::Rest
    }

    fn transition(&self, state: &Rope, joint: &[Pull]) -> Result<Transition<Rope>, WorldError> {
        let shift: i32 = joint
            .iter()
            .map(|p| match p {
                Pull::Rest => 0,
                Pull::Left => -1,
                Pull::Right => 1,
            })
            .sum();
        let knot = (state.knot + shift).clamp(-WIN_DISTANCE, WIN_DISTANCE);
        // Seat 0 scores when the knot reaches its end.
        let reward = if knot == -WIN_DISTANCE { 1.0 } else { 0.0 };
        let knot = if reward > 0.0 { 0 } else { knot };
        Ok(Transition {
            next: Rope { knot },
            outcome: Outcome::from_rewards([reward, 0.0]),
        })
    }
}

// ─── Policy: pull right whenever the knot drifts left ───────────

struct Anchor;

impl Policy<Rope, Pull> for Anchor {
    type Observation = i32;
    type Memory = ();

    fn observe(&self, state: &Rope) -> i32 {
        state.knot
    }

    fn act(&mut self, knot: i32, _memory: &()) -> Result<(Pull, ()), PolicyError> {
        let pull = if knot < 0 { Pull::Right } else { Pull::Rest };
        Ok((pull, ()))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // ─── Build the session ──────────────────────────────────────

    let config = SessionConfig {
        relay_stride: 3,
        record_trajectory: true,
        ..Default::default()
    };
    let rounds = Box::new(TimedRounds::new(2, Duration::from_secs(2)));
    let mut session = SessionController::new(TugOfWar, rounds, config)?;
    session.add_participant("alice", None)?;
    session.add_autonomous("anchor", into_agent(Anchor), None)?;
    println!("seats: {:?}", session.serialize_full_state().seats);

    // ─── Drive it at 30 Hz ──────────────────────────────────────

    let driver = SessionDriver::spawn(session, DriverConfig::default())?;

    // Alice pulls left every 10 ms; surplus input is dropped.
    let sender = driver.sender();
    let alice = thread::spawn(move || {
        let id = ParticipantId::from("alice");
        for _ in 0..400 {
            sender.enqueue(&id, Pull::Left);
            thread::sleep(Duration::from_millis(10));
        }
    });

    for event in driver.events().iter() {
        match event {
            DriverEvent::Tick(m) if m.tick.0 % 15 == 0 => {
                println!(
                    "round {} tick {:>3}  knot {:>2}  score {}",
                    m.round, m.tick.0, m.state.knot, m.score
                );
            }
            DriverEvent::Tick(_) => {}
            DriverEvent::Reset { round, pause } => {
                println!("--- round {round} starts in {pause:?} ---");
            }
            DriverEvent::Done { score } => {
                println!("done, final score {score}");
                break;
            }
            DriverEvent::Failed { error } => {
                println!("driver failed: {error}");
                break;
            }
        }
    }
    alice.join().map_err(|_| "input thread panicked")?;

    // ─── Shut down and inspect ──────────────────────────────────

    let mut session = driver.into_session().ok_or("tick thread panicked")?;
    let trajectory = session.collect_trajectory();
    println!(
        "recorded {} transitions, intake {:?}",
        trajectory.len(),
        session.intake_stats()
    );
    if let Some(last) = trajectory.last() {
        println!("last record: {}", serde_json::to_string(last)?);
    }
    Ok(())
}
