//! Huddle: a multiplayer real-time session engine for human and
//! autonomous participants.
//!
//! This is the top-level facade crate that re-exports the public API of
//! the Huddle sub-crates. For most users, adding `huddle` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use huddle::prelude::*;
//!
//! // A world whose state counts every "up" action.
//! struct Tally;
//! impl WorldModel for Tally {
//!     type State = u32;
//!     type Action = bool;
//!     fn initial_state(&self, _round: u32) -> u32 { 0 }
//!     fn noop_action(&self) -> bool { false }
//!     fn transition(&self, s: &u32, joint: &[bool]) -> Result<Transition<u32>, WorldError> {
//!         let ups = joint.iter().filter(|a| **a).count() as u32;
//!         Ok(Transition {
//!             next: s + ups,
//!             outcome: Outcome::from_rewards(joint.iter().map(|a| if *a { 1.0 } else { 0.0 })),
//!         })
//!     }
//! }
//!
//! let rounds = Box::new(TimedRounds::new(1, std::time::Duration::from_secs(60)));
//! let mut session = SessionController::new(Tally, rounds, SessionConfig::default()).unwrap();
//! session.add_participant("alice", None).unwrap();
//! session.activate().unwrap();
//!
//! session.enqueue_action(&ParticipantId::from("alice"), true);
//! assert_eq!(session.tick().unwrap(), LifecycleStatus::Active);
//! assert_eq!(**session.state(), 1);
//! assert_eq!(session.score(), 1.0);
//! session.deactivate();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `huddle-core` | IDs, status, errors, world-model and policy traits |
//! | [`engine`] | `huddle-engine` | Session controller, variants, driver, configuration |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`huddle-core`).
///
/// Contains participant and session identifiers, the lifecycle status,
/// the error hierarchy, and the [`types::WorldModel`] and
/// [`types::Policy`] collaborator traits.
pub use huddle_core as types;

/// Session engine (`huddle-engine`).
///
/// [`engine::SessionController`] for caller-driven ticking,
/// [`engine::SessionDriver`] for a background tick thread, and the
/// [`engine::Variant`] implementations shipped with the engine.
pub use huddle_engine as engine;

/// Common imports for typical Huddle usage.
///
/// ```rust
/// use huddle::prelude::*;
/// ```
///
/// This imports the collaborator traits, identifiers, the session
/// controller and driver, configuration, and the built-in variants.
pub mod prelude {
    // Core types and traits
    pub use huddle_core::{
        into_agent, Agent, LifecycleStatus, Outcome, ParticipantId, Policy, PolicyLoader, Role,
        SeatIndex, TickId, Transition, WorldModel,
    };

    // Errors
    pub use huddle_core::{PolicyError, SessionError, SlotError, WorldError};

    // Engine
    pub use huddle_engine::{
        ActionSender, ConfigError, DriverConfig, DriverEvent, SessionConfig, SessionController,
        SessionDriver, StopReport,
    };

    // Variants
    pub use huddle_engine::{Experiment, PhaseScript, TimedRounds, Tutorial, Variant};
}
