//! Core types and traits for the Huddle session engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the identifiers, lifecycle status, error types, and the collaborator
//! traits (world model and policy) that the engine is parametrized by.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod status;
pub mod traits;

pub use error::{PolicyError, SessionError, SlotError, WorldError};
pub use id::{ParticipantId, SeatIndex, SessionId, TickId};
pub use status::{LifecycleStatus, Outcome, Role};
pub use traits::{into_agent, Agent, Policy, PolicyAgent, PolicyLoader, Transition, WorldModel};
