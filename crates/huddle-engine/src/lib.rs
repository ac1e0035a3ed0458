//! Session engine coordinating human and autonomous participants.
//!
//! A [`SessionController`] seats participants, collects their actions
//! through lock-free bounded mailboxes, and commits one joint action per
//! tick to a [`WorldModel`](huddle_core::WorldModel). Autonomous
//! participants run their policies on background workers fed by
//! latest-wins state relays, so slow inference never stalls a tick.
//! Game-mode rules plug in as a [`Variant`].
//!
//! The controller is stepped by the caller. [`SessionDriver`] is an
//! optional fixed-rate tick thread for callers that want one.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod agent;
pub mod clock;
pub mod commit;
pub mod config;
pub mod driver;
pub mod mailbox;
pub mod metrics;
pub mod relay;
pub mod session;
pub mod slots;
pub mod trajectory;
pub mod variant;

pub use agent::{AgentPool, StopReport, WorkerFault};
pub use clock::{ManualTime, SessionClock, TimeSource, WallClock};
pub use commit::TurnCommitter;
pub use config::{ConfigError, DriverConfig, SessionConfig};
pub use driver::{DriverError, DriverEvent, DriverReport, SessionDriver};
pub use mailbox::{ActionMailbox, ActionSender};
pub use metrics::{IntakeStats, TickMetrics};
pub use relay::{ObservationRelay, RelayMessage};
pub use session::SessionController;
pub use slots::{Occupant, SlotTable};
pub use trajectory::{FullState, MinimalState, SeatRecord, TransitionRecord};
pub use variant::{
    Experiment, PhaseScript, RoundView, TimedRounds, Tutorial, Variant, TUTORIAL_PHASES,
};
