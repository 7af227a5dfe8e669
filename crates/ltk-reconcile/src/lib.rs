//! ltk-reconcile
//!
//! Score reconciliation core:
//! - Name Resolver (`names`)
//! - Lane Filter (`lanes`)
//! - Average Calculator (`average`)
//! - Session State Machine (`session`)
//!
//! Deterministic, pure logic. No IO. No clock. No scoreboard or store calls;
//! the runtime feeds observations in and persists the planned updates.

mod average;
mod lanes;
pub mod names;
mod session;
mod types;

pub use average::compute_average;
pub use lanes::{first_integer, LaneFilter};
pub use names::{normalize_name, resolve};
pub use session::{
    Advance, EntryUpdate, GameSlot, InvariantViolation, PlanOutcome, Recovery, RosterError,
    SessionBook, SlotWrite,
};
pub use types::*;
