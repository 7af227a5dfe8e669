//! ltk-runtime
//!
//! Drives the reconciliation loop: recover the session from the store, then
//! fetch, reconcile, persist and wait until the session completes or a
//! shutdown is requested.
//!
//! The pure decisions live in `ltk-reconcile`; this crate owns ordering,
//! retries, timeouts and the side effects around them.

mod countdown;
mod error;
mod fetch;
mod orchestrator;

pub use countdown::{countdown, CountdownEnd};
pub use error::RunError;
pub use fetch::{fetch_with_retry, FetchExhausted, FetchPolicy};
pub use orchestrator::{
    CyclePhase, CycleReport, Reconciler, RunOptions, RunOutcome, RunReport,
};
