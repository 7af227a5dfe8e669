//! ltk-testkit
//!
//! In-memory doubles for the two runtime boundaries, used by the scenario
//! tests under `tests/`:
//! - [`MemoryStore`]: a [`ltk_db::ScoreStore`] over a shared roster.
//! - [`FailingStore`]: wraps any store and fails chosen calls.
//! - [`ScriptedSource`]: a [`ltk_source::ScoreSource`] that replays queued
//!   snapshots and counts fetches.

mod memory;
mod scripted;

pub use memory::{FailingStore, MemoryStore, StoreSnapshot};
pub use scripted::{obs, ScriptedSource};
