//! ltk-source
//!
//! Scoreboard boundary. This crate owns the data-source contract and the
//! concrete sources; it never resolves names, touches the roster, or
//! retries. Retry and timeout policy belong to the runtime, which wraps each
//! [`ScoreSource::fetch_snapshot`] call.

pub mod feed;
pub mod file;
pub mod http;

use std::fmt;
use std::time::Duration;

use ltk_reconcile::Observation;

pub use file::SnapshotFileSource;
pub use http::HttpFeedSource;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`ScoreSource`] implementation may return for one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The attempt did not finish within its time budget.
    Timeout { after: Duration },
    /// Network or file-system failure.
    Transport(String),
    /// The scoreboard answered with a non-success status.
    Api { status: u16, message: String },
    /// The payload could not be decoded into observations.
    Decode(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout { after } => {
                write!(f, "fetch timed out after {}ms", after.as_millis())
            }
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Api { status, message } => {
                write!(f, "scoreboard error status={status}: {message}")
            }
            FetchError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Live scoreboard contract.
///
/// One call returns one snapshot: every participant row currently listed, in
/// the order the scoreboard lists them. Implementations must be `Send + Sync`
/// so the runtime can hold a `Box<dyn ScoreSource>`.
#[async_trait::async_trait]
pub trait ScoreSource: Send + Sync {
    /// Short identifier for logs (e.g. `"http-feed"`).
    fn name(&self) -> &'static str;

    async fn fetch_snapshot(&self) -> Result<Vec<Observation>, FetchError>;
}

#[async_trait::async_trait]
impl<T: ScoreSource + ?Sized> ScoreSource for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn fetch_snapshot(&self) -> Result<Vec<Observation>, FetchError> {
        (**self).fetch_snapshot().await
    }
}
