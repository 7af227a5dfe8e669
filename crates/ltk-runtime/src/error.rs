use std::fmt;

use ltk_reconcile::{InvariantViolation, RosterError, SessionLengthError};

use crate::FetchExhausted;

/// Fatal conditions that end a run.
///
/// Everything recoverable inside a cycle (unknown names, repeated
/// observations, filtered lanes) is logged and never reaches this type.
#[derive(Debug)]
pub enum RunError {
    /// Every fetch attempt of a cycle failed.
    FetchExhausted(FetchExhausted),
    /// A store call failed. Nothing derived from the failed write was
    /// applied in memory, and the session length was not advanced.
    Persistence {
        operation: String,
        source: anyhow::Error,
    },
    /// Stored roster cannot be reconciled without losing data.
    Roster(RosterError),
    Invariant(InvariantViolation),
    SessionLength(SessionLengthError),
}

impl RunError {
    pub(crate) fn persistence(operation: impl Into<String>, source: anyhow::Error) -> Self {
        RunError::Persistence {
            operation: operation.into(),
            source,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::FetchExhausted(e) => write!(f, "{e}"),
            RunError::Persistence { operation, source } => {
                write!(f, "persistence failed during {operation}: {source:#}")
            }
            RunError::Roster(e) => write!(f, "roster rejected: {e}"),
            RunError::Invariant(e) => write!(f, "session invariant violated: {e}"),
            RunError::SessionLength(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::FetchExhausted(e) => Some(e),
            RunError::Persistence { source, .. } => Some(&**source),
            RunError::Roster(e) => Some(e),
            RunError::Invariant(e) => Some(e),
            RunError::SessionLength(e) => Some(e),
        }
    }
}

impl From<FetchExhausted> for RunError {
    fn from(e: FetchExhausted) -> Self {
        RunError::FetchExhausted(e)
    }
}

impl From<RosterError> for RunError {
    fn from(e: RosterError) -> Self {
        RunError::Roster(e)
    }
}

impl From<InvariantViolation> for RunError {
    fn from(e: InvariantViolation) -> Self {
        RunError::Invariant(e)
    }
}

impl From<SessionLengthError> for RunError {
    fn from(e: SessionLengthError) -> Self {
        RunError::SessionLength(e)
    }
}
