//! Bounded-retry wrapper around [`ScoreSource::fetch_snapshot`].
//!
//! Each attempt is capped by `timeout`. A failed attempt is logged and the
//! next one starts immediately; after `max_attempts` failures the last error
//! is surfaced and the run aborts. Skipping a cycle silently could miss the
//! narrow window in which a game is shown on the board.

use std::fmt;
use std::time::Duration;

use ltk_reconcile::Observation;
use ltk_source::{FetchError, ScoreSource};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    max_attempts: u32,
    timeout: Duration,
}

impl FetchPolicy {
    /// `max_attempts` below 1 is raised to 1.
    pub fn new(max_attempts: u32, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(30))
    }
}

/// Every attempt of one cycle failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchExhausted {
    pub attempts: u32,
    pub last: FetchError,
}

impl fmt::Display for FetchExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scoreboard fetch failed after {} attempt(s); last error: {}",
            self.attempts, self.last
        )
    }
}

impl std::error::Error for FetchExhausted {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last)
    }
}

/// Fetch one snapshot, retrying per `policy`.
pub async fn fetch_with_retry<S>(
    source: &S,
    policy: &FetchPolicy,
) -> Result<Vec<Observation>, FetchExhausted>
where
    S: ScoreSource + ?Sized,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let err = match tokio::time::timeout(policy.timeout, source.fetch_snapshot()).await {
            Ok(Ok(obs)) => {
                if attempt > 1 {
                    info!(source = source.name(), attempt, "fetch recovered");
                }
                return Ok(obs);
            }
            Ok(Err(e)) => e,
            Err(_) => FetchError::Timeout {
                after: policy.timeout,
            },
        };

        warn!(
            source = source.name(),
            attempt,
            max_attempts = policy.max_attempts,
            error = %err,
            "fetch attempt failed"
        );

        if attempt >= policy.max_attempts {
            return Err(FetchExhausted {
                attempts: attempt,
                last: err,
            });
        }
    }
}
