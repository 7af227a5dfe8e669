use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEnd {
    Elapsed,
    Shutdown,
}

/// Sleep `total` between cycles, logging the time left every `log_every`.
///
/// Returns early with [`CountdownEnd::Shutdown`] as soon as `shutdown`
/// flips to `true`. A dropped shutdown sender means no signal can arrive
/// any more; the countdown then simply runs out.
pub async fn countdown(
    total: Duration,
    log_every: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> CountdownEnd {
    let deadline = Instant::now() + total;
    let step = if log_every.is_zero() { total } else { log_every };

    loop {
        if *shutdown.borrow() {
            return CountdownEnd::Shutdown;
        }
        let now = Instant::now();
        if now >= deadline {
            return CountdownEnd::Elapsed;
        }
        let remaining = deadline - now;
        info!(remaining_secs = remaining.as_secs(), "next fetch in {}s", remaining.as_secs());

        let wake = now + step.min(remaining);
        tokio::select! {
            _ = tokio::time::sleep_until(wake) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    tokio::time::sleep_until(deadline).await;
                    return CountdownEnd::Elapsed;
                }
            }
        }
    }
}
