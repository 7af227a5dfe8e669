use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use ltk_reconcile::Observation;
use ltk_source::{FetchError, ScoreSource};

/// One scoreboard row observed now.
pub fn obs(name: &str, team_label: &str, scores: &[&str]) -> Observation {
    Observation::new(name, team_label, scores.iter().copied(), Utc::now())
}

/// Replays queued fetch results in order.
///
/// Once the queue is drained every fetch returns an empty snapshot. Clones
/// share the queue and the call counter.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    queue: Arc<Mutex<VecDeque<Result<Vec<Observation>, FetchError>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_snapshot(self, rows: Vec<Observation>) -> Self {
        self.push(Ok(rows));
        self
    }

    pub fn then_error(self, err: FetchError) -> Self {
        self.push(Err(err));
        self
    }

    pub fn push(&self, next: Result<Vec<Observation>, FetchError>) {
        self.queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(next);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ScoreSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_snapshot(&self) -> Result<Vec<Observation>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
