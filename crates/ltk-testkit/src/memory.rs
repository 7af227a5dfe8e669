use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use ltk_db::ScoreStore;
use ltk_reconcile::{RosterEntry, SessionLength};

#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub roster: Vec<RosterEntry>,
    pub session_length: SessionLength,
    pub score_writes: usize,
    pub session_writes: usize,
}

struct Inner {
    roster: Vec<RosterEntry>,
    session_length: SessionLength,
    score_writes: usize,
    session_writes: usize,
}

/// Roster and session length held in memory.
///
/// Clones share the same state, so a test can hand one clone to a
/// reconciler and inspect (or restart against) another.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new(roster: Vec<RosterEntry>, session_length: SessionLength) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                roster,
                session_length,
                score_writes: 0,
                session_writes: 0,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory store mutex poisoned"))
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        StoreSnapshot {
            roster: g.roster.clone(),
            session_length: g.session_length,
            score_writes: g.score_writes,
            session_writes: g.session_writes,
        }
    }

    pub fn entry(&self, id: &str) -> Option<RosterEntry> {
        self.snapshot().roster.into_iter().find(|e| e.id == id)
    }
}

#[async_trait::async_trait]
impl ScoreStore for MemoryStore {
    async fn get_roster(&self) -> Result<Vec<RosterEntry>> {
        Ok(self.lock()?.roster.clone())
    }

    async fn write_scores(&self, id: &str, scores: &[Option<u32>], average: f64) -> Result<()> {
        let mut g = self.lock()?;
        let Some(e) = g.roster.iter_mut().find(|e| e.id == id) else {
            bail!("write_scores: bowler {id} not found");
        };
        e.scores = scores.to_vec();
        e.average = average;
        g.score_writes += 1;
        Ok(())
    }

    async fn get_session_length(&self) -> Result<SessionLength> {
        Ok(self.lock()?.session_length)
    }

    async fn set_session_length(&self, len: SessionLength) -> Result<()> {
        let mut g = self.lock()?;
        g.session_length = len;
        g.session_writes += 1;
        Ok(())
    }
}

/// Store wrapper that fails selected calls and forwards the rest.
pub struct FailingStore<P> {
    inner: P,
    fail_writes_for: BTreeSet<String>,
    fail_session_writes: bool,
}

impl<P: ScoreStore> FailingStore<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            fail_writes_for: BTreeSet::new(),
            fail_session_writes: false,
        }
    }

    /// `write_scores` for `id` fails without touching the inner store.
    pub fn fail_writes_for(mut self, id: impl Into<String>) -> Self {
        self.fail_writes_for.insert(id.into());
        self
    }

    pub fn fail_session_writes(mut self) -> Self {
        self.fail_session_writes = true;
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<P: ScoreStore> ScoreStore for FailingStore<P> {
    async fn get_roster(&self) -> Result<Vec<RosterEntry>> {
        self.inner.get_roster().await
    }

    async fn write_scores(&self, id: &str, scores: &[Option<u32>], average: f64) -> Result<()> {
        if self.fail_writes_for.contains(id) {
            bail!("injected write failure for {id}");
        }
        self.inner.write_scores(id, scores, average).await
    }

    async fn get_session_length(&self) -> Result<SessionLength> {
        self.inner.get_session_length().await
    }

    async fn set_session_length(&self, len: SessionLength) -> Result<()> {
        if self.fail_session_writes {
            bail!("injected session length write failure");
        }
        self.inner.set_session_length(len).await
    }
}
