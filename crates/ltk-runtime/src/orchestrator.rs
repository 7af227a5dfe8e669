//! Reconciliation Cycle Orchestrator.
//!
//! # Run lifecycle
//!
//! ```text
//!   recover ──► Fetching ──► Reconciling ──► Persisting ──► Waiting ──┐
//!                  ▲                              │                    │
//!                  │                              ▼                    │
//!                  │                    session complete ─► done       │
//!                  └───────────────────────────────────────────────────┘
//! ```
//!
//! - **recover**: read session length and roster from the store, pad short
//!   entries, rebuild the Active Set.
//! - **Fetching**: exactly one snapshot per cycle, via [`fetch_with_retry`].
//! - **Reconciling**: observations are handled one at a time, in board
//!   order. Each planned update is written to the store before it is
//!   committed to the in-memory book, and before the next observation is
//!   looked at.
//! - **Persisting**: invariant check; when the session is complete the new
//!   session length is written and the run ends.
//! - **Waiting**: countdown to the next fetch.
//!
//! Shutdown is honoured between cycles and during the countdown, never in
//! the middle of an observation.

use std::time::Duration;

use ltk_config::ReconcilerConfig;
use ltk_db::ScoreStore;
use ltk_reconcile::{LaneFilter, PlanOutcome, SessionBook, SessionLength};
use ltk_source::ScoreSource;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::countdown::{countdown, CountdownEnd};
use crate::fetch::{fetch_with_retry, FetchPolicy};
use crate::RunError;

// ---------------------------------------------------------------------------
// Options and reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub lanes: LaneFilter,
    pub fetch: FetchPolicy,
    pub cycle_delay: Duration,
    pub countdown_log_every: Duration,
    /// Replaces the stored session length before recovery.
    pub session_length_override: Option<SessionLength>,
    /// Stop after this many cycles even if the session is not complete.
    pub max_cycles: Option<u32>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&ReconcilerConfig::default())
    }
}

impl RunOptions {
    pub fn from_config(cfg: &ReconcilerConfig) -> Self {
        Self {
            lanes: cfg.lane_filter(),
            fetch: FetchPolicy::new(cfg.max_fetch_attempts, cfg.fetch_timeout),
            cycle_delay: cfg.cycle_delay,
            countdown_log_every: cfg.countdown_log_every,
            session_length_override: cfg.session_length,
            max_cycles: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Fetching,
    Reconciling,
    Persisting,
    Waiting,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Fetching => "FETCHING",
            CyclePhase::Reconciling => "RECONCILING",
            CyclePhase::Persisting => "PERSISTING",
            CyclePhase::Waiting => "WAITING",
        }
    }
}

/// Tally of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u32,
    pub observations: usize,
    pub slot_writes: usize,
    pub entries_written: usize,
    pub filtered: usize,
    pub unresolved: usize,
    pub no_scores: usize,
    pub already_recorded: usize,
    pub active_after: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    SessionComplete {
        finished: SessionLength,
        next: SessionLength,
    },
    ShutdownRequested,
    CycleLimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub session_length: SessionLength,
    pub cycles: u32,
    pub slot_writes: usize,
    pub unresolved: usize,
    pub filtered: usize,
    pub already_recorded: usize,
    pub outcome: RunOutcome,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<S, P> {
    source: S,
    store: P,
    opts: RunOptions,
    run_id: Uuid,
}

impl<S, P> Reconciler<S, P>
where
    S: ScoreSource,
    P: ScoreStore,
{
    pub fn new(source: S, store: P, opts: RunOptions) -> Self {
        Self {
            source,
            store,
            opts,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn options(&self) -> &RunOptions {
        &self.opts
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// Build the session book from the store.
    ///
    /// The store is re-read here, never trusted from a previous process.
    /// A session length override is persisted only once the roster has been
    /// checked against it, so a rejected override leaves the store as it
    /// was. Entries padded to the session length are written back before
    /// the first cycle.
    pub async fn recover(&self) -> Result<SessionBook, RunError> {
        let stored = self
            .store
            .get_session_length()
            .await
            .map_err(|e| RunError::persistence("get_session_length", e))?;
        let session = self.opts.session_length_override.unwrap_or(stored);

        let roster = self
            .store
            .get_roster()
            .await
            .map_err(|e| RunError::persistence("get_roster", e))?;

        let recovery = SessionBook::recover(roster, session)?;

        if session != stored {
            warn!(stored = %stored, override_len = %session, "overriding stored session length");
            self.store
                .set_session_length(session)
                .await
                .map_err(|e| RunError::persistence("set_session_length", e))?;
        }

        self.write_padded(&recovery.book, &recovery.padded).await?;
        recovery.book.check_invariants()?;

        info!(
            session_length = %session,
            roster = recovery.book.roster().len(),
            padded = recovery.padded.len(),
            active = recovery.book.active_set().len(),
            processed = recovery.book.has_processed(),
            "session recovered"
        );
        Ok(recovery.book)
    }

    async fn write_padded(&self, book: &SessionBook, ids: &[String]) -> Result<(), RunError> {
        for id in ids {
            if let Some(e) = book.entry(id) {
                self.store
                    .write_scores(&e.id, &e.scores, e.average)
                    .await
                    .map_err(|err| RunError::persistence(format!("pad scores of {id}"), err))?;
            }
        }
        Ok(())
    }

    /// Fetch once and reconcile every observation of that snapshot.
    pub async fn run_cycle(
        &self,
        book: &mut SessionBook,
        cycle: u32,
    ) -> Result<CycleReport, RunError> {
        debug!(phase = CyclePhase::Fetching.as_str(), "cycle phase");
        let snapshot = fetch_with_retry(&self.source, &self.opts.fetch).await?;

        debug!(phase = CyclePhase::Reconciling.as_str(), rows = snapshot.len(), "cycle phase");
        let mut report = CycleReport {
            cycle,
            observations: snapshot.len(),
            ..CycleReport::default()
        };

        for obs in &snapshot {
            match book.plan(obs, &self.opts.lanes) {
                PlanOutcome::FilteredOut { team_label } => {
                    debug!(name = %obs.reported_name, team = %team_label, "outside lane range");
                    report.filtered += 1;
                }
                PlanOutcome::Unresolved { reported_name } => {
                    info!(name = %reported_name, "no roster entry for reported name; skipped");
                    report.unresolved += 1;
                }
                PlanOutcome::NoScores { entry_id } => {
                    debug!(entry = %entry_id, "no finished game reported yet");
                    report.no_scores += 1;
                }
                PlanOutcome::AlreadyRecorded { entry_id, state } => {
                    debug!(entry = %entry_id, state = %state, "slots already recorded; no-op");
                    report.already_recorded += 1;
                }
                PlanOutcome::Update(update) => {
                    self.store
                        .write_scores(&update.entry_id, &update.scores, update.average)
                        .await
                        .map_err(|e| {
                            RunError::persistence(format!("write_scores {}", update.entry_id), e)
                        })?;

                    for w in &update.writes {
                        info!(
                            entry = %update.entry_id,
                            name = %update.entry_name,
                            slot = ?w.slot,
                            index = w.index,
                            score = w.score,
                            average = update.average,
                            "score recorded"
                        );
                    }
                    report.slot_writes += update.writes.len();
                    report.entries_written += 1;

                    let (from, to) = (update.from, update.to);
                    let name = update.entry_name.clone();
                    let state = book.commit(update)?;
                    debug_assert_eq!(state, to);
                    if from != to {
                        info!(name = %name, from = %from, to = %to, "participant transition");
                    }
                }
            }
        }

        debug!(phase = CyclePhase::Persisting.as_str(), "cycle phase");
        book.check_invariants()?;
        report.active_after = book.active_set().len();

        info!(
            cycle,
            rows = report.observations,
            writes = report.slot_writes,
            unresolved = report.unresolved,
            filtered = report.filtered,
            active = report.active_after,
            "cycle reconciled"
        );
        Ok(report)
    }

    /// Drive cycles until the session completes, shutdown is requested, or
    /// `max_cycles` is reached.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<RunReport, RunError> {
        let span = info_span!("run", run_id = %self.run_id, source = self.source.name());
        self.run_inner(&mut shutdown).instrument(span).await
    }

    async fn run_inner(&self, shutdown: &mut watch::Receiver<bool>) -> Result<RunReport, RunError> {
        let mut book = self.recover().await?;
        let mut report = RunReport {
            run_id: self.run_id,
            session_length: book.session_length(),
            cycles: 0,
            slot_writes: 0,
            unresolved: 0,
            filtered: 0,
            already_recorded: 0,
            outcome: RunOutcome::ShutdownRequested,
        };

        loop {
            if *shutdown.borrow() {
                info!(cycles = report.cycles, "shutdown requested; stopping between cycles");
                report.outcome = RunOutcome::ShutdownRequested;
                return Ok(report);
            }

            report.cycles += 1;
            let cycle = self.run_cycle(&mut book, report.cycles).await?;
            report.slot_writes += cycle.slot_writes;
            report.unresolved += cycle.unresolved;
            report.filtered += cycle.filtered;
            report.already_recorded += cycle.already_recorded;

            if book.is_session_complete() {
                let finished = book.session_length();
                let next = finished.next()?;
                self.store
                    .set_session_length(next)
                    .await
                    .map_err(|e| RunError::persistence("set_session_length", e))?;
                let advance = book.advance_session()?;
                self.write_padded(&book, &advance.padded).await?;
                book.check_invariants()?;
                info!(
                    finished = %finished,
                    next = %next,
                    padded = advance.padded.len(),
                    "session complete; session length advanced"
                );
                report.outcome = RunOutcome::SessionComplete { finished, next };
                return Ok(report);
            }

            if self.opts.max_cycles.is_some_and(|max| report.cycles >= max) {
                info!(cycles = report.cycles, "cycle limit reached");
                report.outcome = RunOutcome::CycleLimitReached;
                return Ok(report);
            }

            debug!(phase = CyclePhase::Waiting.as_str(), "cycle phase");
            let end = countdown(
                self.opts.cycle_delay,
                self.opts.countdown_log_every,
                shutdown,
            )
            .await;
            if end == CountdownEnd::Shutdown {
                info!(cycles = report.cycles, "shutdown requested during countdown");
                report.outcome = RunOutcome::ShutdownRequested;
                return Ok(report);
            }
        }
    }
}
