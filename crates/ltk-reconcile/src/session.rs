//! Session State Machine.
//!
//! # Design
//!
//! [`SessionBook`] holds the in-memory roster for the session in progress and
//! the derived Active Set. Every observation goes through two steps:
//!
//! 1. [`SessionBook::plan`] decides, without mutating anything, which of
//!    today's two slots the observation fills. The result is an
//!    [`EntryUpdate`] carrying the full new score sequence and average.
//! 2. The caller persists that update, and only then calls
//!    [`SessionBook::commit`]. A failed write therefore never leaks into the
//!    Active Set or the completion decision.
//!
//! # Per-participant states
//!
//! ```text
//!            first score seen            second score seen
//!   Idle  ─────────────────────► AwaitingSecond ─────────────────────► Complete
//!    │                                                                    ▲
//!    └──────────── two scores seen in one observation ────────────────────┘
//! ```
//!
//! A slot that already holds a score is never overwritten within a session.
//!
//! # Invariants
//!
//! - every entry carries exactly `session_length` slots;
//! - an id is in the Active Set iff its first-game slot is present and its
//!   second-game slot is absent.
//!
//! The Active Set is never stored; [`SessionBook::recover`] rebuilds it from
//! the persisted slots.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::{
    compute_average, names, LaneFilter, Observation, ParticipantState, RosterEntry, SessionLength,
    SessionLengthError,
};

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GameSlot {
    First,
    Second,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotWrite {
    pub slot: GameSlot,
    /// Absolute position in the entry's score sequence.
    pub index: usize,
    pub score: u32,
}

/// A planned, not yet applied, change to one roster entry.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryUpdate {
    pub entry_id: String,
    pub entry_name: String,
    /// Full score sequence after the writes.
    pub scores: Vec<Option<u32>>,
    /// Average recomputed from `scores`.
    pub average: f64,
    pub writes: Vec<SlotWrite>,
    pub from: ParticipantState,
    pub to: ParticipantState,
}

/// What a single observation means for the book.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanOutcome {
    /// Team label outside the configured lanes.
    FilteredOut { team_label: String },
    /// Reported name matches no roster entry (ResolutionMiss).
    Unresolved { reported_name: String },
    /// Matched, but no finished game was reported yet.
    NoScores { entry_id: String },
    /// Every slot this observation could fill is already recorded
    /// (DuplicateWriteAttempt, handled as a no-op).
    AlreadyRecorded {
        entry_id: String,
        state: ParticipantState,
    },
    Update(EntryUpdate),
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Roster data that cannot be reconciled without losing information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RosterError {
    /// More score slots than the session length allows. Never truncated.
    Overlong {
        id: String,
        name: String,
        slots: usize,
        session_length: SessionLength,
    },
    DuplicateId(String),
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterError::Overlong {
                id,
                name,
                slots,
                session_length,
            } => write!(
                f,
                "roster entry {name} (id={id}) has {slots} score slots but session length is \
                 {session_length}; refusing to truncate recorded games"
            ),
            RosterError::DuplicateId(id) => write!(f, "roster contains duplicate id {id}"),
        }
    }
}

impl std::error::Error for RosterError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    LengthMismatch {
        id: String,
        slots: usize,
        expected: usize,
    },
    ActiveSetDrift {
        id: String,
        in_active_set: bool,
        state: ParticipantState,
    },
    UnknownEntry {
        id: String,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::LengthMismatch { id, slots, expected } => write!(
                f,
                "entry {id} carries {slots} score slots, expected {expected}"
            ),
            InvariantViolation::ActiveSetDrift {
                id,
                in_active_set,
                state,
            } => write!(
                f,
                "entry {id} is in state {state} but active_set_member={in_active_set}"
            ),
            InvariantViolation::UnknownEntry { id } => {
                write!(f, "entry {id} is not part of the roster")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

// ---------------------------------------------------------------------------
// SessionBook
// ---------------------------------------------------------------------------

/// Result of rebuilding a book from persisted state.
#[derive(Clone, Debug)]
pub struct Recovery {
    pub book: SessionBook,
    /// Ids of entries that were shorter than the session length and got
    /// padded with absent slots. Callers must persist these.
    pub padded: Vec<String>,
}

/// Result of [`SessionBook::advance_session`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Advance {
    pub next: SessionLength,
    /// Ids whose score sequence grew; callers must persist these.
    pub padded: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SessionBook {
    session: SessionLength,
    roster: Vec<RosterEntry>,
    active: BTreeSet<String>,
    processed: bool,
}

impl SessionBook {
    /// Rebuild the book from the store's roster.
    ///
    /// Short score sequences are padded with absent slots. The Active Set and
    /// the "someone has played today" flag are derived from the slots, so a
    /// restart in the middle of a session resumes where it stopped.
    pub fn recover(
        mut roster: Vec<RosterEntry>,
        session: SessionLength,
    ) -> Result<Recovery, RosterError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for e in &roster {
            if !seen.insert(e.id.as_str()) {
                return Err(RosterError::DuplicateId(e.id.clone()));
            }
        }

        let slots = session.slots();
        let mut padded = Vec::new();
        for e in roster.iter_mut() {
            if e.scores.len() > slots {
                return Err(RosterError::Overlong {
                    id: e.id.clone(),
                    name: e.name.clone(),
                    slots: e.scores.len(),
                    session_length: session,
                });
            }
            if e.scores.len() < slots {
                e.scores.resize(slots, None);
                e.average = compute_average(&e.scores);
                padded.push(e.id.clone());
            }
        }

        let active = roster
            .iter()
            .filter(|e| e.state_in(session) == ParticipantState::AwaitingSecond)
            .map(|e| e.id.clone())
            .collect();
        let processed = roster
            .iter()
            .any(|e| e.state_in(session) != ParticipantState::Idle);

        Ok(Recovery {
            book: Self {
                session,
                roster,
                active,
                processed,
            },
            padded,
        })
    }

    pub fn session_length(&self) -> SessionLength {
        self.session
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn entry(&self, id: &str) -> Option<&RosterEntry> {
        self.roster.iter().find(|e| e.id == id)
    }

    pub fn active_set(&self) -> &BTreeSet<String> {
        &self.active
    }

    /// `true` once any participant has recorded a first game this session.
    pub fn has_processed(&self) -> bool {
        self.processed
    }

    pub fn state_of(&self, id: &str) -> Option<ParticipantState> {
        self.entry(id).map(|e| e.state_in(self.session))
    }

    /// The session is over when somebody played and nobody is mid-session.
    ///
    /// An empty scoreboard at the start of the night must not end the
    /// session, hence the `processed` requirement.
    pub fn is_session_complete(&self) -> bool {
        self.processed && self.active.is_empty()
    }

    /// Move the book to the next session once the store has recorded the
    /// new length. Every entry gains two absent slots; the returned
    /// [`Advance::padded`] ids must be written back.
    pub fn advance_session(&mut self) -> Result<Advance, SessionLengthError> {
        let next = self.session.next()?;
        self.session = next;
        let mut padded = Vec::new();
        for e in self.roster.iter_mut() {
            if e.scores.len() < next.slots() {
                e.scores.resize(next.slots(), None);
                padded.push(e.id.clone());
            }
        }
        self.active.clear();
        self.processed = false;
        Ok(Advance { next, padded })
    }

    /// Decide what `obs` changes, without changing it.
    pub fn plan(&self, obs: &Observation, lanes: &LaneFilter) -> PlanOutcome {
        if !lanes.admits(&obs.reported_team_label) {
            return PlanOutcome::FilteredOut {
                team_label: obs.reported_team_label.clone(),
            };
        }

        let Some(entry) = names::resolve(&self.roster, &obs.reported_name) else {
            return PlanOutcome::Unresolved {
                reported_name: obs.reported_name.clone(),
            };
        };

        let reported = obs.usable_scores();
        if reported.is_empty() {
            return PlanOutcome::NoScores {
                entry_id: entry.id.clone(),
            };
        }

        let first_i = self.session.first_game_index();
        let second_i = self.session.second_game_index();

        let mut scores = entry.scores.clone();
        if scores.len() < self.session.slots() {
            scores.resize(self.session.slots(), None);
        }

        let mut writes = Vec::new();

        if let (None, Some(&score)) = (scores[first_i], reported.first()) {
            scores[first_i] = Some(score);
            writes.push(SlotWrite {
                slot: GameSlot::First,
                index: first_i,
                score,
            });
        }

        if let (Some(_), None, Some(&score)) = (scores[first_i], scores[second_i], reported.get(1))
        {
            scores[second_i] = Some(score);
            writes.push(SlotWrite {
                slot: GameSlot::Second,
                index: second_i,
                score,
            });
        }

        let from = entry.state_in(self.session);
        if writes.is_empty() {
            return PlanOutcome::AlreadyRecorded {
                entry_id: entry.id.clone(),
                state: from,
            };
        }

        let average = compute_average(&scores);
        let mut after = entry.clone();
        after.scores = scores;

        PlanOutcome::Update(EntryUpdate {
            entry_id: entry.id.clone(),
            entry_name: entry.name.clone(),
            to: after.state_in(self.session),
            scores: after.scores,
            average,
            writes,
            from,
        })
    }

    /// Apply an update that has been persisted.
    pub fn commit(&mut self, update: EntryUpdate) -> Result<ParticipantState, InvariantViolation> {
        let session = self.session;
        let Some(entry) = self.roster.iter_mut().find(|e| e.id == update.entry_id) else {
            return Err(InvariantViolation::UnknownEntry {
                id: update.entry_id,
            });
        };

        entry.scores = update.scores;
        entry.average = update.average;
        let state = entry.state_in(session);

        if update.writes.iter().any(|w| w.slot == GameSlot::First) {
            self.processed = true;
        }
        if state == ParticipantState::AwaitingSecond {
            self.active.insert(update.entry_id);
        } else {
            self.active.remove(&update.entry_id);
        }
        Ok(state)
    }

    /// Verify the slot-length and Active Set invariants for every entry.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let expected = self.session.slots();
        for e in &self.roster {
            if e.scores.len() != expected {
                return Err(InvariantViolation::LengthMismatch {
                    id: e.id.clone(),
                    slots: e.scores.len(),
                    expected,
                });
            }
            let state = e.state_in(self.session);
            let in_active_set = self.active.contains(&e.id);
            if in_active_set != (state == ParticipantState::AwaitingSecond) {
                return Err(InvariantViolation::ActiveSetDrift {
                    id: e.id.clone(),
                    in_active_set,
                    state,
                });
            }
        }
        if let Some(stray) = self.active.iter().find(|id| self.entry(id).is_none()) {
            return Err(InvariantViolation::UnknownEntry { id: stray.clone() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn len(n: u32) -> SessionLength {
        SessionLength::new(n).unwrap()
    }

    fn obs(name: &str, scores: &[&str]) -> Observation {
        Observation::new(name, "Lane 4", scores.iter().copied(), Utc::now())
    }

    fn book(roster: Vec<RosterEntry>, n: u32) -> SessionBook {
        SessionBook::recover(roster, len(n)).unwrap().book
    }

    fn apply(book: &mut SessionBook, o: &Observation) -> PlanOutcome {
        let outcome = book.plan(o, &LaneFilter::any());
        if let PlanOutcome::Update(u) = &outcome {
            book.commit(u.clone()).unwrap();
        }
        outcome
    }

    #[test]
    fn recover_pads_short_entries() {
        let r = SessionBook::recover(
            vec![
                RosterEntry::new("a", "Chris"),
                RosterEntry::new("b", "Kiki").with_scores(vec![Some(200), Some(190)]),
            ],
            len(2),
        )
        .unwrap();
        assert_eq!(r.padded, vec!["a".to_string()]);
        assert_eq!(r.book.entry("a").unwrap().scores, vec![None, None]);
        r.book.check_invariants().unwrap();
    }

    #[test]
    fn recover_refuses_overlong_entries() {
        let err = SessionBook::recover(
            vec![RosterEntry::new("a", "Chris").with_scores(vec![Some(1); 4])],
            len(2),
        )
        .unwrap_err();
        assert!(matches!(err, RosterError::Overlong { slots: 4, .. }));
    }

    #[test]
    fn recover_rejects_duplicate_ids() {
        let err = SessionBook::recover(
            vec![RosterEntry::new("a", "Chris"), RosterEntry::new("a", "Kiki")],
            len(2),
        )
        .unwrap_err();
        assert_eq!(err, RosterError::DuplicateId("a".into()));
    }

    #[test]
    fn recover_rebuilds_active_set() {
        let b = book(
            vec![
                RosterEntry::new("a", "Chris").with_scores(vec![Some(100), Some(110), Some(120), None]),
                RosterEntry::new("b", "Kiki").with_scores(vec![Some(100), Some(110), None, None]),
            ],
            4,
        );
        assert_eq!(b.active_set().iter().collect::<Vec<_>>(), vec!["a"]);
        assert!(b.has_processed());
        assert!(!b.is_session_complete());
    }

    #[test]
    fn first_then_second_game() {
        let mut b = book(vec![RosterEntry::new("c", "Chris")], 2);

        let PlanOutcome::Update(u) = apply(&mut b, &obs("chris", &["210"])) else {
            panic!("expected update");
        };
        assert_eq!(u.from, ParticipantState::Idle);
        assert_eq!(u.to, ParticipantState::AwaitingSecond);
        assert_eq!(b.entry("c").unwrap().scores, vec![Some(210), None]);
        assert!(b.active_set().contains("c"));
        assert!(!b.is_session_complete());

        let PlanOutcome::Update(u) = apply(&mut b, &obs("Chris", &["210", "195"])) else {
            panic!("expected update");
        };
        assert_eq!(u.writes.len(), 1);
        assert_eq!(u.writes[0].slot, GameSlot::Second);
        assert_eq!(b.entry("c").unwrap().scores, vec![Some(210), Some(195)]);
        assert_eq!(b.entry("c").unwrap().average, 202.5);
        assert!(b.active_set().is_empty());
        assert!(b.is_session_complete());
        b.check_invariants().unwrap();
    }

    #[test]
    fn both_games_in_one_observation() {
        let mut b = book(vec![RosterEntry::new("c", "Chris")], 2);
        let PlanOutcome::Update(u) = apply(&mut b, &obs("Chris", &["180", "220"])) else {
            panic!("expected update");
        };
        assert_eq!(u.writes.len(), 2);
        assert_eq!(u.to, ParticipantState::Complete);
        assert!(b.active_set().is_empty());
        assert!(b.is_session_complete());
    }

    #[test]
    fn repeated_observation_never_rewrites_a_slot() {
        let mut b = book(vec![RosterEntry::new("c", "Chris")], 2);
        apply(&mut b, &obs("Chris", &["210"]));

        let again = apply(&mut b, &obs("Chris", &["250"]));
        assert_eq!(
            again,
            PlanOutcome::AlreadyRecorded {
                entry_id: "c".into(),
                state: ParticipantState::AwaitingSecond
            }
        );
        assert_eq!(b.entry("c").unwrap().scores, vec![Some(210), None]);
    }

    #[test]
    fn zero_scores_and_misses_do_nothing() {
        let b = book(vec![RosterEntry::new("c", "Chris")], 2);
        assert_eq!(
            b.plan(&obs("Chris", &[]), &LaneFilter::any()),
            PlanOutcome::NoScores {
                entry_id: "c".into()
            }
        );
        assert_eq!(
            b.plan(&obs("Nobody", &["200"]), &LaneFilter::any()),
            PlanOutcome::Unresolved {
                reported_name: "Nobody".into()
            }
        );
    }

    #[test]
    fn lane_filter_applies_before_resolution() {
        let b = book(vec![RosterEntry::new("c", "Chris")], 2);
        let mut o = obs("Chris", &["200"]);
        o.reported_team_label = "Lane 25".into();
        assert!(matches!(
            b.plan(&o, &LaneFilter::between(1, 20)),
            PlanOutcome::FilteredOut { .. }
        ));
    }

    #[test]
    fn plan_does_not_mutate_until_commit() {
        let b = book(vec![RosterEntry::new("c", "Chris")], 2);
        let outcome = b.plan(&obs("Chris", &["200"]), &LaneFilter::any());
        assert!(matches!(outcome, PlanOutcome::Update(_)));
        assert!(b.active_set().is_empty());
        assert!(!b.has_processed());
        assert_eq!(b.entry("c").unwrap().scores, vec![None, None]);
    }

    #[test]
    fn advance_session_opens_two_fresh_slots() {
        let mut b = book(vec![RosterEntry::new("c", "Chris")], 2);
        apply(&mut b, &obs("Chris", &["210", "195"]));
        assert!(b.is_session_complete());

        let adv = b.advance_session().unwrap();
        assert_eq!(adv.next, len(4));
        assert_eq!(adv.padded, vec!["c".to_string()]);
        assert_eq!(b.session_length(), len(4));
        assert_eq!(
            b.entry("c").unwrap().scores,
            vec![Some(210), Some(195), None, None]
        );
        assert_eq!(b.state_of("c"), Some(ParticipantState::Idle));
        assert!(!b.has_processed());
        assert!(!b.is_session_complete());
        b.check_invariants().unwrap();
    }

    #[test]
    fn invariant_check_catches_drift() {
        let mut b = book(vec![RosterEntry::new("c", "Chris")], 2);
        b.active.insert("c".into());
        assert!(matches!(
            b.check_invariants(),
            Err(InvariantViolation::ActiveSetDrift { .. })
        ));
    }
}
