//! Active Set invariant across a busy night.
//!
//! Validates:
//! 1) After every cycle, an id is in the Active Set iff today's first slot is
//!    present and the second is absent.
//! 2) Every entry keeps exactly `session_length` slots.
//! 3) Replaying an entire cycle changes nothing.

use chrono::Utc;
use ltk_reconcile::*;

fn cycle(book: &mut SessionBook, lanes: &LaneFilter, rows: &[(&str, &str, &[&str])]) -> usize {
    let mut writes = 0;
    for (name, lane, scores) in rows {
        let obs = Observation::new(*name, *lane, scores.iter().copied(), Utc::now());
        if let PlanOutcome::Update(u) = book.plan(&obs, lanes) {
            writes += u.writes.len();
            book.commit(u).unwrap();
        }
    }
    book.check_invariants().unwrap();
    for e in book.roster() {
        let awaiting = e.state_in(book.session_length()) == ParticipantState::AwaitingSecond;
        assert_eq!(book.active_set().contains(&e.id), awaiting, "entry {}", e.id);
    }
    writes
}

#[test]
fn invariant_holds_after_each_cycle() {
    let session = SessionLength::new(4).unwrap();
    let roster = vec![
        RosterEntry::new("1", "Christian")
            .with_nicknames(["Chris"])
            .with_scores(vec![Some(264), Some(236)]),
        RosterEntry::new("2", "Heather").with_scores(vec![None, None]),
        RosterEntry::new("3", "Chloe").with_scores(vec![Some(150), Some(170)]),
    ];
    let mut book = SessionBook::recover(roster, session).unwrap().book;
    let lanes = LaneFilter::between(1, 20);

    let c1: &[(&str, &str, &[&str])] = &[
        ("chris", "Lane 3", &["245"]),
        ("HEATHER", "Lane 4", &[]),
        ("Stranger", "Lane 5", &["300"]),
        ("Chloe", "Lane 30", &["190"]),
    ];
    assert_eq!(cycle(&mut book, &lanes, c1), 1);
    assert_eq!(book.active_set().len(), 1);

    let c2: &[(&str, &str, &[&str])] = &[
        ("chris", "Lane 3", &["245"]),
        ("Heather", "Lane 4", &["188"]),
        ("Chloe", "Lane 12", &["190", "205"]),
    ];
    assert_eq!(cycle(&mut book, &lanes, c2), 3);
    assert_eq!(book.active_set().len(), 2);
    assert_eq!(book.state_of("3"), Some(ParticipantState::Complete));

    // Replaying the same cycle is a no-op.
    assert_eq!(cycle(&mut book, &lanes, c2), 0);

    let c3: &[(&str, &str, &[&str])] = &[
        ("Chris", "Lane 3", &["245", "237"]),
        ("heather", "Lane 4", &["188", "201"]),
    ];
    assert_eq!(cycle(&mut book, &lanes, c3), 2);
    assert!(book.is_session_complete());

    let chris = book.entry("1").unwrap();
    assert_eq!(chris.scores, vec![Some(264), Some(236), Some(245), Some(237)]);
    assert_eq!(chris.average, 245.5);
}
