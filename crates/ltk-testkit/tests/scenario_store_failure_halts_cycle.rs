//! Store failures are fatal and leave no half-applied state.
//!
//! GREEN when:
//! - a failed score write stops the cycle: rows after it are not processed;
//! - writes before it stay persisted;
//! - the session length is not advanced;
//! - a failed session-length write leaves the scores in place, and a clean
//!   restart finishes the session;
//! - a failed pad write after the advance is fatal, and the next recovery
//!   pads what was missed.

use ltk_reconcile::{RosterEntry, SessionLength};
use ltk_runtime::{Reconciler, RunError, RunOptions, RunOutcome};
use ltk_testkit::{obs, FailingStore, MemoryStore, ScriptedSource};
use tokio::sync::watch;

fn len(n: u32) -> SessionLength {
    SessionLength::new(n).unwrap()
}

fn roster() -> Vec<RosterEntry> {
    vec![
        RosterEntry::new("chris", "Chris").with_scores(vec![None, None]),
        RosterEntry::new("kiki", "Kiki").with_scores(vec![None, None]),
        RosterEntry::new("dana", "Dana").with_scores(vec![None, None]),
    ]
}

#[tokio::test(start_paused = true)]
async fn failed_write_stops_the_cycle() {
    let mem = MemoryStore::new(roster(), len(2));
    let store = FailingStore::new(mem.clone()).fail_writes_for("kiki");
    let source = ScriptedSource::new().then_snapshot(vec![
        obs("Chris", "Lane 1", &["210", "195"]),
        obs("Kiki", "Lane 2", &["180", "170"]),
        obs("Dana", "Lane 3", &["160", "150"]),
    ]);

    let (_tx, rx) = watch::channel(false);
    let err = Reconciler::new(source, store, RunOptions::default())
        .run(rx)
        .await
        .unwrap_err();

    match &err {
        RunError::Persistence { operation, .. } => assert!(operation.contains("kiki")),
        other => panic!("expected persistence error, got {other:?}"),
    }

    assert_eq!(mem.entry("chris").unwrap().scores, vec![Some(210), Some(195)]);
    assert_eq!(mem.entry("kiki").unwrap().scores, vec![None, None]);
    assert_eq!(mem.entry("dana").unwrap().scores, vec![None, None]);
    assert_eq!(mem.snapshot().session_length, len(2));
    assert_eq!(mem.snapshot().session_writes, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_session_advance_is_retried_by_next_run() {
    let mem = MemoryStore::new(roster(), len(2));
    let store = FailingStore::new(mem.clone()).fail_session_writes();
    let source = ScriptedSource::new().then_snapshot(vec![obs("Chris", "Lane 1", &["210", "195"])]);

    let (_tx, rx) = watch::channel(false);
    let err = Reconciler::new(source, store, RunOptions::default())
        .run(rx)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Persistence { .. }));
    assert_eq!(mem.snapshot().session_length, len(2));
    assert_eq!(mem.entry("chris").unwrap().scores, vec![Some(210), Some(195)]);

    let (_tx, rx) = watch::channel(false);
    let report = Reconciler::new(ScriptedSource::new(), mem.clone(), RunOptions::default())
        .run(rx)
        .await
        .unwrap();
    assert!(matches!(report.outcome, RunOutcome::SessionComplete { .. }));
    assert_eq!(mem.snapshot().session_length, len(4));
    assert_eq!(
        mem.entry("chris").unwrap().scores,
        vec![Some(210), Some(195), None, None]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_pad_after_advance_is_fatal_and_recovered() {
    let mem = MemoryStore::new(
        vec![
            RosterEntry::new("chris", "Chris").with_scores(vec![None, None]),
            RosterEntry::new("kiki", "Kiki").with_scores(vec![None, None]),
        ],
        len(2),
    );
    let store = FailingStore::new(mem.clone()).fail_writes_for("kiki");
    let source = ScriptedSource::new().then_snapshot(vec![obs("Chris", "Lane 1", &["210", "195"])]);

    let (_tx, rx) = watch::channel(false);
    let err = Reconciler::new(source, store, RunOptions::default())
        .run(rx)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Persistence { .. }));
    assert_eq!(mem.snapshot().session_length, len(4));
    assert_eq!(
        mem.entry("chris").unwrap().scores,
        vec![Some(210), Some(195), None, None]
    );
    assert_eq!(mem.entry("kiki").unwrap().scores, vec![None, None]);

    let book = Reconciler::new(ScriptedSource::new(), mem.clone(), RunOptions::default())
        .recover()
        .await
        .unwrap();
    book.check_invariants().unwrap();
    assert_eq!(mem.entry("kiki").unwrap().scores, vec![None; 4]);
}
