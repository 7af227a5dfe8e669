//! Stopping a run that has not completed its session.
//!
//! GREEN when:
//! - a shutdown requested before the first cycle fetches nothing;
//! - a shutdown during the countdown ends the run after the current cycle;
//! - an empty scoreboard keeps the run cycling without advancing the session.

use std::time::Duration;

use ltk_reconcile::{RosterEntry, SessionLength};
use ltk_runtime::{Reconciler, RunOptions, RunOutcome};
use ltk_testkit::{obs, MemoryStore, ScriptedSource};
use tokio::sync::watch;

fn store() -> MemoryStore {
    MemoryStore::new(
        vec![RosterEntry::new("chris", "Chris")],
        SessionLength::new(2).unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_first_cycle() {
    let source = ScriptedSource::new();
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let report = Reconciler::new(source.clone(), store(), RunOptions::default())
        .run(rx)
        .await
        .unwrap();
    assert_eq!(report.outcome, RunOutcome::ShutdownRequested);
    assert_eq!(report.cycles, 0);
    assert_eq!(source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_countdown() {
    let store = store();
    let source = ScriptedSource::new().then_snapshot(vec![obs("Chris", "Lane 7", &["210"])]);
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        let _ = tx.send(true);
    });

    let report = Reconciler::new(source.clone(), store.clone(), RunOptions::default())
        .run(rx)
        .await
        .unwrap();
    assert_eq!(report.outcome, RunOutcome::ShutdownRequested);
    assert_eq!(report.cycles, 1);
    assert_eq!(source.calls(), 1);
    assert_eq!(store.entry("chris").unwrap().scores, vec![Some(210), None]);
    assert_eq!(store.snapshot().session_writes, 0);
}

#[tokio::test(start_paused = true)]
async fn empty_board_never_completes() {
    let store = store();
    let source = ScriptedSource::new();
    let opts = RunOptions {
        max_cycles: Some(5),
        ..RunOptions::default()
    };
    let (_tx, rx) = watch::channel(false);
    let report = Reconciler::new(source.clone(), store.clone(), opts)
        .run(rx)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::CycleLimitReached);
    assert_eq!(source.calls(), 5);
    assert_eq!(store.snapshot().session_writes, 0);
    assert_eq!(store.snapshot().session_length, SessionLength::new(2).unwrap());
}
