//! Roster and session maintenance commands.
//!
//! Covers `ltk session show|set`, `ltk roster status` and
//! `ltk averages recompute`.

use anyhow::{anyhow, bail, Result};
use ltk_db::ScoreStore;
use ltk_reconcile::{compute_average, RosterEntry, SessionBook, SessionLength};
use tracing::info;

use super::store_from_env;

// ---------------------------------------------------------------------------
// session
// ---------------------------------------------------------------------------

pub async fn session_show() -> Result<()> {
    let store = store_from_env().await?;
    let len = store.get_session_length().await?;
    println!("session_length={len}");
    println!("first_game_index={}", len.first_game_index());
    println!("second_game_index={}", len.second_game_index());
    Ok(())
}

pub async fn session_set(length: u32, yes: bool) -> Result<()> {
    let len = SessionLength::new(length).map_err(|e| anyhow!("--length: {e}"))?;
    if !yes {
        bail!("REFUSING SESSION SET: changing the session length moves tonight's slots. Re-run with --yes");
    }

    let store = store_from_env().await?;
    let previous = store.get_session_length().await?;
    check_roster_fits(store.get_roster().await?, len)?;
    store.set_session_length(len).await?;
    info!(previous = %previous, session_length = %len, "session length set");
    println!("previous_session_length={previous}");
    println!("session_length={len}");
    Ok(())
}

/// A length shorter than any stored score sequence would make every later
/// run fail recovery.
fn check_roster_fits(roster: Vec<RosterEntry>, len: SessionLength) -> Result<()> {
    SessionBook::recover(roster, len)
        .map(|_| ())
        .map_err(|e| anyhow!("REFUSING SESSION SET: {e}"))
}

// ---------------------------------------------------------------------------
// roster status
// ---------------------------------------------------------------------------

/// Read-only: padding needed by short entries is reported, not written.
pub async fn roster_status() -> Result<()> {
    let store = store_from_env().await?;
    let session = store.get_session_length().await?;
    let recovery = SessionBook::recover(store.get_roster().await?, session)?;
    let book = &recovery.book;

    println!("session_length={session}");
    for e in book.roster() {
        let state = e.state_in(session);
        println!(
            "id={} name={:?} state={} average={:.2} scores={}",
            e.id,
            e.name,
            state,
            e.average,
            format_scores(&e.scores)
        );
    }
    let active: Vec<&str> = book.active_set().iter().map(|s| s.as_str()).collect();
    println!("active_set=[{}]", active.join(","));
    println!("session_started={}", book.has_processed());
    println!("session_complete={}", book.is_session_complete());
    println!("pending_padding={}", recovery.padded.len());
    Ok(())
}

fn format_scores(scores: &[Option<u32>]) -> String {
    let parts: Vec<String> = scores
        .iter()
        .map(|s| s.map_or_else(|| "-".to_string(), |v| v.to_string()))
        .collect();
    format!("[{}]", parts.join(","))
}

// ---------------------------------------------------------------------------
// averages recompute
// ---------------------------------------------------------------------------

pub async fn averages_recompute(dry_run: bool) -> Result<()> {
    let store = store_from_env().await?;
    let roster = store.get_roster().await?;

    let mut changed = 0usize;
    for e in &roster {
        let average = compute_average(&e.scores);
        let stale = average != e.average;
        if stale {
            changed += 1;
            if !dry_run {
                store.write_scores(&e.id, &e.scores, average).await?;
            }
        }
        println!(
            "id={} name={:?} average={:.2} changed={}",
            e.id, e.name, average, stale
        );
    }
    info!(entries = roster.len(), changed, dry_run, "averages recomputed");
    println!("entries={} changed={} dry_run={}", roster.len(), changed, dry_run);
    Ok(())
}
