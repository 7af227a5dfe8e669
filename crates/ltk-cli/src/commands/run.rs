//! `ltk run`: the reconciliation loop against the configured scoreboard and
//! the Postgres roster.

use anyhow::{anyhow, bail, Result};
use ltk_config::{ReconcilerConfig, SourceConfig, UnusedKeyPolicy};
use ltk_db::ScoreStore;
use ltk_reconcile::SessionLength;
use ltk_runtime::{Reconciler, RunOptions, RunOutcome};
use ltk_source::{HttpFeedSource, ScoreSource, SnapshotFileSource};
use tokio::sync::watch;
use tracing::{info, warn};

use super::{load_config, store_from_env};
use crate::RunArgs;

pub async fn run(args: RunArgs) -> Result<()> {
    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let loaded = load_config(&args.config_paths, policy)?;
    let cfg = apply_overrides(loaded.reconciler()?, &args)?;
    let source = build_source(&cfg)?;

    let mut opts = RunOptions::from_config(&cfg);
    opts.max_cycles = if args.once { Some(1) } else { args.max_cycles };

    let store = store_from_env().await?;

    if let Some(len) = opts.session_length_override {
        let stored = store.get_session_length().await?;
        if stored != len && !args.yes {
            bail!(
                "REFUSING SESSION OVERRIDE: stored session_length={stored}, requested={len}. Re-run with --yes"
            );
        }
    }

    let reconciler = Reconciler::new(source, store, opts);
    println!("run_id={}", reconciler.run_id());
    println!("config_hash={}", loaded.config_hash);
    info!(
        run_id = %reconciler.run_id(),
        config_hash = %loaded.config_hash,
        lanes = ?cfg.lane_filter().range(),
        "starting reconciler"
    );

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("ctrl-c received; stopping after the current cycle");
            let _ = tx.send(true);
        }
    });

    let report = reconciler.run(rx).await?;

    println!("cycles={}", report.cycles);
    println!("slot_writes={}", report.slot_writes);
    println!("unresolved={}", report.unresolved);
    println!("filtered={}", report.filtered);
    println!("already_recorded={}", report.already_recorded);
    match report.outcome {
        RunOutcome::SessionComplete { finished, next } => {
            println!("outcome=SESSION_COMPLETE");
            println!("finished_session_length={finished}");
            println!("session_length={next}");
        }
        RunOutcome::ShutdownRequested => {
            println!("outcome=SHUTDOWN_REQUESTED");
            println!("session_length={}", report.session_length);
        }
        RunOutcome::CycleLimitReached => {
            println!("outcome=CYCLE_LIMIT_REACHED");
            println!("session_length={}", report.session_length);
        }
    }
    Ok(())
}

/// CLI flags take precedence over the config file.
fn apply_overrides(mut cfg: ReconcilerConfig, args: &RunArgs) -> Result<ReconcilerConfig> {
    if let Some(url) = &args.source_url {
        cfg.source = Some(SourceConfig::Url(url.clone()));
    }
    if let Some(path) = &args.snapshot_file {
        cfg.source = Some(SourceConfig::SnapshotFile(path.clone()));
    }
    if args.min_lane.is_some() || args.max_lane.is_some() {
        cfg.min_lane = args.min_lane;
        cfg.max_lane = args.max_lane;
    }
    if let Some(n) = args.session_length {
        cfg.session_length =
            Some(SessionLength::new(n).map_err(|e| anyhow!("--session-length: {e}"))?);
    }
    cfg.validate()?;
    Ok(cfg)
}

fn build_source(cfg: &ReconcilerConfig) -> Result<Box<dyn ScoreSource>> {
    match &cfg.source {
        Some(SourceConfig::Url(url)) => Ok(Box::new(HttpFeedSource::new(url.clone()))),
        Some(SourceConfig::SnapshotFile(path)) => {
            Ok(Box::new(SnapshotFileSource::new(path.clone())))
        }
        None => bail!(
            "no score source configured: set source.url or source.snapshot_file, \
             or pass --source-url / --snapshot-file"
        ),
    }
}
