use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ltk_reconcile::{LaneFilter, SessionLength};
use serde::Deserialize;
use serde_json::Value;

/// Where snapshots come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// JSON feed over HTTP(S).
    Url(String),
    /// JSON feed document on disk, re-read every cycle.
    SnapshotFile(PathBuf),
}

/// Settings the reconciliation runtime consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilerConfig {
    pub min_lane: Option<u32>,
    pub max_lane: Option<u32>,
    /// Replaces the stored session length at run start when set.
    pub session_length: Option<SessionLength>,
    pub cycle_delay: Duration,
    pub max_fetch_attempts: u32,
    pub fetch_timeout: Duration,
    pub countdown_log_every: Duration,
    pub source: Option<SourceConfig>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            min_lane: None,
            max_lane: None,
            session_length: None,
            cycle_delay: Duration::from_secs(60),
            max_fetch_attempts: 3,
            fetch_timeout: Duration::from_secs(30),
            countdown_log_every: Duration::from_secs(10),
            source: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawReconciler {
    min_lane: Option<u32>,
    max_lane: Option<u32>,
    session_length: Option<u32>,
    cycle_delay_seconds: Option<u64>,
    max_fetch_attempts: Option<u32>,
    fetch_timeout_seconds: Option<u64>,
    countdown_log_every_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSource {
    url: Option<String>,
    snapshot_file: Option<PathBuf>,
}

impl ReconcilerConfig {
    /// Read `/reconciler` and `/source` from a merged config document.
    /// Missing sections fall back to [`Default`].
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let raw: RawReconciler = section(config_json, "/reconciler")?;
        let src: RawSource = section(config_json, "/source")?;
        let d = Self::default();

        let source = match (src.url, src.snapshot_file) {
            (Some(_), Some(_)) => bail!("source: set either url or snapshot_file, not both"),
            (Some(url), None) => Some(SourceConfig::Url(url)),
            (None, Some(path)) => Some(SourceConfig::SnapshotFile(path)),
            (None, None) => None,
        };

        let session_length = raw
            .session_length
            .map(SessionLength::new)
            .transpose()
            .map_err(|e| anyhow::anyhow!("reconciler.session_length: {e}"))?;

        let cfg = Self {
            min_lane: raw.min_lane,
            max_lane: raw.max_lane,
            session_length,
            cycle_delay: raw
                .cycle_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(d.cycle_delay),
            max_fetch_attempts: raw.max_fetch_attempts.unwrap_or(d.max_fetch_attempts),
            fetch_timeout: raw
                .fetch_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(d.fetch_timeout),
            countdown_log_every: raw
                .countdown_log_every_seconds
                .map(Duration::from_secs)
                .unwrap_or(d.countdown_log_every),
            source,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        match (self.min_lane, self.max_lane) {
            (Some(lo), Some(hi)) if lo > hi => {
                bail!("reconciler: min_lane {lo} is greater than max_lane {hi}")
            }
            (Some(_), None) | (None, Some(_)) => {
                bail!("reconciler: min_lane and max_lane must be set together")
            }
            _ => {}
        }
        if self.max_fetch_attempts == 0 {
            bail!("reconciler: max_fetch_attempts must be at least 1");
        }
        if self.fetch_timeout.is_zero() {
            bail!("reconciler: fetch_timeout_seconds must be at least 1");
        }
        Ok(())
    }

    pub fn lane_filter(&self) -> LaneFilter {
        LaneFilter::from_bounds(self.min_lane, self.max_lane)
    }
}

fn section<T: for<'de> Deserialize<'de> + Default>(v: &Value, ptr: &str) -> Result<T> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(s) => serde_json::from_value(s.clone()).with_context(|| format!("invalid {ptr}")),
    }
}
