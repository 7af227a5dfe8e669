//! Command handler modules for ltk-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod roster;
pub mod run;

use anyhow::Result;
use ltk_config::{report_unused_keys, LoadedConfig, UnusedKeyPolicy};
use ltk_db::PgScoreStore;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// `RUST_LOG` wins; otherwise `info`. Logs go to stderr so stdout stays
/// parseable `key=value` output.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load layered config and report keys nothing reads.
///
/// An empty path list yields the built-in defaults.
pub fn load_config(paths: &[String], policy: UnusedKeyPolicy) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = ltk_config::load_layered_yaml(&path_refs)?;

    let report = report_unused_keys(&loaded.config_json, policy)?;
    if !report.is_clean() {
        eprintln!(
            "WARN: CONFIG_UNUSED_KEYS unused_leaf_keys={}",
            report.unused_leaf_pointers.len()
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            eprintln!("  unused={}", p);
        }
        let extra = report.unused_leaf_pointers.len().saturating_sub(50);
        if extra > 0 {
            eprintln!("  ... and {} more", extra);
        }
    }
    Ok(loaded)
}

pub async fn store_from_env() -> Result<PgScoreStore> {
    let pool = ltk_db::connect_from_env().await?;
    Ok(PgScoreStore::new(pool))
}
