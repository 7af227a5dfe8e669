//! Config consumption map + unused-key guard.
//!
//! "Consumed pointers" are JSON Pointer prefixes. A leaf under any consumed
//! prefix is consumed; any other leaf is reported as unused. A typo such as
//! `reconciler/max_fetch_attemps` therefore shows up instead of silently
//! falling back to the default.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Pointers the reader consumes, as listed by [`consumed_pointers`].
    pub consumed: Vec<String>,
    /// Leaves of the document nothing reads, sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Every pointer [`crate::ReconcilerConfig::from_config_json`] reads.
///
/// Keep in sync with the reader; do not list whole sections.
pub fn consumed_pointers() -> &'static [&'static str] {
    &[
        "/reconciler/min_lane",
        "/reconciler/max_lane",
        "/reconciler/session_length",
        "/reconciler/cycle_delay_seconds",
        "/reconciler/max_fetch_attempts",
        "/reconciler/fetch_timeout_seconds",
        "/reconciler/countdown_log_every_seconds",
        "/source/url",
        "/source/snapshot_file",
    ]
}

/// Compare the document's leaves against [`consumed_pointers`].
/// `Fail` turns a non-empty report into an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed = consumed_pointers();

    let unused: BTreeSet<String> = leaf_pointers(config_json)
        .into_iter()
        .filter(|leaf| !leaf.is_empty())
        .filter(|leaf| !consumed.iter().any(|c| covers(c, leaf)))
        .collect();

    let report = UnusedKeyReport {
        consumed: consumed.iter().map(|c| c.to_string()).collect(),
        unused_leaf_pointers: unused.into_iter().collect(),
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} key(s) in the config are not read by the reconciler: {}",
            report.unused_leaf_pointers.len(),
            report
                .unused_leaf_pointers
                .iter()
                .take(12)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(report)
}

/// `/a/b` covers `/a/b` and `/a/b/c`, not `/a/bc`.
fn covers(consumed: &str, leaf: &str) -> bool {
    match leaf.strip_prefix(consumed) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// JSON pointers of every scalar (or empty container) in `v`, in document
/// order. A scalar document yields the root pointer `""`.
pub fn leaf_pointers(v: &Value) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack: Vec<(String, &Value)> = vec![(String::new(), v)];

    while let Some((ptr, node)) = stack.pop() {
        match node {
            Value::Object(map) if !map.is_empty() => {
                for (k, child) in map.iter().rev() {
                    let token = k.replace('~', "~0").replace('/', "~1");
                    stack.push((format!("{ptr}/{token}"), child));
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for (i, child) in items.iter().enumerate().rev() {
                    stack.push((format!("{ptr}/{i}"), child));
                }
            }
            _ => out.push(ptr),
        }
    }
    out
}
